//! Command Module
//!
//! Receives parsed requests, runs them against the instance's store and
//! returns typed replies.
//!
//! ```text
//! Client bytes
//!       │
//!       ▼
//! ┌─────────────────┐
//! │ Request parser  │  (protocol module)
//! └────────┬────────┘
//!          │ Request { name, args }
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │  - dispatch     │
//! │  - validate     │
//! │  - render reply │
//! └────────┬────────┘
//!          │ InstanceHandle::store()
//!          ▼
//! ┌─────────────────┐
//! │ Store           │  (storage module)
//! └─────────────────┘
//! ```

pub mod handler;

pub use handler::CommandHandler;
