//! Instance Module
//!
//! Database instances keyed by connection configuration.
//!
//! ```text
//!   InstanceHandle ──store()──> InstanceCache ──Config──> Arc<Store>
//!                               (Mutex: map + LRU order)
//! ```
//!
//! - `config`: the [`Config`] value identifying an instance
//! - `cache`: the capacity-bounded [`InstanceCache`]
//! - `handle`: [`InstanceHandle`], a config bound to its cache

pub mod cache;
pub mod config;
pub mod handle;

pub use cache::{InstanceCache, DEFAULT_CAPACITY};
pub use config::Config;
pub use handle::InstanceHandle;
