//! # StashKV - An Embeddable In-Memory Key-Value Engine
//!
//! StashKV keeps strings, lists, hashes and sorted sets in memory behind a
//! Redis-like command surface. Keys can expire; expired keys are purged
//! lazily, the next time anything looks at them.
//!
//! Stores are grouped into *instances*, one per connection [`Config`]. The
//! [`InstanceCache`] holds a bounded number of them and drops the least
//! recently used instance when a new one is needed.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                               StashKV                                   │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (main.rs)   │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │ InstanceHandle          │
//! │                     ┌──────▼──────┐    ┌──────▼──────────────────────┐  │
//! │                     │  Request    │    │ InstanceCache (LRU)         │  │
//! │                     │  Parser     │    │  Config ──> Arc<Store>      │  │
//! │                     └─────────────┘    └──────┬──────────────────────┘  │
//! │                                               ▼                         │
//! │                     ┌─────────────────────────────────────────────────┐ │
//! │                     │ Store: RwLock<values + expiry>                  │ │
//! │                     │   strings · lists · hashes · sorted sets        │ │
//! │                     └─────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Embedding
//!
//! ```
//! use stashkv::{CommandHandler, Config, InstanceCache, InstanceHandle, RespValue};
//! use std::sync::Arc;
//!
//! let cache = Arc::new(InstanceCache::new());
//! let handler = CommandHandler::new(InstanceHandle::new(cache, Config::default()));
//!
//! assert_eq!(handler.handle(b"RPUSH jobs a b"), RespValue::integer(2));
//! assert_eq!(handler.handle(b"*2\r\n$4\r\nLPOP\r\n$4\r\njobs\r\n"), RespValue::bulk_string("a"));
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: typed store, expiry table and collection operations
//! - [`instance`]: instance configs, the LRU instance cache and handles
//! - [`protocol`]: request parser and reply type
//! - [`commands`]: the command dispatcher
//! - [`connection`]: per-client connection handling

pub mod commands;
pub mod connection;
pub mod error;
pub mod instance;
pub mod protocol;
pub mod storage;

pub use commands::CommandHandler;
pub use connection::{handle_connection, ConnectionStats};
pub use error::{Error, Result};
pub use instance::{Config, InstanceCache, InstanceHandle, DEFAULT_CAPACITY};
pub use protocol::{parse, ParseError, Request, RespValue};
pub use storage::{Store, Ttl, Value};

/// The default port StashKV listens on
pub const DEFAULT_PORT: u16 = 6379;

/// The default host StashKV binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of StashKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
