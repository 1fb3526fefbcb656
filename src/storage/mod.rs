//! Storage Module
//!
//! The typed keyspace of one database instance and the collection
//! algorithms that run inside it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Store                              │
//! │          one RwLock over value table + expiry table         │
//! │                                                             │
//! │   engine.rs      set / get / delete / rename / incr / ttl   │
//! │   list.rs        lpush / rpush / lrange / lpop / lset ...   │
//! │   hash.rs        hset / hget / hdel / hgetall ...           │
//! │   sorted_set.rs  zadd / zrange / zrank                      │
//! └─────────────────────────────────────────────────────────────┘
//!           │                              │
//!           ▼                              ▼
//!   value.rs (Value, Scalar)      expiry.rs (ExpiryTable, Ttl)
//! ```
//!
//! ## Features
//!
//! - **Typed values**: strings/integers, lists, hashes and sorted sets
//! - **RwLock**: concurrent readers, exclusive writers
//! - **Lazy expiry**: expired keys are purged when next observed
//!
//! ## Example
//!
//! ```
//! use stashkv::storage::{Store, Ttl, Value};
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! let store = Store::new();
//!
//! store.rpush(Bytes::from("queue"), vec![Value::from("a"), Value::from("b")]).unwrap();
//! assert_eq!(store.lpop(b"queue").unwrap(), Some(Value::from("a")));
//!
//! store.set_with_expiry(Bytes::from("token"), "xyz", Duration::from_secs(30)).unwrap();
//! assert!(matches!(store.ttl(b"token"), Some(Ttl::Remaining(_))));
//! ```

pub mod engine;
pub mod expiry;
pub mod hash;
pub mod list;
pub mod sorted_set;
pub mod value;

pub use engine::Store;
pub use expiry::{ExpiryTable, Ttl};
pub use sorted_set::{RangeItem, ScoredMember, SortedSet};
pub use value::{Scalar, Value};
