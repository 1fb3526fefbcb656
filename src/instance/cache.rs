//! LRU Cache of Database Instances
//!
//! Each distinct [`Config`] maps to its own [`Store`]. The cache holds at most
//! `capacity` instances; creating one more evicts the least recently used.
//!
//! ```text
//!   order (LRU head ──────────────────────────> MRU tail)
//!   ┌────────┐  ┌────────┐  ┌────────┐
//!   │  C1    │  │  C2    │  │  C3    │  <── get_or_create / touch move here
//!   └────────┘  └────────┘  └────────┘
//!       │
//!       └── evicted first when a new config arrives at capacity
//! ```
//!
//! The map and the order live under one mutex, held only long enough to
//! resolve a config to an `Arc<Store>`. Store operations run after the mutex
//! is released, so the cache lock and a store lock are never held together.
//! An evicted store stays alive until its last `Arc` is dropped.

use crate::instance::config::Config;
use crate::storage::Store;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Default maximum number of live instances.
pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug)]
struct Instance {
    store: Arc<Store>,
    last_access: Instant,
}

#[derive(Debug)]
struct CacheState {
    instances: HashMap<Config, Instance>,
    /// Front is least recently used
    order: VecDeque<Config>,
    /// 0 means unbounded
    capacity: usize,
}

impl CacheState {
    fn promote(&mut self, config: &Config) {
        if let Some(pos) = self.order.iter().position(|c| c == config) {
            if let Some(config) = self.order.remove(pos) {
                self.order.push_back(config);
            }
        }
    }

    fn evict_lru(&mut self) -> Option<Config> {
        let config = self.order.pop_front()?;
        self.instances.remove(&config);
        info!(address = %config, remaining = self.instances.len(), "evicted instance");
        Some(config)
    }

    /// Evicts from the head until at most `limit` instances remain.
    fn shrink_to(&mut self, limit: usize) {
        while self.instances.len() > limit && self.evict_lru().is_some() {}
    }
}

/// Registry of database instances with least-recently-used eviction.
///
/// # Example
///
/// ```
/// use stashkv::instance::{Config, InstanceCache};
/// use bytes::Bytes;
///
/// let cache = InstanceCache::with_capacity(2);
/// let a = Config::new("a:6379", "");
///
/// cache.get_or_create(&a).set(Bytes::from("k"), "v");
/// assert!(cache.get_or_create(&a).exists(b"k"));
/// ```
#[derive(Debug)]
pub struct InstanceCache {
    state: Mutex<CacheState>,
}

impl Default for InstanceCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl InstanceCache {
    /// Creates a cache holding up to [`DEFAULT_CAPACITY`] instances.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache holding up to `capacity` instances (0 = unbounded).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                instances: HashMap::new(),
                order: VecDeque::new(),
                capacity,
            }),
        }
    }

    /// Returns the store for `config`, creating it if needed.
    ///
    /// Either way the instance becomes the most recently used. Creating an
    /// instance at capacity first evicts the least recently used one.
    pub fn get_or_create(&self, config: &Config) -> Arc<Store> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let now = Instant::now();

        if let Some(instance) = state.instances.get_mut(config) {
            instance.last_access = now;
            let store = Arc::clone(&instance.store);
            state.promote(config);
            return store;
        }

        if state.capacity > 0 {
            state.shrink_to(state.capacity - 1);
        }

        let store = Arc::new(Store::new());
        state.instances.insert(
            config.clone(),
            Instance {
                store: Arc::clone(&store),
                last_access: now,
            },
        );
        state.order.push_back(config.clone());
        debug!(address = %config, instances = state.instances.len(), "created instance");
        store
    }

    /// Marks `config` as most recently used without creating it.
    ///
    /// Returns false if no instance exists for `config`.
    pub fn touch(&self, config: &Config) -> bool {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        match state.instances.get_mut(config) {
            Some(instance) => {
                instance.last_access = Instant::now();
                state.promote(config);
                true
            }
            None => false,
        }
    }

    /// Changes the bound, evicting from the LRU end until it holds.
    pub fn set_capacity(&self, capacity: usize) {
        let mut state = self.state.lock();
        state.capacity = capacity;
        if capacity > 0 {
            state.shrink_to(capacity);
        }
    }

    /// Drops the instance for `config`. Returns true if one existed.
    pub fn remove(&self, config: &Config) -> bool {
        let mut state = self.state.lock();
        if state.instances.remove(config).is_none() {
            return false;
        }
        state.order.retain(|c| c != config);
        true
    }

    pub fn contains(&self, config: &Config) -> bool {
        self.state.lock().instances.contains_key(config)
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.state.lock().instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    /// When `config` was last created, fetched or touched.
    pub fn last_access(&self, config: &Config) -> Option<Instant> {
        self.state
            .lock()
            .instances
            .get(config)
            .map(|instance| instance.last_access)
    }
}
