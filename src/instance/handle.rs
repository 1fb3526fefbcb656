//! Embeddable handle to one instance.

use crate::instance::cache::InstanceCache;
use crate::instance::config::Config;
use crate::storage::Store;
use std::sync::Arc;

/// A [`Config`] bound to the cache that owns its instance.
///
/// Every [`store`](Self::store) call goes through
/// [`InstanceCache::get_or_create`], which refreshes the instance's recency.
/// If the instance was evicted in the meantime, the handle gets a fresh,
/// empty one.
///
/// ```
/// use stashkv::instance::{Config, InstanceCache, InstanceHandle};
/// use bytes::Bytes;
/// use std::sync::Arc;
///
/// let cache = Arc::new(InstanceCache::new());
/// let handle = InstanceHandle::new(cache, Config::default());
///
/// handle.store().set(Bytes::from("greeting"), "hi");
/// assert!(handle.store().exists(b"greeting"));
/// ```
#[derive(Debug, Clone)]
pub struct InstanceHandle {
    cache: Arc<InstanceCache>,
    config: Config,
}

impl InstanceHandle {
    pub fn new(cache: Arc<InstanceCache>, config: Config) -> Self {
        Self { cache, config }
    }

    /// Resolves the instance's store, creating it if needed.
    pub fn store(&self) -> Arc<Store> {
        self.cache.get_or_create(&self.config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &Arc<InstanceCache> {
        &self.cache
    }
}
