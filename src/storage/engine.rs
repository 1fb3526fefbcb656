//! Thread-Safe Typed Store with Lazy Expiry
//!
//! This module implements the keyspace of a single database instance.
//! A [`Store`] owns a value table, an expiry table and one reader-writer
//! guard covering both, so a value and its deadline are always observed
//! together.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Store                              │
//! │  ┌───────────────────────────────────────────────────────┐  │
//! │  │                 RwLock<Keyspace>                      │  │
//! │  │  ┌─────────────────────────┐ ┌─────────────────────┐  │  │
//! │  │  │ values: HashMap<Bytes,  │ │ expiry: ExpiryTable │  │  │
//! │  │  │                 Value>  │ │ (key -> deadline)   │  │  │
//! │  │  └─────────────────────────┘ └─────────────────────┘  │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads run under the shared guard. When a read finds its key past the
//! deadline it drops the shared guard, takes the exclusive guard and checks
//! the deadline *again* before purging: another writer may have replaced or
//! removed the key in between. Writes take the exclusive guard once and purge
//! the target key first if it has expired.
//!
//! List, hash and sorted-set operations live in their own modules
//! (`list`, `hash`, `sorted_set`) as further `impl Store` blocks built on the
//! same [`Store::read`] / [`Store::write`] helpers.

use crate::error::{Error, Result};
use crate::storage::expiry::{ExpiryTable, Ttl};
use crate::storage::value::Value;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::trace;

/// The value table and the expiry table, guarded together.
#[derive(Debug, Default)]
pub(crate) struct Keyspace {
    pub(crate) values: HashMap<Bytes, Value>,
    pub(crate) expiry: ExpiryTable,
}

impl Keyspace {
    /// Removes `key` if its deadline is at or before `now`.
    ///
    /// Returns true if the key was purged.
    pub(crate) fn purge_if_expired(&mut self, key: &[u8], now: Instant) -> bool {
        if !self.expiry.is_expired(key, now) {
            return false;
        }
        self.values.remove(key);
        self.expiry.clear(key);
        trace!(key = %String::from_utf8_lossy(key), "purged expired key");
        true
    }

    /// Removes the value and its deadline. Returns the value if one was present.
    pub(crate) fn remove(&mut self, key: &[u8]) -> Option<Value> {
        self.expiry.clear(key);
        self.values.remove(key)
    }
}

/// The typed key-value store backing one database instance.
///
/// Wrap it in an `Arc` to share it; all operations take `&self`.
///
/// # Example
///
/// ```
/// use stashkv::storage::{Store, Value};
/// use bytes::Bytes;
/// use std::time::Duration;
///
/// let store = Store::new();
///
/// store.set(Bytes::from("name"), "Ariz");
/// assert_eq!(store.get(b"name"), Some(Value::from("Ariz")));
///
/// store.set_with_expiry(Bytes::from("session"), "abc123", Duration::from_secs(60)).unwrap();
/// assert!(store.exists(b"session"));
/// ```
#[derive(Default)]
pub struct Store {
    inner: RwLock<Keyspace>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ks = self.inner.read();
        f.debug_struct("Store")
            .field("keys", &ks.values.len())
            .field("expiring", &ks.expiry.len())
            .finish()
    }
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Guard helpers
    // ========================================================================

    /// Runs `f` under the shared guard with `key` known to be live or absent.
    ///
    /// If `key` is observed past its deadline, the shared guard is released,
    /// the exclusive guard is taken, and the deadline is re-checked before the
    /// key is purged. `f` then runs under the exclusive guard.
    pub(crate) fn read<R>(&self, key: &[u8], f: impl FnOnce(&Keyspace) -> R) -> R {
        {
            let ks = self.inner.read();
            if !ks.expiry.is_expired(key, Instant::now()) {
                return f(&ks);
            }
        }

        let mut ks = self.inner.write();
        ks.purge_if_expired(key, Instant::now());
        f(&ks)
    }

    /// Runs `f` under the exclusive guard after purging `key` if it expired.
    pub(crate) fn write<R>(&self, key: &[u8], f: impl FnOnce(&mut Keyspace) -> R) -> R {
        let mut ks = self.inner.write();
        ks.purge_if_expired(key, Instant::now());
        f(&mut ks)
    }

    // ========================================================================
    // Key operations
    // ========================================================================

    /// Installs `value` under `key`, replacing any previous value and
    /// clearing any previous expiry.
    pub fn set(&self, key: Bytes, value: impl Into<Value>) {
        let mut ks = self.inner.write();
        ks.expiry.clear(&key);
        ks.values.insert(key, value.into());
    }

    /// Installs `value` under `key` with a deadline of now + `ttl`.
    ///
    /// Fails with `InvalidFormat`, leaving the key untouched, when the
    /// deadline is not representable.
    pub fn set_with_expiry(
        &self,
        key: Bytes,
        value: impl Into<Value>,
        ttl: Duration,
    ) -> Result<()> {
        let mut ks = self.inner.write();
        ks.expiry.set(key.clone(), ttl)?;
        ks.values.insert(key, value.into());
        Ok(())
    }

    /// Returns a copy of the value under `key`.
    ///
    /// Returns `None` if the key is absent or has expired; an expired key is
    /// purged as a side effect.
    pub fn get(&self, key: &[u8]) -> Option<Value> {
        self.read(key, |ks| ks.values.get(key).cloned())
    }

    /// Returns true if `key` holds a live value.
    pub fn exists(&self, key: &[u8]) -> bool {
        self.read(key, |ks| ks.values.contains_key(key))
    }

    /// Removes `key` and its expiry.
    ///
    /// Returns whether a value was physically present. The deadline is not
    /// consulted, so a key past its deadline that has not been purged yet
    /// still reports `true`.
    pub fn delete(&self, key: &[u8]) -> bool {
        self.inner.write().remove(key).is_some()
    }

    /// Atomically reads and removes `key`.
    ///
    /// An expired key is purged and reported as `None`; the stale value is
    /// never returned.
    pub fn get_and_delete(&self, key: &[u8]) -> Option<Value> {
        self.write(key, |ks| ks.remove(key))
    }

    /// Moves the value (and any live deadline) from `old` to `new`.
    ///
    /// An existing value under `new` is overwritten.
    pub fn rename(&self, old: &[u8], new: Bytes) -> Result<()> {
        let mut ks = self.inner.write();
        let now = Instant::now();
        ks.purge_if_expired(old, now);
        ks.purge_if_expired(&new, now);
        Self::move_key(&mut ks, old, new)
    }

    /// Like [`rename`](Self::rename) but fails with `AlreadyExists` if `new`
    /// holds a live value.
    pub fn rename_nx(&self, old: &[u8], new: Bytes) -> Result<()> {
        let mut ks = self.inner.write();
        let now = Instant::now();
        ks.purge_if_expired(old, now);
        ks.purge_if_expired(&new, now);
        if !ks.values.contains_key(old) {
            return Err(Error::not_found(old));
        }
        if ks.values.contains_key(&new[..]) {
            return Err(Error::already_exists(&new));
        }
        Self::move_key(&mut ks, old, new)
    }

    fn move_key(ks: &mut Keyspace, old: &[u8], new: Bytes) -> Result<()> {
        let deadline = ks.expiry.deadline(old);
        let value = ks.remove(old).ok_or_else(|| Error::not_found(old))?;

        ks.expiry.clear(&new);
        if let Some(deadline) = deadline {
            ks.expiry.set_deadline(new.clone(), deadline);
        }
        ks.values.insert(new, value);
        Ok(())
    }

    /// Sets a deadline of now + `ttl` on an existing key.
    pub fn expire(&self, key: &[u8], ttl: Duration) -> Result<()> {
        self.write(key, |ks| {
            let Some((stored, _)) = ks.values.get_key_value(key) else {
                return Err(Error::not_found(key));
            };
            let stored = stored.clone();
            ks.expiry.set(stored, ttl)
        })
    }

    /// Removes the deadline from an existing key.
    ///
    /// Returns `Ok(true)` if a deadline was cleared, `Ok(false)` if the key
    /// had none.
    pub fn persist(&self, key: &[u8]) -> Result<bool> {
        self.write(key, |ks| {
            if !ks.values.contains_key(key) {
                return Err(Error::not_found(key));
            }
            Ok(ks.expiry.clear(key).is_some())
        })
    }

    /// Remaining lifetime of `key`.
    ///
    /// - `Some(Ttl::Remaining(d))` - the key exists and expires after `d`
    /// - `Some(Ttl::NoExpiry)` - the key exists and never expires
    /// - `None` - the key does not exist (an expired key is purged first)
    pub fn ttl(&self, key: &[u8]) -> Option<Ttl> {
        self.read(key, |ks| {
            ks.values
                .contains_key(key)
                .then(|| ks.expiry.ttl(key, Instant::now()))
        })
    }

    /// Increments the integer under `key` by one.
    pub fn incr(&self, key: Bytes) -> Result<i64> {
        self.incr_by(key, 1)
    }

    /// Decrements the integer under `key` by one.
    pub fn decr(&self, key: Bytes) -> Result<i64> {
        self.incr_by(key, -1)
    }

    /// Adds `delta` to the integer under `key`.
    ///
    /// An absent key counts as 0 and is created without expiry. A present
    /// value must be a scalar that parses as an integer; a live deadline on
    /// it is kept.
    pub fn incr_by(&self, key: Bytes, delta: i64) -> Result<i64> {
        self.write(&key, |ks| {
            let current = match ks.values.get(&key[..]) {
                Some(value) => value
                    .as_scalar()?
                    .as_integer()
                    .ok_or(Error::InvalidFormat)?,
                None => 0,
            };

            let next = current.checked_add(delta).ok_or(Error::Overflow)?;
            ks.values.insert(key.clone(), Value::from(next));
            Ok(next)
        })
    }

    /// Returns every live key, purging expired keys found along the way.
    pub fn keys(&self) -> Vec<Bytes> {
        let now = Instant::now();
        let (live, expired): (Vec<Bytes>, Vec<Bytes>) = {
            let ks = self.inner.read();
            ks.values
                .keys()
                .cloned()
                .partition(|key| !ks.expiry.is_expired(key, now))
        };

        if !expired.is_empty() {
            let mut ks = self.inner.write();
            let now = Instant::now();
            for key in &expired {
                ks.purge_if_expired(key, now);
            }
        }

        live
    }

    /// Returns the type name of the value under `key`, if any.
    pub fn key_type(&self, key: &[u8]) -> Option<&'static str> {
        self.read(key, |ks| ks.values.get(key).map(Value::type_name))
    }

    /// Number of live keys. Expired keys are skipped, not purged.
    pub fn len(&self) -> usize {
        let ks = self.inner.read();
        let now = Instant::now();
        ks.values
            .keys()
            .filter(|key| !ks.expiry.is_expired(key, now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every key and deadline.
    pub fn flush(&self) {
        let mut ks = self.inner.write();
        ks.values.clear();
        ks.expiry.clear_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::value::Scalar;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_set_and_get() {
        let store = Store::new();

        store.set(Bytes::from("key"), "value");
        assert_eq!(store.get(b"key"), Some(Value::from("value")));
        assert_eq!(store.get(b"missing"), None);
    }

    #[test]
    fn test_set_clears_previous_expiry() {
        let store = Store::new();

        store.set_with_expiry(Bytes::from("key"), "v1", Duration::from_secs(30)).unwrap();
        store.set(Bytes::from("key"), "v2");

        assert_eq!(store.ttl(b"key"), Some(Ttl::NoExpiry));
    }

    #[test]
    fn test_expiry_is_lazy() {
        let store = Store::new();

        store.set_with_expiry(Bytes::from("key"), "value", Duration::from_millis(50)).unwrap();
        assert_eq!(store.get(b"key"), Some(Value::from("value")));

        thread::sleep(Duration::from_millis(100));

        // Still physically present until observed
        assert_eq!(store.inner.read().values.len(), 1);

        assert_eq!(store.get(b"key"), None);
        assert!(store.inner.read().values.is_empty());
        assert!(store.inner.read().expiry.is_empty());
        assert!(!store.keys().contains(&Bytes::from("key")));
    }

    #[test]
    fn test_unrepresentable_expiry_leaves_key_untouched() {
        let store = Store::new();
        store.set(Bytes::from("key"), "kept");

        let result = store.set_with_expiry(Bytes::from("key"), "lost", Duration::MAX);
        assert!(matches!(result, Err(Error::InvalidFormat)));
        assert_eq!(store.get(b"key"), Some(Value::from("kept")));

        assert!(matches!(
            store.expire(b"key", Duration::from_secs(i64::MAX as u64)),
            Err(Error::InvalidFormat)
        ));
        assert_eq!(store.ttl(b"key"), Some(Ttl::NoExpiry));
    }

    #[test]
    fn test_purge_recheck_spares_replaced_key() {
        let store = Store::new();
        let key = Bytes::from("key");

        // A reader saw this deadline pass under the shared guard...
        store.set(key.clone(), "old");
        store.inner.write().expiry.set_deadline(key.clone(), Instant::now());
        assert!(store.inner.read().expiry.is_expired(&key, Instant::now()));

        // ...and a writer replaced the key before the exclusive guard was taken.
        store.set(key.clone(), "new");

        let mut ks = store.inner.write();
        assert!(!ks.purge_if_expired(&key, Instant::now()));
        assert_eq!(ks.values.get(&key[..]), Some(&Value::from("new")));
        drop(ks);

        assert_eq!(store.get(&key), Some(Value::from("new")));
    }

    #[test]
    fn test_delete_reports_physical_presence() {
        let store = Store::new();

        store.set(Bytes::from("key"), "value");
        assert!(store.delete(b"key"));
        assert!(!store.delete(b"key"));

        store.set_with_expiry(Bytes::from("stale"), "value", Duration::from_millis(10)).unwrap();
        thread::sleep(Duration::from_millis(30));
        assert!(store.delete(b"stale"));
    }

    #[test]
    fn test_get_and_delete() {
        let store = Store::new();

        store.set(Bytes::from("key"), "value");
        assert_eq!(store.get_and_delete(b"key"), Some(Value::from("value")));
        assert_eq!(store.get(b"key"), None);

        store.set_with_expiry(Bytes::from("stale"), "value", Duration::from_millis(10)).unwrap();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(store.get_and_delete(b"stale"), None);
    }

    #[test]
    fn test_rename_preserves_value_and_ttl() {
        let store = Store::new();

        store.set_with_expiry(Bytes::from("a"), "value", Duration::from_secs(100)).unwrap();
        store.rename(b"a", Bytes::from("b")).unwrap();

        assert_eq!(store.get(b"a"), None);
        assert_eq!(store.get(b"b"), Some(Value::from("value")));
        match store.ttl(b"b") {
            Some(Ttl::Remaining(d)) => assert!(d.as_secs() > 90 && d.as_secs() <= 100),
            other => panic!("unexpected ttl {:?}", other),
        }
    }

    #[test]
    fn test_rename_overwrites_destination() {
        let store = Store::new();

        store.set(Bytes::from("a"), "new");
        store.set_with_expiry(Bytes::from("b"), "old", Duration::from_secs(10)).unwrap();
        store.rename(b"a", Bytes::from("b")).unwrap();

        assert_eq!(store.get(b"b"), Some(Value::from("new")));
        assert_eq!(store.ttl(b"b"), Some(Ttl::NoExpiry));
    }

    #[test]
    fn test_rename_missing_key() {
        let store = Store::new();
        assert_eq!(
            store.rename(b"nope", Bytes::from("b")),
            Err(Error::NotFound("nope".into()))
        );
    }

    #[test]
    fn test_rename_nx() {
        let store = Store::new();

        store.set(Bytes::from("a"), "1");
        store.set(Bytes::from("b"), "2");
        assert_eq!(
            store.rename_nx(b"a", Bytes::from("b")),
            Err(Error::AlreadyExists("b".into()))
        );

        store.rename_nx(b"a", Bytes::from("c")).unwrap();
        assert_eq!(store.get(b"c"), Some(Value::from("1")));
    }

    #[test]
    fn test_expire_and_ttl() {
        let store = Store::new();

        assert_eq!(store.ttl(b"key"), None);
        assert_eq!(
            store.expire(b"key", Duration::from_secs(5)),
            Err(Error::NotFound("key".into()))
        );

        store.set(Bytes::from("key"), "value");
        assert_eq!(store.ttl(b"key"), Some(Ttl::NoExpiry));

        store.expire(b"key", Duration::from_secs(60)).unwrap();
        assert!(matches!(store.ttl(b"key"), Some(Ttl::Remaining(d)) if d.as_secs() <= 60));

        assert_eq!(store.persist(b"key"), Ok(true));
        assert_eq!(store.persist(b"key"), Ok(false));
        assert_eq!(store.ttl(b"key"), Some(Ttl::NoExpiry));
    }

    #[test]
    fn test_ttl_purges_expired_key() {
        let store = Store::new();

        store.set_with_expiry(Bytes::from("key"), "value", Duration::from_millis(10)).unwrap();
        thread::sleep(Duration::from_millis(30));

        assert_eq!(store.ttl(b"key"), None);
        assert!(store.inner.read().values.is_empty());
    }

    #[test]
    fn test_incr_decr() {
        let store = Store::new();

        assert_eq!(store.incr(Bytes::from("up")), Ok(1));
        assert_eq!(store.incr(Bytes::from("up")), Ok(2));
        assert_eq!(store.decr(Bytes::from("down")), Ok(-1));
        assert_eq!(store.ttl(b"up"), Some(Ttl::NoExpiry));

        store.set(Bytes::from("num"), "10");
        assert_eq!(store.incr(Bytes::from("num")), Ok(11));
        assert_eq!(store.get(b"num"), Some(Value::Scalar(Scalar::Integer(11))));

        store.set(Bytes::from("text"), "hello");
        assert_eq!(store.incr(Bytes::from("text")), Err(Error::InvalidFormat));

        store.set(Bytes::from("max"), i64::MAX);
        assert_eq!(store.incr(Bytes::from("max")), Err(Error::Overflow));
    }

    #[test]
    fn test_incr_keeps_live_deadline() {
        let store = Store::new();

        store.set_with_expiry(Bytes::from("n"), "5", Duration::from_secs(100)).unwrap();
        assert_eq!(store.incr(Bytes::from("n")), Ok(6));
        assert!(matches!(store.ttl(b"n"), Some(Ttl::Remaining(_))));
    }

    #[test]
    fn test_incr_on_expired_key_starts_from_zero() {
        let store = Store::new();

        store.set_with_expiry(Bytes::from("n"), "41", Duration::from_millis(10)).unwrap();
        thread::sleep(Duration::from_millis(30));

        assert_eq!(store.incr(Bytes::from("n")), Ok(1));
        assert_eq!(store.ttl(b"n"), Some(Ttl::NoExpiry));
    }

    #[test]
    fn test_keys_skips_and_purges_expired() {
        let store = Store::new();

        store.set(Bytes::from("a"), "1");
        store.set(Bytes::from("b"), "2");
        store.set_with_expiry(Bytes::from("c"), "3", Duration::from_millis(10)).unwrap();
        thread::sleep(Duration::from_millis(30));

        let mut keys = store.keys();
        keys.sort();
        assert_eq!(keys, vec![Bytes::from("a"), Bytes::from("b")]);
        assert_eq!(store.inner.read().values.len(), 2);
    }

    #[test]
    fn test_key_type_len_flush() {
        let store = Store::new();

        assert_eq!(store.key_type(b"s"), None);
        store.set(Bytes::from("s"), "x");
        assert_eq!(store.key_type(b"s"), Some("string"));
        assert_eq!(store.len(), 1);

        store.flush();
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_access() {
        let store = Arc::new(Store::new());
        let mut handles = vec![];

        for i in 0..10 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let key = Bytes::from(format!("key-{}-{}", i, j));
                    store.set(key.clone(), "value");
                    store.get(&key);
                    store.incr(Bytes::from("counter")).unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 1001);
        assert_eq!(store.get(b"counter"), Some(Value::from(1000i64)));
    }

    #[test]
    fn test_concurrent_expiry_observers() {
        let store = Arc::new(Store::new());
        store.set_with_expiry(Bytes::from("k"), "v", Duration::from_millis(20)).unwrap();
        thread::sleep(Duration::from_millis(40));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    if i % 2 == 0 {
                        store.get(b"k")
                    } else {
                        store.ttl(b"k").map(|_| Value::from("ttl"))
                    }
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), None);
        }
        assert!(store.is_empty());
    }
}
