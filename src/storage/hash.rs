//! Hash Operations
//!
//! A hash maps unique field names to values. It is created by the first
//! `hset` on a key; reads on a missing key report "not found" instead of
//! failing.

use crate::error::Result;
use crate::storage::engine::Store;
use crate::storage::value::Value;
use bytes::Bytes;
use std::collections::HashMap;

impl Store {
    /// Sets `field` to `value`. Returns true if the field is new.
    pub fn hset(&self, key: Bytes, field: Bytes, value: Value) -> Result<bool> {
        self.write(&key, |ks| {
            let hash = ks
                .values
                .entry(key.clone())
                .or_insert_with(|| Value::Hash(HashMap::new()))
                .as_hash_mut()?;

            Ok(hash.insert(field, value).is_none())
        })
    }

    pub fn hget(&self, key: &[u8], field: &[u8]) -> Result<Option<Value>> {
        self.read(key, |ks| match ks.values.get(key) {
            Some(value) => Ok(value.as_hash()?.get(field).cloned()),
            None => Ok(None),
        })
    }

    /// Removes `field`. Returns true if it was present.
    pub fn hdel(&self, key: &[u8], field: &[u8]) -> Result<bool> {
        self.write(key, |ks| match ks.values.get_mut(key) {
            Some(value) => Ok(value.as_hash_mut()?.remove(field).is_some()),
            None => Ok(false),
        })
    }

    /// A copy of the whole hash; later writes do not show through it.
    pub fn hgetall(&self, key: &[u8]) -> Result<Option<HashMap<Bytes, Value>>> {
        self.with_hash(key, |hash| hash.clone())
    }

    pub fn hkeys(&self, key: &[u8]) -> Result<Option<Vec<Bytes>>> {
        self.with_hash(key, |hash| hash.keys().cloned().collect())
    }

    pub fn hvals(&self, key: &[u8]) -> Result<Option<Vec<Value>>> {
        self.with_hash(key, |hash| hash.values().cloned().collect())
    }

    pub fn hlen(&self, key: &[u8]) -> Result<Option<usize>> {
        self.with_hash(key, HashMap::len)
    }

    fn with_hash<R>(
        &self,
        key: &[u8],
        f: impl FnOnce(&HashMap<Bytes, Value>) -> R,
    ) -> Result<Option<R>> {
        self.read(key, |ks| match ks.values.get(key) {
            Some(value) => Ok(Some(f(value.as_hash()?))),
            None => Ok(None),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_hset_hget() {
        let store = Store::new();

        assert_eq!(store.hset(Bytes::from("h"), Bytes::from("f"), Value::from("1")), Ok(true));
        assert_eq!(store.hset(Bytes::from("h"), Bytes::from("f"), Value::from("2")), Ok(false));

        assert_eq!(store.hget(b"h", b"f"), Ok(Some(Value::from("2"))));
        assert_eq!(store.hget(b"h", b"nope"), Ok(None));
        assert_eq!(store.hget(b"missing", b"f"), Ok(None));
    }

    #[test]
    fn test_hdel() {
        let store = Store::new();
        store.hset(Bytes::from("h"), Bytes::from("f"), Value::from("1")).unwrap();

        assert_eq!(store.hdel(b"h", b"f"), Ok(true));
        assert_eq!(store.hdel(b"h", b"f"), Ok(false));
        assert_eq!(store.hdel(b"missing", b"f"), Ok(false));
        assert_eq!(store.hlen(b"h"), Ok(Some(0)));
    }

    #[test]
    fn test_hgetall_is_a_copy() {
        let store = Store::new();
        store.hset(Bytes::from("h"), Bytes::from("a"), Value::from("1")).unwrap();

        let snapshot = store.hgetall(b"h").unwrap().unwrap();
        store.hset(Bytes::from("h"), Bytes::from("b"), Value::from("2")).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.hlen(b"h"), Ok(Some(2)));
    }

    #[test]
    fn test_hkeys_hvals_align() {
        let store = Store::new();
        for (f, v) in [("a", "1"), ("b", "2"), ("c", "3")] {
            store
                .hset(Bytes::from("h"), Bytes::from(f), Value::from(v))
                .unwrap();
        }

        let keys = store.hkeys(b"h").unwrap().unwrap();
        let vals = store.hvals(b"h").unwrap().unwrap();
        for (field, value) in keys.iter().zip(vals.iter()) {
            assert_eq!(store.hget(b"h", field), Ok(Some(value.clone())));
        }
        assert_eq!(store.hkeys(b"missing"), Ok(None));
    }

    #[test]
    fn test_hash_ops_on_wrong_type() {
        let store = Store::new();
        store.rpush(Bytes::from("l"), vec![Value::from("x")]).unwrap();

        assert_eq!(
            store.hset(Bytes::from("l"), Bytes::from("f"), Value::from("1")),
            Err(Error::TypeMismatch)
        );
        assert_eq!(store.hget(b"l", b"f"), Err(Error::TypeMismatch));
        assert_eq!(store.hlen(b"l"), Err(Error::TypeMismatch));
    }
}
