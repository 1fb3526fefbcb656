//! List Operations
//!
//! Lists are `VecDeque<Value>`, so pushes and pops at either end are O(1).
//! A list emptied by pops stays in the keyspace as an empty list.

use crate::error::{Error, Result};
use crate::storage::engine::Store;
use crate::storage::value::Value;
use bytes::Bytes;
use std::collections::VecDeque;

/// Resolves an inclusive `start..=stop` range over a sequence of `len` items.
///
/// Negative indices count from the end (`-1` is the last item). Both ends are
/// clamped to the sequence; `None` means the range is empty.
pub(crate) fn normalize_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { len + start } else { start }.max(0);
    let stop = if stop < 0 { len + stop } else { stop }.min(len - 1);

    if start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

impl Store {
    /// Prepends each value in turn, so `lpush(k, [x, y, z])` yields `[z, y, x]`.
    ///
    /// Returns the new length.
    pub fn lpush(&self, key: Bytes, values: Vec<Value>) -> Result<usize> {
        self.write(&key, |ks| {
            let list = ks
                .values
                .entry(key.clone())
                .or_insert_with(|| Value::List(VecDeque::new()))
                .as_list_mut()?;

            for value in values {
                list.push_front(value);
            }
            Ok(list.len())
        })
    }

    /// Appends values in order. Returns the new length.
    pub fn rpush(&self, key: Bytes, values: Vec<Value>) -> Result<usize> {
        self.write(&key, |ks| {
            let list = ks
                .values
                .entry(key.clone())
                .or_insert_with(|| Value::List(VecDeque::new()))
                .as_list_mut()?;

            list.extend(values);
            Ok(list.len())
        })
    }

    /// Items between `start` and `stop` inclusive. A missing key is an empty list.
    pub fn lrange(&self, key: &[u8], start: i64, stop: i64) -> Result<Vec<Value>> {
        self.read(key, |ks| {
            let Some(value) = ks.values.get(key) else {
                return Ok(Vec::new());
            };

            let list = value.as_list()?;
            Ok(match normalize_range(list.len(), start, stop) {
                Some((start, stop)) => list.range(start..=stop).cloned().collect(),
                None => Vec::new(),
            })
        })
    }

    pub fn lpop(&self, key: &[u8]) -> Result<Option<Value>> {
        self.write(key, |ks| match ks.values.get_mut(key) {
            Some(value) => Ok(value.as_list_mut()?.pop_front()),
            None => Ok(None),
        })
    }

    pub fn rpop(&self, key: &[u8]) -> Result<Option<Value>> {
        self.write(key, |ks| match ks.values.get_mut(key) {
            Some(value) => Ok(value.as_list_mut()?.pop_back()),
            None => Ok(None),
        })
    }

    /// Length of the list. Unlike the other list reads, a missing key is an error.
    pub fn llen(&self, key: &[u8]) -> Result<usize> {
        self.read(key, |ks| match ks.values.get(key) {
            Some(value) => Ok(value.as_list()?.len()),
            None => Err(Error::not_found(key)),
        })
    }

    /// Replaces the item at `index`. Negative indices are not accepted.
    pub fn lset(&self, key: &[u8], index: i64, value: Value) -> Result<()> {
        self.write(key, |ks| {
            let list = ks
                .values
                .get_mut(key)
                .ok_or_else(|| Error::not_found(key))?
                .as_list_mut()?;

            let slot = usize::try_from(index)
                .ok()
                .and_then(|i| list.get_mut(i))
                .ok_or(Error::IndexOutOfRange)?;
            *slot = value;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vals(items: &[&'static str]) -> Vec<Value> {
        items.iter().map(|s| Value::from(*s)).collect()
    }

    #[test]
    fn test_normalize_range() {
        assert_eq!(normalize_range(5, 0, -1), Some((0, 4)));
        assert_eq!(normalize_range(5, -3, -2), Some((2, 3)));
        assert_eq!(normalize_range(5, -100, 100), Some((0, 4)));
        assert_eq!(normalize_range(5, 4, 2), None);
        assert_eq!(normalize_range(5, 5, 10), None);
        assert_eq!(normalize_range(0, 0, -1), None);
    }

    #[test]
    fn test_lpush_reverses_rpush_appends() {
        let store = Store::new();

        assert_eq!(store.lpush(Bytes::from("l"), vals(&["x", "y", "z"])), Ok(3));
        assert_eq!(store.lrange(b"l", 0, -1), Ok(vals(&["z", "y", "x"])));

        assert_eq!(store.rpush(Bytes::from("r"), vals(&["x", "y", "z"])), Ok(3));
        assert_eq!(store.lrange(b"r", 0, -1), Ok(vals(&["x", "y", "z"])));
        assert_eq!(store.lrange(b"r", 1, 1), Ok(vals(&["y"])));
    }

    #[test]
    fn test_lrange_missing_key_is_empty() {
        let store = Store::new();
        assert_eq!(store.lrange(b"nope", 0, -1), Ok(vec![]));
    }

    #[test]
    fn test_pops_leave_empty_list() {
        let store = Store::new();
        store.rpush(Bytes::from("l"), vals(&["a", "b"])).unwrap();

        assert_eq!(store.lpop(b"l"), Ok(Some(Value::from("a"))));
        assert_eq!(store.rpop(b"l"), Ok(Some(Value::from("b"))));
        assert_eq!(store.rpop(b"l"), Ok(None));

        assert_eq!(store.llen(b"l"), Ok(0));
        assert_eq!(store.key_type(b"l"), Some("list"));
        assert_eq!(store.lpop(b"missing"), Ok(None));
    }

    #[test]
    fn test_llen_missing_key() {
        let store = Store::new();
        assert_eq!(store.llen(b"l"), Err(Error::NotFound("l".into())));
    }

    #[test]
    fn test_lset() {
        let store = Store::new();
        store.rpush(Bytes::from("l"), vals(&["a", "b", "c"])).unwrap();

        store.lset(b"l", 1, Value::from("B")).unwrap();
        assert_eq!(store.lrange(b"l", 0, -1), Ok(vals(&["a", "B", "c"])));

        assert_eq!(store.lset(b"l", 3, Value::from("x")), Err(Error::IndexOutOfRange));
        assert_eq!(store.lset(b"l", -1, Value::from("x")), Err(Error::IndexOutOfRange));
        assert_eq!(
            store.lset(b"missing", 0, Value::from("x")),
            Err(Error::NotFound("missing".into()))
        );
    }

    #[test]
    fn test_list_ops_on_wrong_type() {
        let store = Store::new();
        store.set(Bytes::from("s"), "scalar");

        assert_eq!(store.lpush(Bytes::from("s"), vals(&["a"])), Err(Error::TypeMismatch));
        assert_eq!(store.lrange(b"s", 0, -1), Err(Error::TypeMismatch));
        assert_eq!(store.lpop(b"s"), Err(Error::TypeMismatch));
        assert_eq!(store.get(b"s"), Some(Value::from("scalar")));
    }
}
