//! Stored Value Types
//!
//! Every key in a [`Store`](crate::storage::Store) holds exactly one [`Value`].
//! The set of variants is closed: each operation checks the variant it needs
//! and fails with [`Error::TypeMismatch`](crate::Error::TypeMismatch) instead
//! of coercing.
//!
//! ```text
//! Value
//!  ├── Scalar ──── Bytes("hello") | Integer(42)
//!  ├── List ────── [Value, Value, ...]          (VecDeque, O(1) at both ends)
//!  ├── Hash ────── { field => Value, ... }      (fields unique)
//!  └── SortedSet ─ [(member, score), ...]       (ascending by score)
//! ```

use crate::error::{Error, Result};
use crate::storage::sorted_set::SortedSet;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// A string-or-integer value.
///
/// Integers produced by `INCR`/`DECR` stay integers; everything that arrives
/// over the wire is stored as bytes. Both render the same way on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    Bytes(Bytes),
    Integer(i64),
}

impl Scalar {
    /// Interprets the scalar as a signed 64-bit integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Scalar::Integer(n) => Some(*n),
            Scalar::Bytes(b) => std::str::from_utf8(b).ok()?.trim().parse().ok(),
        }
    }

    /// Returns the wire representation of the scalar.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Scalar::Bytes(b) => b.clone(),
            Scalar::Integer(n) => Bytes::from(n.to_string()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
            Scalar::Integer(n) => write!(f, "{}", n),
        }
    }
}

/// A value stored under a key.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    List(VecDeque<Value>),
    Hash(HashMap<Bytes, Value>),
    SortedSet(SortedSet),
}

impl Value {
    /// Returns the type name reported by the `TYPE` command.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "string",
            Value::List(_) => "list",
            Value::Hash(_) => "hash",
            Value::SortedSet(_) => "zset",
        }
    }

    pub fn as_scalar(&self) -> Result<&Scalar> {
        match self {
            Value::Scalar(s) => Ok(s),
            _ => Err(Error::TypeMismatch),
        }
    }

    pub fn as_list(&self) -> Result<&VecDeque<Value>> {
        match self {
            Value::List(l) => Ok(l),
            _ => Err(Error::TypeMismatch),
        }
    }

    pub fn as_list_mut(&mut self) -> Result<&mut VecDeque<Value>> {
        match self {
            Value::List(l) => Ok(l),
            _ => Err(Error::TypeMismatch),
        }
    }

    pub fn as_hash(&self) -> Result<&HashMap<Bytes, Value>> {
        match self {
            Value::Hash(h) => Ok(h),
            _ => Err(Error::TypeMismatch),
        }
    }

    pub fn as_hash_mut(&mut self) -> Result<&mut HashMap<Bytes, Value>> {
        match self {
            Value::Hash(h) => Ok(h),
            _ => Err(Error::TypeMismatch),
        }
    }

    pub fn as_sorted_set(&self) -> Result<&SortedSet> {
        match self {
            Value::SortedSet(z) => Ok(z),
            _ => Err(Error::TypeMismatch),
        }
    }

    pub fn as_sorted_set_mut(&mut self) -> Result<&mut SortedSet> {
        match self {
            Value::SortedSet(z) => Ok(z),
            _ => Err(Error::TypeMismatch),
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Scalar(Scalar::Bytes(b))
    }
}

impl From<&'static str> for Value {
    fn from(s: &'static str) -> Self {
        Value::Scalar(Scalar::Bytes(Bytes::from_static(s.as_bytes())))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(Scalar::Bytes(Bytes::from(s)))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Scalar(Scalar::Integer(n))
    }
}

impl From<SortedSet> for Value {
    fn from(z: SortedSet) -> Self {
        Value::SortedSet(z)
    }
}
