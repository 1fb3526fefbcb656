//! Reply Types
//!
//! Every command produces exactly one [`RespValue`]. Its wire form uses a
//! one-byte type prefix and ends with CRLF:
//!
//! - `+` Simple String  `+OK\r\n`
//! - `-` Error          `-ERR no value found for key 'foo'\r\n`
//! - `:` Integer        `:42\r\n`
//! - `$` Bulk String    `$5\r\nhello\r\n` (absent: `$-1\r\n`)
//! - `*` Array          `*2\r\n$1\r\na\r\n$1\r\nb\r\n`
//!
//! Stored values and core errors convert into replies here, so the
//! dispatcher never formats wire text by hand.

use crate::error::Error;
use crate::storage::{RangeItem, Value};
use bytes::Bytes;

/// Line terminator for every reply line
pub const CRLF: &[u8] = b"\r\n";

/// Type prefix bytes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A reply produced by the command dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Status line such as `OK`, `True` or `The key has been deleted`
    SimpleString(String),

    /// Error line, already carrying its `ERR ` prefix
    Error(String),

    Integer(i64),

    /// Binary-safe payload
    BulkString(Bytes),

    /// Absent value, written as `$-1`
    Null,

    Array(Vec<RespValue>),
}

impl RespValue {
    /// Status reply.
    ///
    /// ```
    /// use stashkv::protocol::RespValue;
    /// assert_eq!(RespValue::simple_string("True").serialize(), b"+True\r\n");
    /// ```
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    pub fn integer(n: i64) -> Self {
        RespValue::Integer(n)
    }

    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(data.into())
    }

    pub fn null() -> Self {
        RespValue::Null
    }

    pub fn array(values: Vec<RespValue>) -> Self {
        RespValue::Array(values)
    }

    pub fn ok() -> Self {
        RespValue::simple_string("OK")
    }

    pub fn pong() -> Self {
        RespValue::simple_string("PONG")
    }

    /// Encodes the reply, including its final CRLF.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Appends the encoded reply to `buf`.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        fn line(buf: &mut Vec<u8>, prefix: u8, body: &[u8]) {
            buf.push(prefix);
            buf.extend_from_slice(body);
            buf.extend_from_slice(CRLF);
        }

        match self {
            RespValue::SimpleString(s) => line(buf, prefix::SIMPLE_STRING, s.as_bytes()),
            RespValue::Error(s) => line(buf, prefix::ERROR, s.as_bytes()),
            RespValue::Integer(n) => line(buf, prefix::INTEGER, n.to_string().as_bytes()),
            RespValue::BulkString(data) => {
                line(buf, prefix::BULK_STRING, data.len().to_string().as_bytes());
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            RespValue::Null => line(buf, prefix::BULK_STRING, b"-1"),
            RespValue::Array(values) => {
                line(buf, prefix::ARRAY, values.len().to_string().as_bytes());
                for value in values {
                    value.serialize_into(buf);
                }
            }
        }
    }

    /// Returns true if this value is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }

    /// Renders a stored value.
    ///
    /// Scalars become bulk strings. Lists become arrays of their items,
    /// hashes become `field, value, ...` arrays and sorted sets become
    /// `member, score, ...` arrays.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Scalar(scalar) => RespValue::BulkString(scalar.to_bytes()),
            Value::List(items) => RespValue::Array(items.iter().map(Self::from_value).collect()),
            Value::Hash(fields) => {
                let mut pairs: Vec<_> = fields.iter().collect();
                pairs.sort_by(|a, b| a.0.cmp(b.0));
                RespValue::Array(
                    pairs
                        .into_iter()
                        .flat_map(|(field, value)| {
                            [RespValue::BulkString(field.clone()), Self::from_value(value)]
                        })
                        .collect(),
                )
            }
            Value::SortedSet(set) => RespValue::Array(
                set.range(0, -1)
                    .iter()
                    .flat_map(|entry| {
                        [
                            RespValue::BulkString(entry.member.clone()),
                            RespValue::bulk_string(entry.score.to_string()),
                        ]
                    })
                    .collect(),
            ),
        }
    }
}

impl From<Error> for RespValue {
    fn from(err: Error) -> Self {
        RespValue::Error(format!("ERR {}", err))
    }
}

impl From<Value> for RespValue {
    fn from(value: Value) -> Self {
        RespValue::from_value(&value)
    }
}

impl From<RangeItem> for RespValue {
    fn from(item: RangeItem) -> Self {
        match item {
            RangeItem::Member(member) => RespValue::BulkString(member),
            RangeItem::Score(score) => RespValue::bulk_string(score.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_string_serialize() {
        let value = RespValue::simple_string("OK");
        assert_eq!(value.serialize(), b"+OK\r\n");
    }

    #[test]
    fn test_error_serialize() {
        let value = RespValue::error("ERR unknown command");
        assert_eq!(value.serialize(), b"-ERR unknown command\r\n");
    }

    #[test]
    fn test_integer_serialize() {
        let value = RespValue::integer(1000);
        assert_eq!(value.serialize(), b":1000\r\n");

        let negative = RespValue::integer(-42);
        assert_eq!(negative.serialize(), b":-42\r\n");
    }

    #[test]
    fn test_bulk_string_serialize() {
        let value = RespValue::bulk_string(Bytes::from("hello"));
        assert_eq!(value.serialize(), b"$5\r\nhello\r\n");
    }

    #[test]
    fn test_null_serialize() {
        let value = RespValue::null();
        assert_eq!(value.serialize(), b"$-1\r\n");
    }

    #[test]
    fn test_array_serialize() {
        let value = RespValue::array(vec![
            RespValue::bulk_string(Bytes::from("GET")),
            RespValue::bulk_string(Bytes::from("name")),
        ]);
        assert_eq!(value.serialize(), b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n");
    }

    #[test]
    fn test_nested_array_serialize() {
        let value = RespValue::array(vec![
            RespValue::integer(1),
            RespValue::array(vec![RespValue::integer(2), RespValue::integer(3)]),
        ]);
        assert_eq!(value.serialize(), b"*2\r\n:1\r\n*2\r\n:2\r\n:3\r\n");
    }

    #[test]
    fn test_ok_response() {
        assert_eq!(RespValue::ok().serialize(), b"+OK\r\n");
    }

    #[test]
    fn test_pong_response() {
        assert_eq!(RespValue::pong().serialize(), b"+PONG\r\n");
    }

    #[test]
    fn test_error_conversion() {
        let reply = RespValue::from(Error::not_found(b"foo"));
        assert_eq!(reply.serialize(), b"-ERR no value found for key 'foo'\r\n");
        assert!(reply.is_error());
    }

    #[test]
    fn test_value_conversion() {
        use std::collections::{HashMap, VecDeque};

        assert_eq!(RespValue::from(Value::from(42i64)).serialize(), b"$2\r\n42\r\n");

        let list = Value::List(VecDeque::from(vec![Value::from("a"), Value::from("b")]));
        assert_eq!(RespValue::from(list).serialize(), b"*2\r\n$1\r\na\r\n$1\r\nb\r\n");

        let mut fields = HashMap::new();
        fields.insert(Bytes::from("z"), Value::from("1"));
        fields.insert(Bytes::from("a"), Value::from("2"));
        assert_eq!(
            RespValue::from(Value::Hash(fields)),
            RespValue::array(vec![
                RespValue::bulk_string("a"),
                RespValue::bulk_string("2"),
                RespValue::bulk_string("z"),
                RespValue::bulk_string("1"),
            ])
        );
    }

    #[test]
    fn test_score_rendering() {
        assert_eq!(RespValue::from(RangeItem::Score(1.5)), RespValue::bulk_string("1.5"));
        assert_eq!(RespValue::from(RangeItem::Score(3.0)), RespValue::bulk_string("3"));
    }
}
