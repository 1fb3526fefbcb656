//! Error types for StashKV
//!
//! Every failure the core can produce is one of these kinds. None of them is
//! fatal: the command dispatcher turns each into a `-ERR <message>` reply and
//! the connection stays open for the next request.

use thiserror::Error;

/// Result type alias for store and dispatcher operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the typed store, the collection engines and the dispatcher.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed framing, a missing argument or an unknown modifier
    #[error("syntax error")]
    Syntax,

    /// The command name is not in the dispatch table
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// The command was given the wrong number of arguments
    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    /// The key (or hash field) does not exist
    #[error("no value found for key '{0}'")]
    NotFound(String),

    /// The operation expected a different value variant
    #[error("operation against a key holding the wrong kind of value")]
    TypeMismatch,

    /// An integer (or score) was required but the input did not parse
    #[error("value is not an integer or out of range")]
    InvalidFormat,

    /// An index was outside the bounds of a list
    #[error("index out of range")]
    IndexOutOfRange,

    /// The destination key already exists
    #[error("key '{0}' already exists")]
    AlreadyExists(String),

    /// Integer arithmetic would leave the 64-bit range
    #[error("increment or decrement would overflow")]
    Overflow,
}

impl Error {
    /// Builds a `NotFound` error for a raw key.
    pub fn not_found(key: &[u8]) -> Self {
        Error::NotFound(String::from_utf8_lossy(key).into_owned())
    }

    /// Builds an `AlreadyExists` error for a raw key.
    pub fn already_exists(key: &[u8]) -> Self {
        Error::AlreadyExists(String::from_utf8_lossy(key).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(Error::not_found(b"foo").to_string(), "no value found for key 'foo'");
        assert_eq!(
            Error::WrongArity("GET").to_string(),
            "wrong number of arguments for 'GET' command"
        );
        assert_eq!(
            Error::UnknownCommand("NOPE".into()).to_string(),
            "unknown command 'NOPE'"
        );
    }
}
