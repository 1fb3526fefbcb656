//! Wire Protocol
//!
//! Requests come in as framed (`*N` / `$L`) or plain-text bytes and leave as
//! typed replies.
//!
//! ## Modules
//!
//! - `parser`: bytes in, [`Request`] (command name + arguments) out
//! - `types`: the [`RespValue`] reply and its encoding
//!
//! ## Example
//!
//! ```
//! use stashkv::protocol::{parse, RespValue};
//!
//! let request = parse(b"SET a b EX 5").unwrap();
//! assert_eq!(request.name, "SET");
//! assert_eq!(request.args.len(), 4);
//!
//! let reply = RespValue::bulk_string("Ariz");
//! assert_eq!(reply.serialize(), b"$4\r\nAriz\r\n");
//! ```

pub mod parser;
pub mod types;

pub use parser::{parse, parse_buffered, ParseError, ParseResult, Request};
pub use types::RespValue;
