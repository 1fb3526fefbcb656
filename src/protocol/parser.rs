//! Request Parser
//!
//! Turns one buffer of client bytes into a [`Request`]: a command name and
//! its argument vector. Two input shapes are accepted.
//!
//! ## Framed Requests
//!
//! A buffer starting with `*` or `$` is scanned as a length-prefixed frame:
//!
//! ```text
//!   *2\r\n $3\r\n GET\r\n $3\r\n foo\r\n
//!   ──┬──  ──┬──  ──┬──   ──┬──  ──┬──
//!     │      │      │       │      └─ 3 bytes consumed as element 1
//!     │      │      │       └──────── length of element 1
//!     │      │      └──────────────── 3 bytes consumed as element 0 (command)
//!     │      └─────────────────────── length of element 0
//!     └────────────────────────────── element count (command + args)
//! ```
//!
//! A count or length token ends with a raw CR-LF or with the four literal
//! characters `\r\n`, so frames typed into a terminal work too. Terminators
//! between tokens are skipped. Once a length is pending, exactly that many
//! bytes are taken as the next element, whatever they contain.
//!
//! ## Plain-Text Requests
//!
//! Anything else is a single command line: it is trimmed and split on
//! whitespace, the first word being the command.
//!
//! ```text
//!   SET a b EX 5   =>   SET ["a", "b", "EX", "5"]
//! ```
//!
//! On a socket, [`parse_buffered`] takes plain text one newline-terminated
//! line at a time, so several lines arriving in one read are separate
//! requests. A frame always spans the whole buffer.

use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur while parsing a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing but whitespace was received
    #[error("empty request")]
    EmptyInput,

    /// The buffer ended before every announced element arrived
    #[error("incomplete request")]
    Incomplete,

    /// The element count is not a positive integer
    #[error("invalid element count")]
    InvalidCount,

    /// A second `*` header appeared in the same request
    #[error("element count announced twice")]
    DuplicateCount,

    /// The element length is not a positive integer
    #[error("invalid element length")]
    InvalidLength,

    /// A `$` header appeared before the `*` header
    #[error("element length announced before element count")]
    LengthBeforeCount,

    /// Data appeared where a header was expected
    #[error("unexpected data at byte {0}")]
    UnexpectedData(usize),

    /// More elements followed than the count announced
    #[error("more elements than announced")]
    TooManyElements,

    /// A plain-text request continued past its first line
    #[error("plain-text request spans more than one line")]
    MultipleLines,

    /// The command name is not valid UTF-8
    #[error("command name is not valid UTF-8")]
    InvalidUtf8,
}

pub type ParseResult<T> = Result<T, ParseError>;

/// A parsed request: the command token as sent and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub name: String,
    pub args: Vec<Bytes>,
}

impl Request {
    fn from_tokens(mut tokens: Vec<Bytes>) -> ParseResult<Self> {
        if tokens.is_empty() {
            return Err(ParseError::EmptyInput);
        }
        let args = tokens.split_off(1);
        let name = std::str::from_utf8(&tokens[0])
            .map_err(|_| ParseError::InvalidUtf8)?
            .to_string();
        Ok(Self { name, args })
    }
}

/// Parses a buffer holding exactly one request.
///
/// # Example
///
/// ```
/// use stashkv::protocol::parse;
///
/// let request = parse(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n").unwrap();
/// assert_eq!(request.name, "GET");
/// assert_eq!(request.args, vec!["foo"]);
/// ```
pub fn parse(buf: &[u8]) -> ParseResult<Request> {
    match buf.first() {
        Some(b'*') | Some(b'$') => FrameScanner::new(buf).scan(),
        _ => parse_line(buf),
    }
}

/// Parses the request at the head of a socket buffer.
///
/// Returns the number of bytes the request spans together with its parse
/// result, or `None` while more bytes are needed. A plain-text request spans
/// its first line including the newline.
pub fn parse_buffered(buf: &[u8]) -> Option<(usize, ParseResult<Request>)> {
    let consumed = match buf.first()? {
        b'*' | b'$' => buf.len(),
        _ => buf.iter().position(|&b| b == b'\n')? + 1,
    };

    match parse(&buf[..consumed]) {
        Err(ParseError::Incomplete) => None,
        result => Some((consumed, result)),
    }
}

fn parse_line(buf: &[u8]) -> ParseResult<Request> {
    let line = match buf.iter().position(|&b| b == b'\n') {
        Some(end) if buf[end..].iter().any(|b| !b.is_ascii_whitespace()) => {
            return Err(ParseError::MultipleLines);
        }
        Some(end) => &buf[..end],
        None => buf,
    };

    let tokens = line
        .split(|b| b.is_ascii_whitespace())
        .filter(|token| !token.is_empty())
        .map(Bytes::copy_from_slice)
        .collect();
    Request::from_tokens(tokens)
}

// ============================================================================
// Frame scanner
// ============================================================================

struct FrameScanner<'a> {
    buf: &'a [u8],
    pos: usize,
    /// Elements announced by the `*` header
    expected: Option<usize>,
    /// Byte length announced by the last `$` header
    pending_len: Option<usize>,
    tokens: Vec<Bytes>,
}

impl<'a> FrameScanner<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            expected: None,
            pending_len: None,
            tokens: Vec::new(),
        }
    }

    fn scan(mut self) -> ParseResult<Request> {
        loop {
            if self.expected == Some(self.tokens.len()) {
                return self.finish();
            }
            if self.pos >= self.buf.len() {
                return Err(ParseError::Incomplete);
            }

            if let Some(len) = self.pending_len.take() {
                let end = self.pos + len;
                if end > self.buf.len() {
                    return Err(ParseError::Incomplete);
                }
                self.tokens
                    .push(Bytes::copy_from_slice(&self.buf[self.pos..end]));
                self.pos = end;
                continue;
            }

            if let Some(width) = terminator_at(self.buf, self.pos) {
                self.pos += width;
                continue;
            }

            match self.buf[self.pos] {
                b'*' => {
                    if self.expected.is_some() {
                        return Err(ParseError::DuplicateCount);
                    }
                    let count = self.read_number()?;
                    if count < 1 {
                        return Err(ParseError::InvalidCount);
                    }
                    self.expected = Some(count as usize);
                }
                b'$' => {
                    if self.expected.is_none() {
                        return Err(ParseError::LengthBeforeCount);
                    }
                    let len = self.read_number()?;
                    if len <= 0 {
                        return Err(ParseError::InvalidLength);
                    }
                    self.pending_len = Some(len as usize);
                }
                _ => return Err(ParseError::UnexpectedData(self.pos)),
            }
        }
    }

    /// Reads the integer after a `*` or `$` prefix up to its terminator.
    fn read_number(&mut self) -> ParseResult<i64> {
        let start = self.pos + 1;
        let (end, width) = (start..self.buf.len())
            .find_map(|i| terminator_at(self.buf, i).map(|w| (i, w)))
            .ok_or(ParseError::Incomplete)?;

        let invalid = if self.buf[self.pos] == b'*' {
            ParseError::InvalidCount
        } else {
            ParseError::InvalidLength
        };
        let number = std::str::from_utf8(&self.buf[start..end])
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(invalid)?;

        self.pos = end + width;
        Ok(number)
    }

    fn finish(mut self) -> ParseResult<Request> {
        while let Some(width) = terminator_at(self.buf, self.pos) {
            self.pos += width;
        }
        if self.pos < self.buf.len() {
            return Err(ParseError::TooManyElements);
        }
        Request::from_tokens(self.tokens)
    }
}

/// Width of the terminator starting at `pos`: 2 for raw CR-LF, 4 for the
/// escaped `\r\n` text, `None` if there is none.
fn terminator_at(buf: &[u8], pos: usize) -> Option<usize> {
    let rest = buf.get(pos..)?;
    if rest.starts_with(b"\r\n") {
        Some(2)
    } else if rest.starts_with(b"\\r\\n") {
        Some(4)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&'static str]) -> Vec<Bytes> {
        items.iter().map(|s| Bytes::from_static(s.as_bytes())).collect()
    }

    #[test]
    fn test_parse_framed() {
        let request = parse(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n").unwrap();
        assert_eq!(request.name, "GET");
        assert_eq!(request.args, args(&["foo"]));
    }

    #[test]
    fn test_parse_escaped_terminators() {
        let request = parse(br"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n").unwrap();
        assert_eq!(request.name, "GET");
        assert_eq!(request.args, args(&["foo"]));
    }

    #[test]
    fn test_parse_plain_text() {
        let request = parse(b"  SET a b EX 5 \r\n").unwrap();
        assert_eq!(request.name, "SET");
        assert_eq!(request.args, args(&["a", "b", "EX", "5"]));

        let request = parse(b"ping").unwrap();
        assert_eq!(request.name, "ping");
        assert!(request.args.is_empty());
    }

    #[test]
    fn test_element_bytes_taken_verbatim() {
        let request = parse(b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$4\r\na\r\nb\r\n").unwrap();
        assert_eq!(request.args, args(&["k", "a\r\nb"]));

        let request = parse(b"*2\r\n$4\r\nECHO\r\n$2\r\n*$\r\n").unwrap();
        assert_eq!(request.args, args(&["*$"]));
    }

    #[test]
    fn test_incomplete() {
        assert_eq!(parse(b"*2"), Err(ParseError::Incomplete));
        assert_eq!(parse(b"*2\r\n$3\r\nGET\r\n"), Err(ParseError::Incomplete));
        assert_eq!(parse(b"*2\r\n$3\r\nGET\r\n$3\r\nfo"), Err(ParseError::Incomplete));
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(parse(b"*0\r\n"), Err(ParseError::InvalidCount));
        assert_eq!(parse(b"*x\r\n"), Err(ParseError::InvalidCount));
        assert_eq!(parse(b"*1\r\n*1\r\n"), Err(ParseError::DuplicateCount));
        assert_eq!(parse(b"$3\r\nGET\r\n"), Err(ParseError::LengthBeforeCount));
        assert_eq!(parse(b"*1\r\n$0\r\n"), Err(ParseError::InvalidLength));
        assert_eq!(parse(b"*1\r\n$-1\r\n"), Err(ParseError::InvalidLength));
        assert_eq!(parse(b"*1\r\nGET\r\n"), Err(ParseError::UnexpectedData(4)));
        assert_eq!(
            parse(b"*1\r\n$4\r\nPING\r\n$3\r\nfoo\r\n"),
            Err(ParseError::TooManyElements)
        );
    }

    #[test]
    fn test_plain_text_is_one_line() {
        assert_eq!(
            parse(b"RPUSH l a\r\nRPUSH l b\r\n"),
            Err(ParseError::MultipleLines)
        );
        assert_eq!(parse(b"GET a\r\n\r\n  ").unwrap().args, args(&["a"]));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse(b""), Err(ParseError::EmptyInput));
        assert_eq!(parse(b"   \r\n"), Err(ParseError::EmptyInput));
    }

    #[test]
    fn test_parse_buffered_waits_for_newline() {
        assert_eq!(parse_buffered(b""), None);
        assert_eq!(parse_buffered(b"GET fo"), None);
        assert_eq!(parse_buffered(b"*1\r\n$4\r\nPI"), None);

        let (consumed, request) = parse_buffered(b"GET foo\n").unwrap();
        assert_eq!(consumed, 8);
        assert_eq!(request.unwrap().args, args(&["foo"]));
    }

    #[test]
    fn test_parse_buffered_takes_one_line_at_a_time() {
        let buf = b"RPUSH l a\r\nRPUSH l b\r\nGET";

        let (first, request) = parse_buffered(buf).unwrap();
        assert_eq!(first, 11);
        assert_eq!(request.unwrap().args, args(&["l", "a"]));

        let (second, request) = parse_buffered(&buf[first..]).unwrap();
        assert_eq!(second, 11);
        assert_eq!(request.unwrap().args, args(&["l", "b"]));

        assert_eq!(parse_buffered(&buf[first + second..]), None);
    }

    #[test]
    fn test_parse_buffered_frame_spans_buffer() {
        let frame = b"*1\r\n$4\r\nPING\r\n";
        let (consumed, request) = parse_buffered(frame).unwrap();
        assert_eq!(consumed, frame.len());
        assert_eq!(request.unwrap().name, "PING");

        let (_, blank) = parse_buffered(b"\r\nPING\r\n").unwrap();
        assert_eq!(blank, Err(ParseError::EmptyInput));
    }
}
