//! RESP (Redis Serialization Protocol) Reply Types
//!
//! This module defines the values a [`ReplyReader`](crate::protocol::ReplyReader)
//! produces from a server's reply stream.
//!
//! ## Protocol Format
//!
//! Each RESP reply starts with a type prefix byte:
//! - `+` Status
//! - `-` Error
//! - `:` Integer
//! - `$` Bulk String
//! - `*` Array
//!
//! All header lines are terminated with CRLF (`\r\n`).
//!
//! ## Examples
//!
//! Status: `+OK\r\n`
//! Error: `-ERR unknown command\r\n`
//! Integer: `:1000\r\n`
//! Bulk String: `$5\r\nhello\r\n`
//! Array: `*2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n`
//! Null Bulk String: `$-1\r\n`
//! Null Array: `*-1\r\n`

use crate::protocol::encoding::Charset;
use bytes::Bytes;
use std::fmt;
use thiserror::Error;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const STATUS: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A reply read off the wire.
///
/// Error replies are ordinary values: they come back through the same
/// channel as everything else and may sit inside arrays. Use
/// [`RespValue::into_result`] to turn a top-level error into a Rust `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Null bulk string (`$-1\r\n`) or null array (`*-1\r\n`).
    Nil,

    /// 64-bit signed integer.
    /// Format: `:<integer>\r\n`
    Integer(i64),

    /// Status line, always text.
    /// Format: `+<string>\r\n`
    Status(String),

    /// Length-prefixed payload, decoded according to the reader's
    /// encoding policy.
    /// Format: `$<length>\r\n<data>\r\n`
    Bulk(BulkString),

    /// Error reply.
    /// Format: `-<error message>\r\n`
    Error(String),

    /// Ordered sequence of replies, possibly nested.
    /// Format: `*<count>\r\n<element1><element2>...`
    Array(Vec<RespValue>),
}

/// The payload of a bulk string reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkString {
    /// Payload decoded as text.
    Text(String),

    /// Payload returned as-is under the raw encoding policy.
    Raw(Bytes),

    /// Payload that was not valid in the configured charset. The bytes are
    /// kept so the caller can recover them.
    Invalid { bytes: Bytes, charset: Charset },
}

impl BulkString {
    /// Returns the payload as text, if it was decoded.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            BulkString::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the payload bytes. For decoded text these are the UTF-8 bytes
    /// of the decoded string.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            BulkString::Text(s) => s.as_bytes(),
            BulkString::Raw(b) => b,
            BulkString::Invalid { bytes, .. } => bytes,
        }
    }

    /// Returns false only for payloads the configured charset rejected.
    pub fn is_valid(&self) -> bool {
        !matches!(self, BulkString::Invalid { .. })
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consumes the payload and returns its bytes.
    pub fn into_bytes(self) -> Bytes {
        match self {
            BulkString::Text(s) => Bytes::from(s),
            BulkString::Raw(b) => b,
            BulkString::Invalid { bytes, .. } => bytes,
        }
    }
}

/// An error reply surfaced as a Rust error by [`RespValue::into_result`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ReplyError {
    pub message: String,
}

impl ReplyError {
    /// The error code: the first word of the message, e.g. `ERR` or `WRONGTYPE`.
    pub fn code(&self) -> &str {
        self.message.split_whitespace().next().unwrap_or("")
    }
}

impl RespValue {
    /// Creates a status reply.
    ///
    /// # Example
    /// ```
    /// use respreader::protocol::types::RespValue;
    /// let ok = RespValue::status("OK");
    /// assert_eq!(ok.as_str(), Some("OK"));
    /// ```
    pub fn status(s: impl Into<String>) -> Self {
        RespValue::Status(s.into())
    }

    /// Creates an error reply.
    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    pub fn integer(n: i64) -> Self {
        RespValue::Integer(n)
    }

    /// Creates a bulk string reply holding decoded text.
    ///
    /// # Example
    /// ```
    /// use respreader::protocol::types::RespValue;
    /// let bulk = RespValue::text("hello");
    /// assert_eq!(bulk.as_bytes(), Some(&b"hello"[..]));
    /// ```
    pub fn text(s: impl Into<String>) -> Self {
        RespValue::Bulk(BulkString::Text(s.into()))
    }

    /// Creates a bulk string reply holding raw bytes.
    pub fn raw(data: impl Into<Bytes>) -> Self {
        RespValue::Bulk(BulkString::Raw(data.into()))
    }

    pub fn nil() -> Self {
        RespValue::Nil
    }

    pub fn array(values: Vec<RespValue>) -> Self {
        RespValue::Array(values)
    }

    /// Returns true if this value is nil.
    pub fn is_nil(&self) -> bool {
        matches!(self, RespValue::Nil)
    }

    /// Returns true if this value is an error reply.
    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }

    /// Extracts the text of a status reply or a decoded bulk string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RespValue::Status(s) => Some(s),
            RespValue::Bulk(b) => b.as_str(),
            _ => None,
        }
    }

    /// Extracts the payload bytes of a bulk string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RespValue::Bulk(b) => Some(b.as_bytes()),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RespValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[RespValue]> {
        match self {
            RespValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Consumes self and returns the inner array if this is an Array variant.
    pub fn into_array(self) -> Option<Vec<RespValue>> {
        match self {
            RespValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Turns a top-level error reply into `Err`, passing everything else
    /// through. Errors nested inside arrays are left alone.
    pub fn into_result(self) -> Result<RespValue, ReplyError> {
        match self {
            RespValue::Error(message) => Err(ReplyError { message }),
            other => Ok(other),
        }
    }

    /// Writes the value the way `redis-cli` lays it out, with nested array
    /// items aligned under their parent's index.
    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        match self {
            RespValue::Status(s) => write!(f, "{}", s),
            RespValue::Error(s) => write!(f, "(error) {}", s),
            RespValue::Integer(n) => write!(f, "(integer) {}", n),
            RespValue::Bulk(BulkString::Text(s)) => write!(f, "{:?}", s),
            RespValue::Bulk(BulkString::Raw(data)) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "{:?}", s),
                Err(_) => write!(f, "(binary data, {} bytes)", data.len()),
            },
            RespValue::Bulk(BulkString::Invalid { bytes, charset }) => {
                write!(f, "(invalid {}, {} bytes)", charset, bytes.len())
            }
            RespValue::Nil => write!(f, "(nil)"),
            RespValue::Array(values) if values.is_empty() => write!(f, "(empty array)"),
            RespValue::Array(values) => {
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, "\n{:indent$}", "", indent = indent)?;
                    }
                    let label = format!("{}) ", i + 1);
                    f.write_str(&label)?;
                    v.fmt_indented(f, indent + label.len())?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_string_accessors() {
        let text = BulkString::Text("hello".to_string());
        assert_eq!(text.as_str(), Some("hello"));
        assert_eq!(text.as_bytes(), b"hello");
        assert_eq!(text.len(), 5);
        assert!(text.is_valid());

        let invalid = BulkString::Invalid {
            bytes: Bytes::from_static(b"\xff"),
            charset: Charset::Utf8,
        };
        assert_eq!(invalid.as_str(), None);
        assert_eq!(invalid.as_bytes(), b"\xff");
        assert!(!invalid.is_valid());
        assert_eq!(invalid.into_bytes(), Bytes::from_static(b"\xff"));
    }

    #[test]
    fn test_empty_bulk_is_not_nil() {
        let empty = RespValue::text("");
        assert!(!empty.is_nil());
        assert_eq!(empty.as_bytes(), Some(&b""[..]));
        assert!(RespValue::nil().is_nil());
    }

    #[test]
    fn test_into_result() {
        let err = RespValue::error("WRONGTYPE Operation against a key").into_result();
        let err = err.unwrap_err();
        assert_eq!(err.code(), "WRONGTYPE");
        assert_eq!(err.to_string(), "WRONGTYPE Operation against a key");

        let ok = RespValue::status("OK").into_result().unwrap();
        assert_eq!(ok, RespValue::status("OK"));

        // Nested errors stay data
        let arr = RespValue::array(vec![RespValue::error("ERR x")]);
        assert!(arr.into_result().is_ok());
    }

    #[test]
    fn test_display_scalars() {
        assert_eq!(RespValue::status("OK").to_string(), "OK");
        assert_eq!(RespValue::error("ERR bad").to_string(), "(error) ERR bad");
        assert_eq!(RespValue::integer(-3).to_string(), "(integer) -3");
        assert_eq!(RespValue::text("hi").to_string(), "\"hi\"");
        assert_eq!(RespValue::nil().to_string(), "(nil)");
        assert_eq!(RespValue::array(vec![]).to_string(), "(empty array)");
        assert_eq!(
            RespValue::raw(Bytes::from_static(b"\xff\x00")).to_string(),
            "(binary data, 2 bytes)"
        );
    }

    #[test]
    fn test_display_nested_array() {
        let value = RespValue::array(vec![
            RespValue::array(vec![RespValue::text("hello"), RespValue::text("world")]),
            RespValue::text("!"),
        ]);
        assert_eq!(
            value.to_string(),
            "1) 1) \"hello\"\n   2) \"world\"\n2) \"!\""
        );
    }
}
