//! Incremental RESP Reply Reader
//!
//! This module implements a resumable parser for server replies. Bytes are
//! fed in as they arrive, in chunks of any size, and complete replies are
//! pulled out one at a time.
//!
//! ## How the Reader Works
//!
//! [`ReplyReader::get_next_reply`] returns either:
//! - `Ok(Some(value))` - A complete reply, including all nested elements
//! - `Ok(None)` - Not enough data buffered yet, feed more and call again
//! - `Err(ParseError)` - The stream is malformed and cannot be resynchronised
//!
//! A recursive-descent parser cannot stop halfway through an array and pick
//! up later. Instead the reader keeps an explicit stack of pending array
//! frames:
//!
//! ```text
//! *2\r\n*2\r\n$5\r\nhello\r\n  ... more bytes later ...
//!
//!   stack                      scratch
//! ┌──────────────────────────┐ ┌────────────┐
//! │ [1] remaining 1 ["hello"]│ │ bulk len 5 │  <- top receives next value
//! │ [0] remaining 2 []       │ └────────────┘
//! └──────────────────────────┘
//! ```
//!
//! Every completed value is pushed into the top frame. When a frame fills up
//! it is popped and becomes the value handed to the frame below it, so
//! several arrays can close on a single feed. When the stack is empty the
//! value goes to the caller.
//!
//! Incomplete never consumes a partial line. The one exception is a bulk
//! string whose header has been read but whose payload has not fully
//! arrived: the header is consumed and its length kept in a scratch slot.

use crate::protocol::buffer::{ReadBuffer, DEFAULT_MAX_IDLE_CAPACITY};
use crate::protocol::encoding::EncodingPolicy;
use crate::protocol::types::{prefix, RespValue, CRLF};
use thiserror::Error;
use tracing::{trace, warn};

/// Errors that make a reply stream unreadable.
///
/// These are distinct from error replies, which are returned as
/// [`RespValue::Error`], and from incomplete data, which is `Ok(None)`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    /// Unknown type prefix byte
    #[error("protocol error, got {0:#04x} as reply type byte")]
    UnknownPrefix(u8),

    /// Header is not a valid decimal integer
    #[error("invalid integer: {0:?}")]
    InvalidInteger(String),

    /// Bulk string length is negative (but not -1 for null)
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// Array length is negative (but not -1 for null)
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// Protocol violation (missing CRLF, etc.)
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// A bulk string exceeds the configured maximum size
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// An array declares more elements than allowed
    #[error("too many array elements: {count} (max: {max})")]
    TooManyElements { count: usize, max: usize },

    /// Arrays nested deeper than allowed
    #[error("maximum nesting depth exceeded: {0}")]
    NestingTooDeep(usize),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array nesting depth
pub const MAX_NESTING_DEPTH: usize = 32;

/// Maximum number of elements in a single array
pub const MAX_ARRAY_ELEMENTS: usize = u32::MAX as usize;

/// Upper bound on the capacity reserved up front for an array frame, so a
/// hostile header cannot force a huge allocation before any element arrives.
const MAX_PREALLOCATED_ELEMENTS: usize = 1024;

/// Reader configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// How bulk string payloads are decoded
    pub encoding: EncodingPolicy,

    /// Largest accepted bulk string, in bytes
    pub max_bulk_len: usize,

    /// Largest number of arrays that may be open at once
    pub max_depth: usize,

    /// Largest accepted array element count
    pub max_elements: usize,

    /// Capacity above which a drained read buffer releases its allocation
    pub max_idle_buffer: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            encoding: EncodingPolicy::default(),
            max_bulk_len: MAX_BULK_SIZE,
            max_depth: MAX_NESTING_DEPTH,
            max_elements: MAX_ARRAY_ELEMENTS,
            max_idle_buffer: DEFAULT_MAX_IDLE_CAPACITY,
        }
    }
}

impl ReaderConfig {
    pub fn with_encoding(mut self, encoding: EncodingPolicy) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_max_bulk_len(mut self, max_bulk_len: usize) -> Self {
        self.max_bulk_len = max_bulk_len;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_elements(mut self, max_elements: usize) -> Self {
        self.max_elements = max_elements;
        self
    }

    pub fn with_max_idle_buffer(mut self, max_idle_buffer: usize) -> Self {
        self.max_idle_buffer = max_idle_buffer;
        self
    }
}

/// An array still waiting for some of its elements.
#[derive(Debug)]
struct Frame {
    remaining: usize,
    elements: Vec<RespValue>,
}

impl Frame {
    fn new(count: usize) -> Self {
        Self {
            remaining: count,
            elements: Vec::with_capacity(count.min(MAX_PREALLOCATED_ELEMENTS)),
        }
    }

    /// Adds an element, returning the finished elements once the last one
    /// has arrived.
    fn push(&mut self, value: RespValue) -> Option<Vec<RespValue>> {
        self.elements.push(value);
        self.remaining -= 1;
        if self.remaining == 0 {
            Some(std::mem::take(&mut self.elements))
        } else {
            None
        }
    }
}

/// A parsed header line.
enum Header {
    Status(String),
    Error(String),
    Integer(i64),
    BulkLen(i64),
    ArrayLen(i64),
}

impl Header {
    fn parse(line: &[u8]) -> ParseResult<Self> {
        let (&tag, rest) = match line.split_first() {
            Some(split) => split,
            // A bare CRLF where a type byte should be
            None => return Err(ParseError::UnknownPrefix(CRLF[0])),
        };

        match tag {
            prefix::STATUS => Ok(Header::Status(String::from_utf8_lossy(rest).into_owned())),
            prefix::ERROR => Ok(Header::Error(String::from_utf8_lossy(rest).into_owned())),
            prefix::INTEGER => Ok(Header::Integer(parse_decimal(rest)?)),
            prefix::BULK_STRING => Ok(Header::BulkLen(parse_decimal(rest)?)),
            prefix::ARRAY => Ok(Header::ArrayLen(parse_decimal(rest)?)),
            other => Err(ParseError::UnknownPrefix(other)),
        }
    }
}

/// Outcome of parsing one unit at the cursor.
enum Step {
    /// More bytes are needed
    Incomplete,
    /// A new frame was opened; parse its first element next
    Descend,
    /// A value was produced
    Value(RespValue),
}

/// An incremental reader for RESP replies.
///
/// # Example
///
/// ```
/// use respreader::protocol::{ReplyReader, RespValue};
///
/// let mut reader = ReplyReader::new();
/// reader.feed(b"*2\r\n$5\r\nhel");
/// assert_eq!(reader.get_next_reply().unwrap(), None);
///
/// reader.feed(b"lo\r\n:42\r\n");
/// assert_eq!(
///     reader.get_next_reply().unwrap(),
///     Some(RespValue::array(vec![RespValue::text("hello"), RespValue::integer(42)]))
/// );
/// ```
#[derive(Debug)]
pub struct ReplyReader {
    /// Bytes received but not yet parsed
    buffer: ReadBuffer,

    /// Arrays still waiting for elements, innermost last
    stack: Vec<Frame>,

    /// Declared length of a bulk string whose header has been consumed
    pending_bulk: Option<usize>,

    config: ReaderConfig,

    /// Set once the stream is found to be malformed
    failure: Option<ParseError>,
}

impl Default for ReplyReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplyReader {
    /// Creates a reader with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ReaderConfig::default())
    }

    pub fn with_config(config: ReaderConfig) -> Self {
        Self {
            buffer: ReadBuffer::with_max_idle_capacity(config.max_idle_buffer),
            stack: Vec::new(),
            pending_bulk: None,
            config,
            failure: None,
        }
    }

    /// Appends bytes received from the server.
    ///
    /// Input fed after a protocol error is dropped, since the stream can no
    /// longer be parsed.
    pub fn feed(&mut self, data: &[u8]) {
        if self.failure.is_some() {
            trace!(bytes = data.len(), "Dropping input fed to a failed reader");
            return;
        }
        self.buffer.append(data);
        trace!(
            bytes = data.len(),
            buffered = self.buffer.len(),
            "Fed reply data"
        );
    }

    /// Attempts to extract the next complete reply.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(value))` - A complete reply
    /// - `Ok(None)` - Incomplete data, feed more bytes and call again
    /// - `Err(e)` - Protocol error; the same error is returned by every
    ///   later call
    pub fn get_next_reply(&mut self) -> ParseResult<Option<RespValue>> {
        if let Some(e) = &self.failure {
            return Err(e.clone());
        }

        match self.advance() {
            Ok(reply) => Ok(reply),
            Err(e) => {
                warn!(
                    error = %e,
                    depth = self.stack.len(),
                    buffered = self.buffer.len(),
                    "Protocol error in reply stream"
                );
                self.failure = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Changes how bulk strings completed from now on are decoded.
    ///
    /// A bulk string whose payload is still arriving is decoded with the
    /// policy in force when it completes.
    pub fn set_encoding_policy(&mut self, policy: EncodingPolicy) {
        self.config.encoding = policy;
    }

    pub fn encoding_policy(&self) -> EncodingPolicy {
        self.config.encoding
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Number of received bytes not yet consumed by the parser.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if a reply has been started but not finished, or if
    /// unparsed bytes are buffered.
    pub fn is_mid_reply(&self) -> bool {
        !self.stack.is_empty() || self.pending_bulk.is_some() || !self.buffer.is_empty()
    }

    /// Returns the protocol error this reader failed with, if any.
    pub fn failure(&self) -> Option<&ParseError> {
        self.failure.as_ref()
    }

    /// Parses units until a top-level reply completes or data runs out.
    fn advance(&mut self) -> ParseResult<Option<RespValue>> {
        loop {
            let value = match self.parse_unit()? {
                Step::Incomplete => {
                    trace!(
                        depth = self.stack.len(),
                        buffered = self.buffer.len(),
                        "Incomplete reply, need more data"
                    );
                    return Ok(None);
                }
                Step::Descend => continue,
                Step::Value(value) => value,
            };

            if let Some(reply) = self.resolve(value) {
                trace!(buffered = self.buffer.len(), "Parsed reply");
                return Ok(Some(reply));
            }
        }
    }

    /// Parses one header line, or one bulk payload, at the cursor.
    fn parse_unit(&mut self) -> ParseResult<Step> {
        if let Some(len) = self.pending_bulk {
            return self.read_bulk_payload(len);
        }

        let (header, line_len) = match self.buffer.peek_line() {
            Some(line) => (Header::parse(line)?, line.len()),
            None => return Ok(Step::Incomplete),
        };
        self.buffer.consume(line_len + CRLF.len());

        match header {
            Header::Status(s) => Ok(Step::Value(RespValue::Status(s))),
            Header::Error(message) => Ok(Step::Value(RespValue::Error(message))),
            Header::Integer(n) => Ok(Step::Value(RespValue::Integer(n))),
            Header::BulkLen(-1) => Ok(Step::Value(RespValue::Nil)),
            Header::BulkLen(len) => {
                let len = usize::try_from(len).map_err(|_| ParseError::InvalidBulkLength(len))?;
                if len > self.config.max_bulk_len {
                    return Err(ParseError::MessageTooLarge {
                        size: len,
                        max: self.config.max_bulk_len,
                    });
                }
                self.pending_bulk = Some(len);
                self.read_bulk_payload(len)
            }
            Header::ArrayLen(-1) => Ok(Step::Value(RespValue::Nil)),
            Header::ArrayLen(0) => Ok(Step::Value(RespValue::Array(Vec::new()))),
            Header::ArrayLen(count) => {
                let count =
                    usize::try_from(count).map_err(|_| ParseError::InvalidArrayLength(count))?;
                if count > self.config.max_elements {
                    return Err(ParseError::TooManyElements {
                        count,
                        max: self.config.max_elements,
                    });
                }
                if self.stack.len() >= self.config.max_depth {
                    return Err(ParseError::NestingTooDeep(self.config.max_depth));
                }
                self.stack.push(Frame::new(count));
                Ok(Step::Descend)
            }
        }
    }

    /// Reads a bulk payload of `len` bytes plus its trailing CRLF.
    fn read_bulk_payload(&mut self, len: usize) -> ParseResult<Step> {
        if !self.buffer.remaining(len + CRLF.len()) {
            return Ok(Step::Incomplete);
        }

        let payload = self.buffer.take(len);
        if !self.buffer.starts_with(CRLF) {
            return Err(ParseError::ProtocolError(
                "bulk string missing trailing CRLF".to_string(),
            ));
        }
        self.buffer.consume(CRLF.len());
        self.pending_bulk = None;

        Ok(Step::Value(RespValue::Bulk(self.config.encoding.apply(payload))))
    }

    /// Hands a completed value to the innermost open array, closing every
    /// array it completes. Returns the value once nothing is left to close.
    fn resolve(&mut self, mut value: RespValue) -> Option<RespValue> {
        loop {
            let frame = match self.stack.last_mut() {
                Some(frame) => frame,
                None => return Some(value),
            };

            match frame.push(value) {
                None => return None,
                Some(elements) => {
                    self.stack.pop();
                    value = RespValue::Array(elements);
                }
            }
        }
    }
}

/// Parses a strict decimal integer: an optional `-`, then at least one digit.
fn parse_decimal(digits: &[u8]) -> ParseResult<i64> {
    let invalid = || ParseError::InvalidInteger(String::from_utf8_lossy(digits).into_owned());

    let (negative, body) = match digits.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, digits),
    };
    if body.is_empty() {
        return Err(invalid());
    }

    // Accumulate towards the sign so i64::MIN does not overflow
    let mut n: i64 = 0;
    for &b in body {
        if !b.is_ascii_digit() {
            return Err(invalid());
        }
        let digit = i64::from(b - b'0');
        n = n
            .checked_mul(10)
            .and_then(|n| {
                if negative {
                    n.checked_sub(digit)
                } else {
                    n.checked_add(digit)
                }
            })
            .ok_or_else(invalid)?;
    }
    Ok(n)
}

/// Helper function to parse a single reply from a complete buffer.
///
/// Returns `Ok(None)` if the buffer does not hold a whole reply.
pub fn parse_reply(buf: &[u8]) -> ParseResult<Option<RespValue>> {
    let mut reader = ReplyReader::new();
    reader.feed(buf);
    reader.get_next_reply()
}
