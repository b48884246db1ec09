//! RESP Reply Parsing
//!
//! This module reads replies in the Redis Serialization Protocol (RESP) from
//! a byte stream that arrives in arbitrary pieces.
//!
//! ## Overview
//!
//! RESP is a simple, binary-safe protocol. Replies are line-oriented headers,
//! optionally followed by length-prefixed payloads, and arrays may nest.
//! The reader never waits for I/O: it parses whatever has been fed and
//! reports "incomplete" when a reply is still on its way.
//!
//! ## Modules
//!
//! - `types`: Defines the `RespValue` enum and its accessors
//! - `buffer`: Byte accumulator with a read cursor
//! - `encoding`: How bulk string payloads are decoded
//! - `reader`: The resumable reply parser
//!
//! ## Example
//!
//! ```
//! use respreader::protocol::{ReplyReader, RespValue};
//!
//! let mut reader = ReplyReader::new();
//! for byte in b"*2\r\n+OK\r\n:7\r\n" {
//!     reader.feed(&[*byte]);
//! }
//!
//! let reply = reader.get_next_reply().unwrap();
//! assert_eq!(
//!     reply,
//!     Some(RespValue::array(vec![RespValue::status("OK"), RespValue::integer(7)]))
//! );
//! assert_eq!(reader.get_next_reply().unwrap(), None);
//! ```

pub mod buffer;
pub mod encoding;
pub mod reader;
pub mod types;

// Re-export commonly used types for convenience
pub use buffer::ReadBuffer;
pub use encoding::{Charset, CharsetError, EncodingPolicy};
pub use reader::{parse_reply, ParseError, ParseResult, ReaderConfig, ReplyReader};
pub use types::{BulkString, ReplyError, RespValue};
