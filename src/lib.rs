//! # respreader - Incremental RESP Reply Parsing
//!
//! respreader turns a stream of bytes from a Redis-compatible server into
//! complete replies. Bytes may arrive in any chunking, down to one byte at a
//! time, and the parser never blocks: when a reply is not finished yet it
//! says so and waits to be fed more.
//!
//! ## Features
//!
//! - **Resumable**: Partially received arrays are kept on an explicit frame
//!   stack, so parsing picks up exactly where it stopped
//! - **Non-blocking**: Parsing never performs I/O; "incomplete" is an
//!   ordinary result, not an error
//! - **Errors as Data**: `-ERR` replies come back as values, even inside arrays
//! - **Explicit Encoding**: Bulk strings are decoded per reader, as text in a
//!   chosen charset or as raw bytes
//! - **Async Adapter**: [`stream::ReplyStream`] drives the parser from any
//!   `tokio` `AsyncRead`
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           respreader                            │
//! │                                                                 │
//! │  ┌─────────────┐    ┌────────────────────────────────────────┐  │
//! │  │ ReplyStream │───>│              ReplyReader               │  │
//! │  │ (AsyncRead) │    │  ┌────────────┐  ┌──────────────────┐  │  │
//! │  └─────────────┘    │  │ ReadBuffer │  │ Frame stack      │  │  │
//! │                     │  │ (cursor)   │  │ + bulk scratch   │  │  │
//! │                     │  └────────────┘  └──────────────────┘  │  │
//! │                     └───────────────────┬────────────────────┘  │
//! │                                         ▼                       │
//! │                                    RespValue                    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use respreader::{ReplyReader, RespValue};
//!
//! let mut reader = ReplyReader::new();
//!
//! reader.feed(b"*2\r\n$5\r\nhello\r\n$5\r\nwor");
//! assert_eq!(reader.get_next_reply().unwrap(), None);
//!
//! reader.feed(b"ld\r\n");
//! assert_eq!(
//!     reader.get_next_reply().unwrap(),
//!     Some(RespValue::array(vec![RespValue::text("hello"), RespValue::text("world")]))
//! );
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: Reply types, read buffer, encoding policy and the parser
//! - [`stream`]: Async adapter that feeds the parser from a byte source

pub mod protocol;
pub mod stream;

// Re-export commonly used types for convenience
pub use protocol::{
    BulkString, Charset, EncodingPolicy, ParseError, ReaderConfig, ReplyReader, RespValue,
};
pub use stream::{ReplyStream, StreamError};

/// Version of respreader
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
