//! Async Reply Streams
//!
//! This module connects the reply parser to an async byte source such as a
//! socket half owned by the caller's transport layer.
//!
//! ## Features
//!
//! - **Chunked Reads**: Bytes are read in fixed-size chunks and fed as-is
//! - **Pipelining**: Several replies in one read are returned one by one
//! - **Clean EOF Detection**: Distinguishes EOF between replies from EOF mid-reply
//! - **Statistics**: Tracks reads, bytes and replies
//!
//! ## Example
//!
//! ```ignore
//! use respreader::stream::ReplyStream;
//! use tokio::net::TcpStream;
//!
//! let socket = TcpStream::connect("127.0.0.1:6379").await?;
//! let (read_half, _write_half) = socket.into_split();
//! let mut replies = ReplyStream::new(read_half);
//!
//! while let Some(reply) = replies.next_reply().await? {
//!     println!("{}", reply);
//! }
//! ```

pub mod reply_stream;

// Re-export commonly used types
pub use reply_stream::{ReplyStream, StreamError, StreamStats, DEFAULT_READ_SIZE};
