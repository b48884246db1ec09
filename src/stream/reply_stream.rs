//! Reply Stream
//!
//! Drives a [`ReplyReader`] from any async byte source: read a chunk, feed
//! it, pull out replies until the reader reports incomplete, read again.
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │ Read chunk  │───>│ Feed reader │───>│ Next reply  │
//! └─────────────┘    └─────────────┘    └──────┬──────┘
//!        ▲                                     │ incomplete
//!        └─────────────────────────────────────┘
//! ```
//!
//! The source is owned by the caller's transport layer; this type only
//! reads from it.

use crate::protocol::{ParseError, ReplyReader, RespValue};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace, warn};

/// Default number of bytes requested per read
pub const DEFAULT_READ_SIZE: usize = 4096;

/// Counters for a reply stream
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamStats {
    /// Read calls that returned data
    pub reads: u64,
    /// Total bytes read from the source
    pub bytes_read: u64,
    /// Complete replies handed to the caller
    pub replies_parsed: u64,
}

/// Errors that end a reply stream.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// I/O error from the source
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The reply stream is malformed
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The source ended partway through a reply
    #[error("Unexpected end of stream")]
    UnexpectedEof,
}

/// Reads replies from an async byte source.
///
/// # Example
///
/// ```
/// use respreader::stream::ReplyStream;
/// use respreader::protocol::RespValue;
///
/// # tokio_test::block_on(async {
/// let source: &[u8] = b"+OK\r\n:1\r\n";
/// let mut stream = ReplyStream::new(source);
///
/// assert_eq!(stream.next_reply().await.unwrap(), Some(RespValue::status("OK")));
/// assert_eq!(stream.next_reply().await.unwrap(), Some(RespValue::integer(1)));
/// assert_eq!(stream.next_reply().await.unwrap(), None);
/// # });
/// ```
#[derive(Debug)]
pub struct ReplyStream<R> {
    /// Where bytes come from
    source: R,

    /// Incremental parser holding any partial reply
    reader: ReplyReader,

    /// Scratch space for a single read
    chunk: Vec<u8>,

    stats: StreamStats,
}

impl<R: AsyncRead + Unpin> ReplyStream<R> {
    /// Creates a stream with a default reader and read size.
    pub fn new(source: R) -> Self {
        Self::with_reader(source, ReplyReader::new(), DEFAULT_READ_SIZE)
    }

    /// Creates a stream around a configured reader, reading at most
    /// `read_size` bytes per call.
    pub fn with_reader(source: R, reader: ReplyReader, read_size: usize) -> Self {
        Self {
            source,
            reader,
            chunk: vec![0; read_size.max(1)],
            stats: StreamStats::default(),
        }
    }

    /// Returns the next complete reply.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(value))` - A complete reply
    /// - `Ok(None)` - The source ended cleanly between replies
    /// - `Err(StreamError::UnexpectedEof)` - The source ended mid-reply
    /// - `Err(e)` - I/O or protocol error
    pub async fn next_reply(&mut self) -> Result<Option<RespValue>, StreamError> {
        loop {
            if let Some(reply) = self.reader.get_next_reply()? {
                self.stats.replies_parsed += 1;
                return Ok(Some(reply));
            }

            if !self.read_more_data().await? {
                if self.reader.is_mid_reply() {
                    warn!(
                        buffered = self.reader.buffered(),
                        "Source ended in the middle of a reply"
                    );
                    return Err(StreamError::UnexpectedEof);
                }
                debug!(replies = self.stats.replies_parsed, "Reply stream finished");
                return Ok(None);
            }
        }
    }

    /// Reads one chunk into the reader. Returns false at end of stream.
    async fn read_more_data(&mut self) -> Result<bool, StreamError> {
        let n = self.source.read(&mut self.chunk).await?;
        if n == 0 {
            return Ok(false);
        }

        self.stats.reads += 1;
        self.stats.bytes_read += n as u64;
        trace!(bytes = n, "Read data");

        self.reader.feed(&self.chunk[..n]);
        Ok(true)
    }

    pub fn reader(&self) -> &ReplyReader {
        &self.reader
    }

    /// Mutable access to the reader, e.g. to change its encoding policy
    /// between replies.
    pub fn reader_mut(&mut self) -> &mut ReplyReader {
        &mut self.reader
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    /// Returns the source, dropping any buffered partial reply.
    pub fn into_inner(self) -> R {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{EncodingPolicy, ReaderConfig};
    use bytes::Bytes;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_reply_split_across_reads() {
        let source = Builder::new()
            .read(b"*2\r\n$5\r\nhel")
            .read(b"lo\r\n$5\r")
            .read(b"\nworld\r\n")
            .build();
        let mut stream = ReplyStream::new(source);

        assert_eq!(
            stream.next_reply().await.unwrap(),
            Some(RespValue::array(vec![
                RespValue::text("hello"),
                RespValue::text("world"),
            ]))
        );
        assert_eq!(stream.next_reply().await.unwrap(), None);

        let stats = stream.stats();
        assert_eq!(stats.reads, 3);
        assert_eq!(stats.bytes_read, 26);
        assert_eq!(stats.replies_parsed, 1);
    }

    #[tokio::test]
    async fn test_several_replies_in_one_read() {
        let source = Builder::new().read(b"+OK\r\n-ERR no\r\n:5\r\n").build();
        let mut stream = ReplyStream::new(source);

        assert_eq!(stream.next_reply().await.unwrap(), Some(RespValue::status("OK")));
        assert_eq!(stream.next_reply().await.unwrap(), Some(RespValue::error("ERR no")));
        assert_eq!(stream.next_reply().await.unwrap(), Some(RespValue::integer(5)));
        assert_eq!(stream.next_reply().await.unwrap(), None);
        assert_eq!(stream.stats().reads, 1);
    }

    #[tokio::test]
    async fn test_one_byte_reads() {
        let source: &[u8] = b"*2\r\n*1\r\n:1\r\n$3\r\nabc\r\n";
        let reader = ReplyReader::new();
        let mut stream = ReplyStream::with_reader(source, reader, 1);

        assert_eq!(
            stream.next_reply().await.unwrap(),
            Some(RespValue::array(vec![
                RespValue::array(vec![RespValue::integer(1)]),
                RespValue::text("abc"),
            ]))
        );
        assert_eq!(stream.stats().reads, source.len() as u64);
    }

    #[tokio::test]
    async fn test_eof_mid_reply() {
        let source = Builder::new().read(b"*2\r\n:1\r\n").build();
        let mut stream = ReplyStream::new(source);

        assert!(matches!(
            stream.next_reply().await,
            Err(StreamError::UnexpectedEof)
        ));
    }

    #[tokio::test]
    async fn test_protocol_error() {
        let source = Builder::new().read(b"$x\r\n").build();
        let mut stream = ReplyStream::new(source);

        assert!(matches!(
            stream.next_reply().await,
            Err(StreamError::Parse(ParseError::InvalidInteger(_)))
        ));
    }

    #[tokio::test]
    async fn test_io_error() {
        let source = Builder::new()
            .read(b"+O")
            .read_error(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            ))
            .build();
        let mut stream = ReplyStream::new(source);

        match stream.next_reply().await {
            Err(StreamError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::ConnectionReset),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_policy_change_between_replies() {
        let source: &[u8] = b"$2\r\nab\r\n$2\r\ncd\r\n";
        let reader = ReplyReader::with_config(ReaderConfig::default());
        let mut stream = ReplyStream::with_reader(source, reader, 64);

        assert_eq!(stream.next_reply().await.unwrap(), Some(RespValue::text("ab")));
        stream.reader_mut().set_encoding_policy(EncodingPolicy::Raw);
        assert_eq!(
            stream.next_reply().await.unwrap(),
            Some(RespValue::raw(Bytes::from_static(b"cd")))
        );
    }
}
