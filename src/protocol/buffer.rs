//! Read Buffer
//!
//! Bytes arrive from the network in whatever chunks the kernel hands over.
//! [`ReadBuffer`] accumulates them and keeps a read cursor, so the reader can
//! look at and consume data without shifting the whole buffer on every call.
//!
//! ```text
//!  consumed (logically gone)   unconsumed
//! ┌──────────────────────────┬───────────────────────────┐
//! │ *2\r\n$5\r\nhello\r\n    │ $5\r\nwor                 │
//! └──────────────────────────┴───────────────────────────┘
//!                            ▲
//!                           pos
//! ```
//!
//! Compaction only happens at the start of [`ReadBuffer::append`], so a
//! line returned by [`ReadBuffer::peek_line`] stays valid until the next
//! append.

use crate::protocol::types::CRLF;
use bytes::{Bytes, BytesMut};
use memchr::memchr;
use tracing::trace;

/// Initial buffer capacity
pub const INITIAL_BUFFER_SIZE: usize = 4096;

/// Consumed prefix length at which the buffer is compacted
pub const COMPACT_THRESHOLD: usize = 1024;

/// Capacity above which an empty buffer gives its allocation back (16 KB)
pub const DEFAULT_MAX_IDLE_CAPACITY: usize = 16 * 1024;

/// Growable byte buffer with a read cursor.
#[derive(Debug)]
pub struct ReadBuffer {
    /// Buffered bytes; everything before `pos` has been consumed
    buf: BytesMut,

    /// Read cursor
    pos: usize,

    /// Largest capacity kept around once the buffer drains
    max_idle_capacity: usize,
}

impl Default for ReadBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadBuffer {
    pub fn new() -> Self {
        Self::with_max_idle_capacity(DEFAULT_MAX_IDLE_CAPACITY)
    }

    /// Creates a buffer that releases its allocation when it drains while
    /// holding more than `max_idle_capacity` bytes of capacity.
    /// Zero disables the release.
    pub fn with_max_idle_capacity(max_idle_capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            pos: 0,
            max_idle_capacity,
        }
    }

    /// Appends newly-arrived bytes. Empty input is a no-op.
    pub fn append(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.compact();
        self.buf.extend_from_slice(data);
    }

    /// Returns the bytes between the cursor and the next CRLF, without the
    /// terminator, or `None` if no complete line is buffered yet.
    pub fn peek_line(&self) -> Option<&[u8]> {
        let unread = self.unread();
        find_crlf(unread).map(|end| &unread[..end])
    }

    /// Advances the cursor by exactly `n` bytes.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `n` unconsumed bytes are buffered.
    pub fn consume(&mut self, n: usize) {
        assert!(
            self.remaining(n),
            "consume({}) with only {} bytes buffered",
            n,
            self.len()
        );
        self.pos += n;
    }

    /// Copies out the next `n` bytes and consumes them.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `n` unconsumed bytes are buffered.
    pub fn take(&mut self, n: usize) -> Bytes {
        assert!(
            self.remaining(n),
            "take({}) with only {} bytes buffered",
            n,
            self.len()
        );
        let data = Bytes::copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        data
    }

    /// Returns true if at least `n` unconsumed bytes are available.
    pub fn remaining(&self, n: usize) -> bool {
        self.len() >= n
    }

    /// Returns true if the unconsumed bytes start with `prefix`.
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.unread().starts_with(prefix)
    }

    /// The unconsumed bytes.
    pub fn unread(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    /// Number of unconsumed bytes.
    pub fn len(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn compact(&mut self) {
        if self.pos == 0 {
            return;
        }

        if self.pos == self.buf.len() {
            self.buf.clear();
            self.pos = 0;
            if self.max_idle_capacity > 0 && self.buf.capacity() > self.max_idle_capacity {
                trace!(
                    capacity = self.buf.capacity(),
                    "Releasing idle read buffer"
                );
                self.buf = BytesMut::with_capacity(INITIAL_BUFFER_SIZE);
            }
        } else if self.pos >= COMPACT_THRESHOLD {
            trace!(
                discarded = self.pos,
                kept = self.len(),
                "Compacting read buffer"
            );
            let _ = self.buf.split_to(self.pos);
            self.pos = 0;
        }
    }
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    let mut offset = 0;
    while let Some(pos) = memchr(CRLF[0], &buf[offset..]) {
        let at = offset + pos;
        match buf.get(at + 1) {
            Some(&b) if b == CRLF[1] => return Some(at),
            Some(_) => offset = at + 1,
            None => return None,
        }
    }
    None
}
