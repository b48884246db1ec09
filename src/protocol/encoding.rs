//! Bulk String Encoding Policy
//!
//! Bulk strings are binary-safe, so the wire carries no hint about how their
//! payload should be interpreted. The reader applies an [`EncodingPolicy`]
//! chosen by the caller:
//!
//! - `Text(charset)` decodes each payload with the given [`Charset`]. Payloads
//!   the charset rejects are still returned, flagged as
//!   [`BulkString::Invalid`](crate::protocol::types::BulkString::Invalid).
//! - `Raw` hands the bytes back untouched.
//!
//! The policy lives on the reader instance, never in process-wide state, so
//! two readers in the same process can decode differently.

use crate::protocol::types::BulkString;
use bytes::Bytes;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Character sets a bulk payload can be decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Charset {
    /// UTF-8. Invalid sequences make the payload undecodable.
    #[default]
    Utf8,

    /// ISO-8859-1. Every byte maps to the code point of the same value,
    /// so decoding never fails.
    Latin1,

    /// 7-bit US-ASCII. Any byte above `0x7f` makes the payload undecodable.
    Ascii,
}

impl Charset {
    /// Canonical name, as accepted by [`Charset::from_str`].
    pub fn name(&self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Latin1 => "ISO-8859-1",
            Charset::Ascii => "US-ASCII",
        }
    }

    /// Decodes `bytes`, returning `None` if they are not valid in this charset.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Charset::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_owned),
            Charset::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
            Charset::Ascii => {
                if bytes.is_ascii() {
                    // ASCII is a subset of UTF-8
                    std::str::from_utf8(bytes).ok().map(str::to_owned)
                } else {
                    None
                }
            }
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a charset name is not recognised.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown charset: {0}")]
pub struct CharsetError(pub String);

impl FromStr for Charset {
    type Err = CharsetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Charset::Utf8),
            "iso-8859-1" | "latin1" | "latin-1" => Ok(Charset::Latin1),
            "us-ascii" | "ascii" => Ok(Charset::Ascii),
            _ => Err(CharsetError(s.to_string())),
        }
    }
}

/// How bulk string payloads are handed to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingPolicy {
    /// Decode payloads as text in the given charset.
    Text(Charset),

    /// Return payloads as undecoded bytes.
    Raw,
}

impl Default for EncodingPolicy {
    fn default() -> Self {
        EncodingPolicy::Text(Charset::default())
    }
}

impl EncodingPolicy {
    /// Applies the policy to a completed bulk payload.
    pub fn apply(&self, payload: Bytes) -> BulkString {
        match self {
            EncodingPolicy::Raw => BulkString::Raw(payload),
            EncodingPolicy::Text(charset) => match charset.decode(&payload) {
                Some(text) => BulkString::Text(text),
                None => BulkString::Invalid {
                    bytes: payload,
                    charset: *charset,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_decode() {
        let bulk = EncodingPolicy::Text(Charset::Utf8).apply(Bytes::from("שלום"));
        assert_eq!(bulk, BulkString::Text("שלום".to_string()));
    }

    #[test]
    fn test_utf8_invalid_keeps_bytes() {
        let payload = Bytes::from_static(b"\xffok");
        let bulk = EncodingPolicy::Text(Charset::Utf8).apply(payload.clone());
        assert_eq!(
            bulk,
            BulkString::Invalid {
                bytes: payload,
                charset: Charset::Utf8,
            }
        );
        assert!(!bulk.is_valid());
    }

    #[test]
    fn test_latin1_never_fails() {
        let bulk = EncodingPolicy::Text(Charset::Latin1).apply(Bytes::from_static(b"caf\xe9"));
        assert_eq!(bulk, BulkString::Text("café".to_string()));
    }

    #[test]
    fn test_ascii_rejects_high_bytes() {
        let policy = EncodingPolicy::Text(Charset::Ascii);
        assert_eq!(
            policy.apply(Bytes::from("plain")),
            BulkString::Text("plain".to_string())
        );
        assert!(!policy.apply(Bytes::from("é")).is_valid());
    }

    #[test]
    fn test_raw_policy() {
        let bulk = EncodingPolicy::Raw.apply(Bytes::from_static(b"\x00\xff"));
        assert_eq!(bulk, BulkString::Raw(Bytes::from_static(b"\x00\xff")));
    }

    #[test]
    fn test_charset_names() {
        assert_eq!("utf8".parse::<Charset>(), Ok(Charset::Utf8));
        assert_eq!("ISO-8859-1".parse::<Charset>(), Ok(Charset::Latin1));
        assert_eq!("ascii".parse::<Charset>(), Ok(Charset::Ascii));
        assert_eq!(
            "ebcdic".parse::<Charset>(),
            Err(CharsetError("ebcdic".to_string()))
        );
        assert_eq!(Charset::Latin1.to_string(), "ISO-8859-1");
    }
}
