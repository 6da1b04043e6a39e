//! Error types for the token codec.

use thiserror::Error;

/// Errors that can occur decoding a debug token.
///
/// Encoding is infallible: every descriptor field has a defined truncation
/// at the codec's size bounds, and snappy block compression cannot fail on
/// in-memory input.
#[derive(Error, Debug)]
pub enum TokenError {
    /// The token is not valid URL-safe base64.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The base64 payload is not a valid snappy block.
    #[error("invalid snappy payload: {0}")]
    Decompress(#[from] snap::Error),

    /// The decompressed record is empty.
    #[error("empty token record")]
    Empty,

    /// The record carries an unsupported version byte.
    #[error("unsupported token version: {found}")]
    Version {
        /// Version byte found in the record.
        found: u8,
    },
}
