//! Error types for the request engine.
//!
//! Strongly typed by failure class because the retry classifier branches on
//! them: timeouts and resets are worth retrying, an oversized body is not,
//! and the exhausted-target kind is the one error that cancels a scan pool
//! instead of being swallowed.

use std::{io, time::Duration};

use thiserror::Error;

/// Errors that can occur dialing, sending, or reading a response.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Dial did not complete within the dial timeout.
    #[error("dial timeout after {0:?}")]
    DialTimeout(Duration),

    /// Request write did not complete within the write timeout.
    #[error("write timeout after {0:?}")]
    WriteTimeout(Duration),

    /// Response read did not complete within the read timeout.
    #[error("read timeout after {0:?}")]
    ReadTimeout(Duration),

    /// Peer reset the connection.
    #[error("connection reset: {0}")]
    ConnectionReset(String),

    /// Peer closed the connection hard mid-exchange (the Windows-style
    /// "forcibly closed" report; some middleboxes do this on odd requests).
    #[error("connection forcibly closed: {0}")]
    ForciblyClosed(String),

    /// Whole-body read mode and the response exceeds the hard cap.
    #[error("response body exceeds {max} bytes")]
    BodyTooLarge {
        /// Cap that was exceeded.
        max: usize,
    },

    /// Streaming read hit the bounded-read limit before the server finished
    /// its framing; the connection cannot be safely reused.
    #[error("streaming read limit of {limit} bytes reached")]
    ReadLimit {
        /// Limit that was hit.
        limit: usize,
    },

    /// Response did not parse as HTTP/1.x.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// TLS handshake failed.
    #[error("tls handshake failed: {0}")]
    Tls(String),

    /// Upstream proxy refused the CONNECT preamble.
    #[error("proxy refused CONNECT with status {status}")]
    ProxyConnect {
        /// Status the proxy answered with.
        status: u16,
    },

    /// Underlying socket error not covered by a more specific kind.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The consecutive-failure threshold for this target was reached. The
    /// worker pool treats this as a cancellation signal for the scan.
    #[error("target exhausted after {failures} consecutive failures")]
    TargetExhausted {
        /// Failure count at the moment the breaker opened.
        failures: u32,
    },

    /// The scan was cancelled while this request was queued or in flight.
    #[error("scan cancelled")]
    Cancelled,
}

impl ClientError {
    /// Map an I/O error onto the specific kinds the retry classifier
    /// understands, falling back to [`ClientError::Io`].
    #[must_use]
    pub fn from_io(error: io::Error) -> Self {
        let text = error.to_string();
        if text.contains("forcibly closed") {
            return Self::ForciblyClosed(text);
        }
        match error.kind() {
            io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe => {
                Self::ConnectionReset(text)
            },
            io::ErrorKind::TimedOut => Self::ReadTimeout(Duration::ZERO),
            _ => Self::Io(error),
        }
    }

    /// True for the distinguished kind that cancels the (target, module)
    /// pool.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::TargetExhausted { .. })
    }
}
