//! Retry classification.
//!
//! Given the error from a send attempt, decide whether another attempt is
//! worth it and under what conditions. Timeouts and resets are transient.
//! A hard "forcibly closed" means some middlebox objected to the connection
//! state, so the retry explicitly closes after the exchange. A streaming
//! read-limit means the server's framing and our bounded reader disagree;
//! one retry with streaming off reads the whole body instead. An oversized
//! body will be oversized again and is never retried.

use crate::errors::ClientError;

/// Outcome of classifying a send error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Give up: the error is deterministic or fatal.
    No,
    /// Plain retry after the retry delay.
    Retry,
    /// Retry with any `Connection` header cleared and `Connection: close`
    /// set explicitly, on a fresh connection.
    RetryWithClose,
    /// Retry with response streaming disabled (whole-body read).
    RetryWithoutStreaming,
}

/// Classify `error` from an initial or intermediate send attempt.
#[must_use]
pub fn classify(error: &ClientError) -> RetryDecision {
    match error {
        ClientError::DialTimeout(_)
        | ClientError::WriteTimeout(_)
        | ClientError::ReadTimeout(_)
        | ClientError::ConnectionReset(_) => RetryDecision::Retry,

        ClientError::ForciblyClosed(_) => RetryDecision::RetryWithClose,

        ClientError::ReadLimit { .. } => RetryDecision::RetryWithoutStreaming,

        ClientError::Io(io_error) => match io_error.kind() {
            std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::UnexpectedEof => RetryDecision::Retry,
            _ => RetryDecision::No,
        },

        ClientError::BodyTooLarge { .. }
        | ClientError::MalformedResponse(_)
        | ClientError::Tls(_)
        | ClientError::ProxyConnect { .. }
        | ClientError::TargetExhausted { .. }
        | ClientError::Cancelled => RetryDecision::No,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn timeouts_retry() {
        assert_eq!(classify(&ClientError::DialTimeout(Duration::from_secs(1))), RetryDecision::Retry);
        assert_eq!(classify(&ClientError::ReadTimeout(Duration::from_secs(1))), RetryDecision::Retry);
        assert_eq!(classify(&ClientError::WriteTimeout(Duration::from_secs(1))), RetryDecision::Retry);
    }

    #[test]
    fn body_too_large_never_retries() {
        assert_eq!(classify(&ClientError::BodyTooLarge { max: 9216 }), RetryDecision::No);
    }

    #[test]
    fn forcibly_closed_retries_with_close() {
        assert_eq!(
            classify(&ClientError::ForciblyClosed("forcibly closed".to_owned())),
            RetryDecision::RetryWithClose
        );
    }

    #[test]
    fn read_limit_retries_without_streaming() {
        assert_eq!(
            classify(&ClientError::ReadLimit { limit: 9216 }),
            RetryDecision::RetryWithoutStreaming
        );
    }

    #[test]
    fn exhausted_and_cancelled_are_final() {
        assert_eq!(classify(&ClientError::TargetExhausted { failures: 15 }), RetryDecision::No);
        assert_eq!(classify(&ClientError::Cancelled), RetryDecision::No);
    }
}
