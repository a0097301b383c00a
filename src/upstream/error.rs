//! Errors raised while talking to an inference server.

use thiserror::Error;

/// Errors that can occur during upstream operations.
///
/// `Network`, `Upstream` and `InvalidResponse` are all transport failures from
/// the caller's point of view; `Timeout` is kept apart so it stays recognizable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpstreamError {
    /// DNS failure, connection refused, reset mid-body.
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded its deadline.
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// Server answered with a non-2xx status.
    #[error("HTTP error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Body did not match the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Operation not offered by this server implementation.
    #[error("Method '{0}' not supported by this server")]
    Unsupported(&'static str),
}

impl UpstreamError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, UpstreamError::Timeout(_))
    }

    /// Classify a reqwest failure, tagging timeouts with the deadline in force.
    pub(crate) fn from_reqwest(e: reqwest::Error, timeout_ms: u64) -> Self {
        if e.is_timeout() {
            UpstreamError::Timeout(timeout_ms)
        } else {
            UpstreamError::Network(e.to_string())
        }
    }
}
