//! Error types for agent operations.

use thiserror::Error;

/// Errors that can occur during agent operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    /// Network connectivity error (DNS, connection refused, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded deadline.
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// Backend returned an error response (4xx, 5xx).
    #[error("Backend error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Backend response doesn't match expected format.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Agent configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AgentError {
    /// Whether a job may record this error on its step and keep going.
    ///
    /// Malformed bodies and request-level 4xx rejections are recoverable.
    /// Transport failures, timeouts, auth rejections and 5xx are not.
    pub fn is_recoverable(&self) -> bool {
        match self {
            AgentError::InvalidResponse(_) => true,
            AgentError::Upstream { status, .. } => {
                (400..500).contains(status) && !matches!(status, 401 | 403)
            }
            AgentError::Network(_) | AgentError::Timeout(_) | AgentError::Configuration(_) => {
                false
            }
        }
    }

    /// Map a reqwest failure, distinguishing timeouts.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            AgentError::Timeout(timeout_ms)
        } else {
            AgentError::Network(err.to_string())
        }
    }
}
