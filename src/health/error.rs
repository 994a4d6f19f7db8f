//! Error types for health checking.

use crate::agent::AgentError;
use thiserror::Error;

/// Why a single probe failed. Recorded on the backend, never propagated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HealthCheckError {
    #[error("probe timed out after {0}s")]
    Timeout(u64),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("HTTP error: {0}")]
    HttpError(u16),

    /// Backend answered but declared itself unhealthy
    #[error("backend reported unhealthy status")]
    ReportedUnhealthy,

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("no agent registered for backend")]
    NoAgent,
}

impl HealthCheckError {
    /// Map an agent failure onto the probe error vocabulary.
    pub fn from_agent_error(err: AgentError) -> Self {
        match err {
            AgentError::Timeout(ms) => HealthCheckError::Timeout(ms.div_ceil(1000)),
            AgentError::Network(msg) => HealthCheckError::ConnectionFailed(msg),
            AgentError::Upstream { status, .. } => HealthCheckError::HttpError(status),
            AgentError::InvalidResponse(msg) | AgentError::Configuration(msg) => {
                HealthCheckError::InvalidResponse(msg)
            }
        }
    }
}
