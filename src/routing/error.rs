//! Error types for routing failures

use thiserror::Error;

/// Errors that can occur during backend selection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// An explicit model id that no registered backend serves
    #[error("Model '{model}' not found")]
    ModelNotFound { model: String },

    /// Every healthy, admitted candidate was at capacity (or none existed)
    #[error("No backend available for '{alias}' (tried: {tried:?})")]
    NoBackendAvailable { alias: String, tried: Vec<String> },

    /// Healthy candidates existed but admission control fenced them off
    #[error("Backends for '{alias}' are restricted by admission control: {denied:?}")]
    AdmissionDenied { alias: String, denied: Vec<String> },
}

impl RoutingError {
    /// Whether retrying later can succeed without changing the request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RoutingError::NoBackendAvailable { .. } | RoutingError::AdmissionDenied { .. }
        )
    }

    /// Short label used in metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            RoutingError::ModelNotFound { .. } => "model_not_found",
            RoutingError::NoBackendAvailable { .. } => "no_backend_available",
            RoutingError::AdmissionDenied { .. } => "admission_denied",
        }
    }
}
