//! Mapping of domain errors onto OpenAI-style API errors.

use super::types::ApiError;
use crate::admission::AdmissionError;
use crate::agent::AgentError;
use crate::jobs::JobError;
use crate::routing::RoutingError;

impl ApiError {
    /// Routing failure → 404 / 503 (with `Retry-After`) / 403.
    pub fn from_routing(err: &RoutingError, available: &[String], retry_after: u64) -> Self {
        match err {
            RoutingError::ModelNotFound { model } => ApiError::model_not_found(model, available),
            RoutingError::NoBackendAvailable { .. } => {
                ApiError::service_unavailable(&err.to_string()).with_retry_after(retry_after)
            }
            RoutingError::AdmissionDenied { alias, denied } => {
                ApiError::admission_denied(alias, denied)
            }
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        match &err {
            AgentError::Timeout(_) => ApiError::gateway_timeout(),
            AgentError::Configuration(_) => ApiError::internal(&err.to_string()),
            AgentError::Network(_)
            | AgentError::Upstream { .. }
            | AgentError::InvalidResponse(_) => ApiError::bad_gateway(&err.to_string()),
        }
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match &err {
            JobError::NotFound(_) => ApiError::not_found(&err.to_string()),
            JobError::InvalidRequest(_) => ApiError::bad_request(&err.to_string()),
            JobError::ShutDown => ApiError::service_unavailable(&err.to_string()),
        }
    }
}

impl From<AdmissionError> for ApiError {
    fn from(err: AdmissionError) -> Self {
        ApiError::bad_request(&err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_routing_errors_map_to_status() {
        let not_found = ApiError::from_routing(
            &RoutingError::ModelNotFound {
                model: "gpt-9".into(),
            },
            &["llama3".to_string()],
            2,
        );
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);
        assert!(not_found.error.message.contains("llama3"));

        let busy = ApiError::from_routing(
            &RoutingError::NoBackendAvailable {
                alias: "auto".into(),
                tried: vec![],
            },
            &[],
            7,
        );
        assert_eq!(busy.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(busy.retry_after, Some(7));

        let denied = ApiError::from_routing(
            &RoutingError::AdmissionDenied {
                alias: "big".into(),
                denied: vec!["gpu-big".into()],
            },
            &[],
            2,
        );
        assert_eq!(denied.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(denied.error.code.as_deref(), Some("admission_denied"));
        assert_eq!(denied.error.param.as_deref(), Some("force_big"));
    }

    #[test]
    fn test_agent_errors_map_to_gateway_statuses() {
        assert_eq!(
            ApiError::from(AgentError::Timeout(100)).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::from(AgentError::Upstream {
                status: 500,
                message: "boom".into()
            })
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_job_errors() {
        assert_eq!(
            ApiError::from(JobError::NotFound("j".into())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(JobError::InvalidRequest("x".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
