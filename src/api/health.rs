//! Health check endpoint handler.

use crate::api::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub backends: BackendCounts,
    pub models: usize,
}

/// Backend health counts.
#[derive(Debug, Serialize)]
pub struct BackendCounts {
    pub total: usize,
    pub healthy: usize,
    pub unhealthy: usize,
}

/// `healthy` when every backend is up, `degraded` when some are,
/// `unhealthy` when none are (or none are configured).
pub fn overall_status(healthy: usize, total: usize) -> &'static str {
    match (healthy, total) {
        (h, t) if h == t && t > 0 => "healthy",
        (h, _) if h > 0 => "degraded",
        _ => "unhealthy",
    }
}

/// GET /health - Return system health status.
pub async fn handle(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let backends = state.registry.list();
    let healthy = backends.iter().filter(|b| b.is_healthy()).count();

    Json(HealthResponse {
        status: overall_status(healthy, backends.len()).to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        backends: BackendCounts {
            total: backends.len(),
            healthy,
            unhealthy: backends.len() - healthy,
        },
        models: state.registry.model_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_status() {
        assert_eq!(overall_status(2, 2), "healthy");
        assert_eq!(overall_status(1, 2), "degraded");
        assert_eq!(overall_status(0, 2), "unhealthy");
        assert_eq!(overall_status(0, 0), "unhealthy");
    }
}
