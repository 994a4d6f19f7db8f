//! Backend inventory endpoint handler.

use crate::api::AppState;
use crate::registry::BackendView;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct BackendsResponse {
    pub backends: Vec<BackendView>,
}

/// GET /v1/backends - Health and load for every backend, by priority.
pub async fn handle(State(state): State<Arc<AppState>>) -> Json<BackendsResponse> {
    Json(BackendsResponse {
        backends: state.registry.views(),
    })
}
