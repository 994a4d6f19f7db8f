//! Admission control endpoint handlers.

use super::headers::require_admin;
use crate::admission::{AdmissionMode, AdmissionState};
use crate::api::{ApiError, AppState};
use axum::{extract::State, http::HeaderMap, Json};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Body of `PUT /v1/admission`.
#[derive(Debug, Deserialize)]
pub struct SetAdmissionRequest {
    pub mode: AdmissionMode,
    /// Omit to keep the current set
    #[serde(default)]
    pub restricted_backend_ids: Option<BTreeSet<String>>,
}

/// GET /v1/admission
pub async fn get(State(state): State<Arc<AppState>>) -> Json<AdmissionState> {
    Json((*state.admission.snapshot()).clone())
}

/// PUT /v1/admission (admin)
pub async fn put(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SetAdmissionRequest>,
) -> Result<Json<AdmissionState>, ApiError> {
    require_admin(&state.config.server, &headers)?;
    let next = state
        .admission
        .set_mode(body.mode, body.restricted_backend_ids, &state.registry)?;
    Ok(Json((*next).clone()))
}
