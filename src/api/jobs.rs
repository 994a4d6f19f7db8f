//! Job endpoint handlers.

use super::headers::{agent_id, is_admin};
use crate::api::{ApiError, AppState};
use crate::jobs::{CreateJobRequest, Job, JobDetail, JobFilter, JobStatus};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct SubmitJobResponse {
    pub job_id: String,
    pub status: JobStatus,
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<Job>,
}

/// POST /v1/jobs
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<SubmitJobResponse>), ApiError> {
    let job = state.jobs.submit(body)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitJobResponse {
            job_id: job.job_id,
            status: job.status,
        }),
    ))
}

/// GET /v1/jobs/{job_id}
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobDetail>, ApiError> {
    Ok(Json(state.jobs.get(&job_id)?))
}

/// GET /v1/jobs?agent_id=&status=
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<JobFilter>,
) -> Json<JobListResponse> {
    Json(JobListResponse {
        jobs: state.jobs.list(&filter),
    })
}

/// POST /v1/jobs/{job_id}/cancel
///
/// Allowed for the submitting agent (`x-agent-id`) or an admin.
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Job>, ApiError> {
    let job = state.jobs.job(&job_id)?;

    let owner = agent_id(&headers) == Some(job.agent_id.as_str());
    if !owner && !is_admin(&state.config.server, &headers) {
        return Err(ApiError::forbidden(
            "Only the submitting agent or an admin may cancel this job",
        ));
    }

    Ok(Json(state.jobs.cancel(&job_id)?))
}
