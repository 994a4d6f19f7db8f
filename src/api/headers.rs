//! Request and response headers used by the API.

use super::types::ApiError;
use crate::config::ServerConfig;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

/// Backend that served a completion.
pub const BACKEND_HEADER: &str = "x-switchyard-backend";

/// Caller identity for job ownership checks.
pub const AGENT_ID_HEADER: &str = "x-agent-id";

/// Set `x-switchyard-backend` on a response.
pub fn insert_backend_header(headers: &mut HeaderMap, backend_id: &str) {
    if let Ok(value) = HeaderValue::from_str(backend_id) {
        headers.insert(HeaderName::from_static(BACKEND_HEADER), value);
    }
}

/// Token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Value of `x-agent-id`, if present and non-empty.
pub fn agent_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AGENT_ID_HEADER)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Whether the request carries admin rights.
///
/// With no `admin_token` configured every caller is an admin.
pub fn is_admin(config: &ServerConfig, headers: &HeaderMap) -> bool {
    match &config.admin_token {
        None => true,
        Some(expected) => bearer_token(headers) == Some(expected.as_str()),
    }
}

/// 401 without credentials, 403 with the wrong ones.
pub fn require_admin(config: &ServerConfig, headers: &HeaderMap) -> Result<(), ApiError> {
    if is_admin(config, headers) {
        return Ok(());
    }
    if bearer_token(headers).is_none() {
        Err(ApiError::unauthorized("Admin token required"))
    } else {
        Err(ApiError::forbidden("Invalid admin token"))
    }
}
