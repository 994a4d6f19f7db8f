//! Chat completions endpoint handler.

use super::headers::{insert_backend_header, require_admin};
use crate::admission::apply_force_directive;
use crate::api::{ApiError, AppState, ChatCompletionRequest};
use crate::logging::generate_request_id;
use crate::routing::RoutingRequest;
use crate::streaming::{StreamEvent, StreamMode};
use axum::{
    extract::State,
    http::HeaderMap,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// POST /v1/chat/completions
pub async fn handle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(mut request): Json<ChatCompletionRequest>,
) -> Result<Response, ApiError> {
    let request_id = generate_request_id();

    if request.messages.is_empty() {
        return Err(ApiError::bad_request("messages must not be empty"));
    }

    if apply_force_directive(&mut request) {
        request.force_big = true;
    }
    if request.force_big && state.config.admission.require_admin_for_force {
        require_admin(&state.config.server, &headers)?;
    }

    let routing = RoutingRequest::from_chat(&request, state.router.aliases());
    let lease = state.router.route(&routing).map_err(|e| {
        ApiError::from_routing(
            &e,
            &state.registry.model_ids(),
            state.config.routing.retry_after_seconds,
        )
    })?;

    let backend = Arc::clone(lease.backend());
    let agent = state.registry.get_agent(&backend.id).ok_or_else(|| {
        ApiError::internal(&format!("No agent registered for backend '{}'", backend.id))
    })?;
    request.model = routing.alias.upstream_model(&backend, &request.model);

    info!(
        request_id = %request_id,
        backend_id = %backend.id,
        model = %request.model,
        alias = %routing.alias,
        estimated_tokens = routing.estimated_tokens,
        stream = request.stream,
        "Chat completion routed"
    );

    if request.stream {
        let mode = StreamMode::from_flag(request.enhanced_status);
        let events = state
            .streaming
            .open(lease, agent, request, mode)
            .map(|event: StreamEvent| Event::default().json_data(event));

        let mut response = Sse::new(events)
            .keep_alive(KeepAlive::default())
            .into_response();
        insert_backend_header(response.headers_mut(), &backend.id);
        return Ok(response);
    }

    let started = Instant::now();
    let result = agent.chat_completion(request).await;
    lease.release();
    metrics::histogram!("switchyard_request_duration_seconds", "backend" => backend.id.clone())
        .record(started.elapsed().as_secs_f64());

    match result {
        Ok(completion) => {
            let mut response = Json(completion).into_response();
            insert_backend_header(response.headers_mut(), &backend.id);
            Ok(response)
        }
        Err(e) => {
            warn!(request_id = %request_id, backend_id = %backend.id, error = %e, "Backend request failed");
            Err(ApiError::from(e))
        }
    }
}
