//! Shared test utilities for Switchyard integration tests.
//!
//! Backends are wiremock servers speaking the OpenAI wire format; the app is
//! driven through `tower::Service::call` on the axum router.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use serde_json::{json, Value};
use std::sync::Arc;
use switchyard::api::{create_router, AppState};
use switchyard::cli::serve::build_registry;
use switchyard::config::{BackendConfig, SwitchyardConfig};
use switchyard::registry::{BackendClass, BackendKind, BackendType};
use tower::Service;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Config Builders
// =============================================================================

/// OpenAI-compatible backend entry with one model.
pub fn backend_config(
    name: &str,
    url: &str,
    kind: BackendKind,
    class: BackendClass,
    priority: i32,
    model: &str,
) -> BackendConfig {
    BackendConfig {
        name: name.to_string(),
        url: url.to_string(),
        backend_type: BackendType::OpenAI,
        kind,
        class,
        priority,
        max_concurrent: 4,
        models: vec![model.to_string()],
        probe_path: None,
        warmup_seconds: None,
        api_key_env: None,
    }
}

/// Config with health probing off and the given backends.
pub fn config_with(backends: Vec<BackendConfig>) -> SwitchyardConfig {
    let mut config = SwitchyardConfig::default();
    config.health_check.enabled = false;
    config.jobs.route_wait_warn_seconds = 0;
    config.jobs.route_retry_delay_ms = 10;
    config.backends = backends;
    config
}

// =============================================================================
// App
// =============================================================================

pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub fn new(config: SwitchyardConfig) -> Self {
        let registry = build_registry(&config).unwrap();
        let state = Arc::new(AppState::new(registry, Arc::new(config)));
        Self {
            router: create_router(Arc::clone(&state)),
            state,
        }
    }

    pub async fn send(&mut self, request: Request<Body>) -> Response<Body> {
        self.router.call(request).await.unwrap()
    }

    pub async fn get(&mut self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&mut self, uri: &str, body: &Value) -> Response<Body> {
        self.send(json_request("POST", uri, body)).await
    }
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

/// JSON payloads of every `data:` line in an SSE body.
pub fn sse_events(body: &str) -> Vec<Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .filter(|data| !data.is_empty())
        .map(|data| serde_json::from_str(data).unwrap())
        .collect()
}

pub fn chat_body(model: &str, prompt: &str) -> Value {
    json!({
        "model": model,
        "messages": [{"role": "user", "content": prompt}]
    })
}

// =============================================================================
// Mock Backends
// =============================================================================

pub fn completion_json(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "upstream",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

pub fn tool_call_json(call_id: &str, tool: &str, args: &str) -> Value {
    json!({
        "id": "chatcmpl-tool",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "upstream",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": call_id,
                    "type": "function",
                    "function": {"name": tool, "arguments": args}
                }]
            },
            "finish_reason": "tool_calls"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

/// SSE body with one chunk per delta and a terminating `[DONE]`.
pub fn sse_stream(deltas: &[&str]) -> String {
    let mut body = String::new();
    for delta in deltas {
        let chunk = json!({
            "id": "chatcmpl-stream",
            "object": "chat.completion.chunk",
            "created": 1_700_000_000,
            "model": "upstream",
            "choices": [{"index": 0, "delta": {"content": delta}}]
        });
        body.push_str(&format!("data: {}\n\n", chunk));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

/// Mock server answering `/v1/chat/completions` with `content`.
pub async fn mock_backend(content: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_json(content)))
        .mount(&server)
        .await;
    server
}

/// Mock server streaming `deltas` from `/v1/chat/completions`.
pub async fn mock_streaming_backend(deltas: &[&str]) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_stream(deltas)),
        )
        .mount(&server)
        .await;
    server
}
