//! Streaming SSE tests for the chat completions endpoint.

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;
use switchyard::api::headers::BACKEND_HEADER;
use switchyard::registry::{BackendClass, BackendKind};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn stream_body(model: &str, enhanced: bool) -> serde_json::Value {
    json!({
        "model": model,
        "stream": true,
        "enhanced_status": enhanced,
        "messages": [{"role": "user", "content": "tell me a story"}]
    })
}

async fn app_for(server: &MockServer) -> TestApp {
    TestApp::new(config_with(vec![backend_config(
        "gpu-small",
        &server.uri(),
        BackendKind::LocalAccelerator,
        BackendClass::Fast,
        10,
        "llama3",
    )]))
}

#[tokio::test]
async fn test_pass_through_stream_deltas_then_done() {
    let server = mock_streaming_backend(&["Once", " upon", " a time"]).await;
    let mut app = app_for(&server).await;

    let response = app
        .post_json("/v1/chat/completions", &stream_body("llama3", false))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[BACKEND_HEADER], "gpu-small");
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let events = sse_events(&body_string(response).await);
    let statuses: Vec<&str> = events.iter().map(|e| e["status"].as_str().unwrap()).collect();
    assert_eq!(statuses, vec!["streaming", "streaming", "streaming", "done"]);

    let done = events.last().unwrap();
    assert_eq!(done["content"], "Once upon a time");
    assert_eq!(done["model"], "llama3");
    assert!(done["usage"]["completion_tokens"].as_u64().unwrap() > 0);

    assert_eq!(app.state.registry.get_backend("gpu-small").unwrap().in_flight(), 0);
}

#[tokio::test]
async fn test_enhanced_stream_reports_routing_and_generating() {
    let server = mock_streaming_backend(&["Hi"]).await;
    let mut app = app_for(&server).await;

    let response = app
        .post_json("/v1/chat/completions", &stream_body("auto", true))
        .await;
    let events = sse_events(&body_string(response).await);
    let statuses: Vec<&str> = events.iter().map(|e| e["status"].as_str().unwrap()).collect();

    assert_eq!(statuses, vec!["routing", "generating", "streaming", "done"]);
    assert_eq!(events[0]["provider_name"], "gpu-small");
    assert_eq!(events[0]["model"], "llama3");
}

#[tokio::test]
async fn test_upstream_error_ends_with_single_error_event() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;
    let mut app = app_for(&server).await;

    let response = app
        .post_json("/v1/chat/completions", &stream_body("llama3", false))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let events = sse_events(&body_string(response).await);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["status"], "error");
    assert_eq!(app.state.registry.get_backend("gpu-small").unwrap().in_flight(), 0);
}

#[tokio::test]
async fn test_stream_routing_failure_is_plain_http_error() {
    let server = mock_streaming_backend(&["unused"]).await;
    let mut app = app_for(&server).await;

    let response = app
        .post_json("/v1/chat/completions", &stream_body("no-such-model", false))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
