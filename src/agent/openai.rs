//! OpenAI-compatible agent implementation.
//!
//! Handles any backend exposing `/v1/chat/completions` (vLLM, llama.cpp,
//! LM Studio, hosted APIs). Liveness is a GET on a configurable probe path,
//! `/v1/models` by default.

use super::{AgentError, AgentProfile, HealthStatus, InferenceAgent, StreamChunk, Utf8ChunkDecoder};
use crate::api::types::{ChatCompletionRequest, ChatCompletionResponse};
use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_PROBE_PATH: &str = "/v1/models";

/// Agent for OpenAI-compatible backends.
pub struct OpenAICompatAgent {
    id: String,
    name: String,
    /// Base URL (e.g., "http://localhost:8000"), no trailing slash
    base_url: String,
    probe_path: String,
    /// Bearer token sent on every request when set
    api_key: Option<String>,
    /// Shared HTTP client for connection pooling
    client: Arc<Client>,
    probe_timeout: Duration,
    request_timeout: Duration,
}

impl OpenAICompatAgent {
    pub fn new(id: String, name: String, base_url: String, client: Arc<Client>) -> Self {
        Self {
            id,
            name,
            base_url: base_url.trim_end_matches('/').to_string(),
            probe_path: DEFAULT_PROBE_PATH.to_string(),
            api_key: None,
            client,
            probe_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(120),
        }
    }

    pub fn with_probe_path(mut self, probe_path: impl Into<String>) -> Self {
        self.probe_path = probe_path.into();
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_timeouts(mut self, probe: Duration, request: Duration) -> Self {
        self.probe_timeout = probe;
        self.request_timeout = request;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    pub(crate) fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    async fn send_chat(&self, request: &ChatCompletionRequest) -> Result<reqwest::Response, AgentError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let timeout_ms = self.request_timeout.as_millis() as u64;

        let response = self
            .authorize(self.client.post(&url))
            .json(request)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| AgentError::from_reqwest(e, timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AgentError::Upstream {
                status: status.as_u16(),
                message: error_body,
            });
        }

        Ok(response)
    }
}

/// OpenAI-compatible /v1/models response format
#[derive(Deserialize)]
struct ModelsResponse {
    data: Vec<serde_json::Value>,
}

#[async_trait]
impl InferenceAgent for OpenAICompatAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn profile(&self) -> AgentProfile {
        AgentProfile {
            backend_type: "openai".to_string(),
            version: None,
        }
    }

    async fn health_check(&self) -> Result<HealthStatus, AgentError> {
        let url = format!("{}{}", self.base_url, self.probe_path);
        let timeout_ms = self.probe_timeout.as_millis() as u64;

        let response = self
            .authorize(self.client.get(&url))
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| AgentError::from_reqwest(e, timeout_ms))?;

        if !response.status().is_success() {
            return Ok(HealthStatus::Unhealthy);
        }

        // Custom probe paths (e.g. /health) need not return a model list.
        let body = response.text().await.unwrap_or_default();
        let model_count = serde_json::from_str::<ModelsResponse>(&body)
            .map(|m| m.data.len())
            .unwrap_or(0);

        Ok(HealthStatus::Healthy { model_count })
    }

    async fn chat_completion(
        &self,
        mut request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, AgentError> {
        request.stream = false;
        let response = self.send_chat(&request).await?;

        response.json().await.map_err(|e| {
            AgentError::InvalidResponse(format!("Failed to parse completion response: {}", e))
        })
    }

    async fn chat_completion_stream(
        &self,
        mut request: ChatCompletionRequest,
    ) -> Result<BoxStream<'static, Result<StreamChunk, AgentError>>, AgentError> {
        request.stream = true;
        let response = self.send_chat(&request).await?;

        // Convert byte stream to raw SSE text chunks
        let mut bytes = Box::pin(response.bytes_stream());
        let stream = async_stream::stream! {
            let mut decoder = Utf8ChunkDecoder::new();
            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => {
                        let data = decoder.decode(&chunk);
                        if !data.is_empty() {
                            yield Ok(StreamChunk { data });
                        }
                    }
                    Err(e) => {
                        yield Err(AgentError::Network(e.to_string()));
                        return;
                    }
                }
            }
            let rest = decoder.finish();
            if !rest.is_empty() {
                yield Ok(StreamChunk { data: rest });
            }
        };

        Ok(Box::pin(stream))
    }
}
