//! Ollama agent implementation.
//!
//! - Health checking via GET /api/tags
//! - Warm-model detection via GET /api/ps
//! - Chat completion via POST /v1/chat/completions (OpenAI-compatible)

use super::{
    openai::OpenAICompatAgent, AgentError, AgentProfile, HealthStatus, InferenceAgent, StreamChunk,
};
use crate::api::types::{ChatCompletionRequest, ChatCompletionResponse};
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Agent for Ollama servers.
///
/// Chat goes through Ollama's OpenAI-compatible surface, so completion calls
/// delegate to an [`OpenAICompatAgent`]; only probing is Ollama-native.
pub struct OllamaAgent {
    inner: OpenAICompatAgent,
}

impl OllamaAgent {
    pub fn new(id: String, name: String, base_url: String, client: Arc<Client>) -> Self {
        Self {
            inner: OpenAICompatAgent::new(id, name, base_url, client).with_probe_path("/api/tags"),
        }
    }

    pub fn with_timeouts(mut self, probe: Duration, request: Duration) -> Self {
        self.inner = self.inner.with_timeouts(probe, request);
        self
    }
}

/// Ollama /api/tags and /api/ps share this shape
#[derive(Deserialize)]
struct OllamaModelsResponse {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
    #[serde(default)]
    model: Option<String>,
}

impl OllamaModel {
    fn matches(&self, wanted: &str) -> bool {
        let base = |s: &str| s.strip_suffix(":latest").unwrap_or(s).to_string();
        let wanted = base(wanted);
        base(&self.name) == wanted || self.model.as_deref().map(base) == Some(wanted)
    }
}

impl OllamaAgent {
    async fn get_models(&self, path: &str) -> Result<Option<OllamaModelsResponse>, AgentError> {
        let url = format!("{}{}", self.inner.base_url(), path);
        let timeout = self.inner.probe_timeout();

        let response = self
            .inner
            .client()
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| AgentError::from_reqwest(e, timeout.as_millis() as u64))?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let body = response.text().await.map_err(|e| {
            AgentError::InvalidResponse(format!("Failed to read response body: {}", e))
        })?;

        serde_json::from_str(&body).map(Some).map_err(|e| {
            AgentError::InvalidResponse(format!("Failed to parse Ollama {} response: {}", path, e))
        })
    }
}

#[async_trait]
impl InferenceAgent for OllamaAgent {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn profile(&self) -> AgentProfile {
        AgentProfile {
            backend_type: "ollama".to_string(),
            version: None,
        }
    }

    async fn health_check(&self) -> Result<HealthStatus, AgentError> {
        match self.get_models("/api/tags").await? {
            Some(tags) => Ok(HealthStatus::Healthy {
                model_count: tags.models.len(),
            }),
            None => Ok(HealthStatus::Unhealthy),
        }
    }

    async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, AgentError> {
        self.inner.chat_completion(request).await
    }

    async fn chat_completion_stream(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<BoxStream<'static, Result<StreamChunk, AgentError>>, AgentError> {
        self.inner.chat_completion_stream(request).await
    }

    async fn is_model_loaded(&self, model: &str) -> Option<bool> {
        match self.get_models("/api/ps").await {
            Ok(Some(ps)) => Some(ps.models.iter().any(|m| m.matches(model))),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(backend_id = %self.id(), error = %e, "Ollama /api/ps unavailable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::ChatMessage;
    use mockito::Server;

    fn test_agent(base_url: String) -> OllamaAgent {
        OllamaAgent::new(
            "test-ollama".to_string(),
            "Test Ollama".to_string(),
            base_url,
            Arc::new(Client::new()),
        )
    }

    #[tokio::test]
    async fn test_health_check_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(r#"{"models":[{"name":"llama3:8b"},{"name":"qwen2:7b"}]}"#)
            .create_async()
            .await;

        let agent = test_agent(server.url());
        let status = agent.health_check().await.unwrap();

        mock.assert_async().await;
        assert_eq!(status, HealthStatus::Healthy { model_count: 2 });
    }

    #[tokio::test]
    async fn test_health_check_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/tags")
            .with_status(500)
            .create_async()
            .await;

        let agent = test_agent(server.url());
        assert_eq!(agent.health_check().await.unwrap(), HealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_health_check_invalid_json() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let agent = test_agent(server.url());
        let result = agent.health_check().await;
        assert!(matches!(result, Err(AgentError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_is_model_loaded() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/ps")
            .with_status(200)
            .with_body(r#"{"models":[{"name":"llama3:latest","model":"llama3:latest"}]}"#)
            .expect(2)
            .create_async()
            .await;

        let agent = test_agent(server.url());
        assert_eq!(agent.is_model_loaded("llama3").await, Some(true));
        assert_eq!(agent.is_model_loaded("qwen2:7b").await, Some(false));
    }

    #[tokio::test]
    async fn test_is_model_loaded_unknown_when_endpoint_missing() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/ps")
            .with_status(404)
            .create_async()
            .await;

        let agent = test_agent(server.url());
        assert_eq!(agent.is_model_loaded("llama3").await, None);
    }

    #[tokio::test]
    async fn test_chat_completion_uses_openai_surface() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"id":"o1","object":"chat.completion","created":1,"model":"llama3:8b","choices":[{"index":0,"message":{"role":"assistant","content":"hello"},"finish_reason":"stop"}]}"#)
            .create_async()
            .await;

        let agent = test_agent(server.url());
        let request = ChatCompletionRequest::new("llama3:8b", vec![ChatMessage::user("hi")]);
        let response = agent.chat_completion(request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.model, "llama3:8b");
        assert_eq!(agent.profile().backend_type, "ollama");
        assert_eq!(agent.id(), "test-ollama");
    }
}
