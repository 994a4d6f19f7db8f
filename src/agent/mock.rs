//! Scriptable in-process agent for unit tests.

use super::{AgentError, AgentProfile, HealthStatus, InferenceAgent, StreamChunk};
use crate::api::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Choice, FunctionCall, ToolCall,
    Usage,
};
use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Pops scripted answers in order; the last one repeats.
#[derive(Default)]
pub struct MockAgent {
    id: String,
    health: Mutex<VecDeque<Result<HealthStatus, AgentError>>>,
    health_delay: Option<Duration>,
    completions: Mutex<VecDeque<Result<ChatCompletionResponse, AgentError>>>,
    completion_delay: Option<Duration>,
    stream_chunks: Vec<Result<String, AgentError>>,
    stream_hangs: bool,
    loaded: Option<bool>,
    pub requests: Mutex<Vec<ChatCompletionRequest>>,
}

fn next<T: Clone>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
    let mut queue = queue.lock().unwrap();
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

impl MockAgent {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }

    pub fn with_health(self, answers: Vec<Result<HealthStatus, AgentError>>) -> Self {
        *self.health.lock().unwrap() = answers.into();
        self
    }

    pub fn with_health_delay(mut self, delay: Duration) -> Self {
        self.health_delay = Some(delay);
        self
    }

    pub fn with_completions(self, answers: Vec<Result<ChatCompletionResponse, AgentError>>) -> Self {
        *self.completions.lock().unwrap() = answers.into();
        self
    }

    pub fn with_completion_delay(mut self, delay: Duration) -> Self {
        self.completion_delay = Some(delay);
        self
    }

    /// Raw SSE text pieces yielded by the upstream stream.
    pub fn with_stream(mut self, chunks: Vec<Result<String, AgentError>>) -> Self {
        self.stream_chunks = chunks;
        self
    }

    /// Keep the upstream stream open forever after the scripted chunks.
    pub fn hanging(mut self) -> Self {
        self.stream_hangs = true;
        self
    }

    pub fn with_loaded(mut self, loaded: Option<bool>) -> Self {
        self.loaded = loaded;
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

/// SSE `data:` line for one content delta.
pub fn sse_delta(content: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({
            "id": "chatcmpl-mock",
            "object": "chat.completion.chunk",
            "created": 0,
            "model": "mock",
            "choices": [{"index": 0, "delta": {"content": content}}]
        })
    )
}

/// Assistant text answer.
pub fn text_response(content: &str) -> ChatCompletionResponse {
    response(ChatMessage::assistant(content))
}

/// Assistant answer that calls one tool.
pub fn tool_call_response(call_id: &str, tool: &str, arguments: serde_json::Value) -> ChatCompletionResponse {
    response(ChatMessage {
        role: "assistant".to_string(),
        tool_calls: Some(vec![ToolCall {
            id: call_id.to_string(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: tool.to_string(),
                arguments: arguments.to_string(),
            },
        }]),
        ..Default::default()
    })
}

fn response(message: ChatMessage) -> ChatCompletionResponse {
    ChatCompletionResponse {
        id: "chatcmpl-mock".to_string(),
        object: "chat.completion".to_string(),
        created: 0,
        model: "mock".to_string(),
        choices: vec![Choice {
            index: 0,
            message,
            finish_reason: Some("stop".to_string()),
        }],
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
    }
}

#[async_trait]
impl InferenceAgent for MockAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn profile(&self) -> AgentProfile {
        AgentProfile {
            backend_type: "mock".to_string(),
            version: None,
        }
    }

    async fn health_check(&self) -> Result<HealthStatus, AgentError> {
        if let Some(delay) = self.health_delay {
            tokio::time::sleep(delay).await;
        }
        next(&self.health).unwrap_or(Ok(HealthStatus::Healthy { model_count: 0 }))
    }

    async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, AgentError> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.completion_delay {
            tokio::time::sleep(delay).await;
        }
        next(&self.completions).unwrap_or_else(|| Ok(text_response("ok")))
    }

    async fn chat_completion_stream(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<BoxStream<'static, Result<StreamChunk, AgentError>>, AgentError> {
        self.requests.lock().unwrap().push(request);

        let chunks: Vec<_> = self
            .stream_chunks
            .iter()
            .cloned()
            .map(|c| c.map(|data| StreamChunk { data }))
            .collect();
        let scripted = stream::iter(chunks);

        if self.stream_hangs {
            Ok(scripted.chain(stream::pending()).boxed())
        } else {
            Ok(scripted.boxed())
        }
    }

    async fn is_model_loaded(&self, _model: &str) -> Option<bool> {
        self.loaded
    }
}
