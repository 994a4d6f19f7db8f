//! Request and response types for the OpenAI-compatible API.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Chat completion request matching OpenAI format.
///
/// `force_big` and `enhanced_status` are Switchyard extensions; they are read
/// from the caller and never forwarded upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default, skip_serializing)]
    pub force_big: bool,
    #[serde(default, skip_serializing)]
    pub enhanced_status: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    /// Pass through any additional fields to backend
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ChatCompletionRequest {
    /// Minimal request with defaults for every optional field.
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: false,
            force_big: false,
            enhanced_status: false,
            temperature: None,
            max_tokens: None,
            top_p: None,
            stop: None,
            user: None,
            tools: None,
            extra: HashMap::new(),
        }
    }

    /// Index of the last message with role `user`.
    pub fn last_user_index(&self) -> Option<usize> {
        self.messages.iter().rposition(|m| m.role == "user")
    }
}

/// A single message in the conversation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    fn with_text(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(MessageContent::Text(text.into())),
            ..Default::default()
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::with_text("system", text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::with_text("user", text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_text("assistant", text)
    }

    /// Tool result message answering `tool_call_id`.
    pub fn tool(tool_call_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::with_text("tool", text)
        }
    }

    /// Plain text of the message (text parts joined, images ignored).
    pub fn text(&self) -> String {
        match &self.content {
            Some(MessageContent::Text(text)) => text.clone(),
            Some(MessageContent::Parts(parts)) => parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join(" "),
            None => String::new(),
        }
    }

    /// The text the message opens with: the whole string, or the first
    /// text part of multimodal content.
    pub fn leading_text_mut(&mut self) -> Option<&mut String> {
        match &mut self.content {
            Some(MessageContent::Text(text)) => Some(text),
            Some(MessageContent::Parts(parts)) => parts.iter_mut().find_map(|p| p.text.as_mut()),
            None => None,
        }
    }
}

/// Message content - either text or multimodal parts.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// Content part for multimodal messages.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub part_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<ImageUrl>,
}

/// Image URL for vision requests.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

/// Function name plus JSON-encoded arguments.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

/// Tool schema offered to the model.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type", default = "function_type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: serde_json::Value,
}

fn function_type() -> String {
    "function".to_string()
}

/// Chat completion response (non-streaming).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// A single choice in the response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Choice {
    pub index: u32,
    pub message: ChatMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Chat completion chunk for streaming responses.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// A single choice in a streaming chunk.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: ChunkDelta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Delta content in a streaming chunk.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChunkDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// API error response in OpenAI format.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub error: ApiErrorBody,
    /// Seconds sent back in `Retry-After` for retryable failures.
    #[serde(skip)]
    pub retry_after: Option<u64>,
}

/// Error details.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiErrorBody {
    pub message: String,
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiError {
    fn new(message: String, r#type: &str, param: Option<&str>, code: &str) -> Self {
        Self {
            error: ApiErrorBody {
                message,
                r#type: r#type.to_string(),
                param: param.map(str::to_string),
                code: Some(code.to_string()),
            },
            retry_after: None,
        }
    }

    /// Create a bad request error (400).
    pub fn bad_request(message: &str) -> Self {
        Self::new(
            message.to_string(),
            "invalid_request_error",
            None,
            "invalid_request_error",
        )
    }

    /// Create a model not found error (404) with available models hint.
    pub fn model_not_found(model: &str, available: &[String]) -> Self {
        let hint = if available.is_empty() {
            "No models available".to_string()
        } else {
            format!("Available: {}", available.join(", "))
        };
        Self::new(
            format!("Model '{}' not found. {}", model, hint),
            "invalid_request_error",
            Some("model"),
            "model_not_found",
        )
    }

    /// Create a generic not found error (404).
    pub fn not_found(message: &str) -> Self {
        Self::new(
            message.to_string(),
            "invalid_request_error",
            None,
            "not_found",
        )
    }

    /// Create an admission denied error (403) pointing at `force_big`.
    pub fn admission_denied(alias: &str, denied: &[String]) -> Self {
        Self::new(
            format!(
                "Backends for '{}' are restricted by admission control ({}). \
                 Set \"force_big\": true or prefix the prompt with @big to override.",
                alias,
                denied.join(", ")
            ),
            "admission_error",
            Some("force_big"),
            "admission_denied",
        )
    }

    /// Create an unauthorized error (401).
    pub fn unauthorized(message: &str) -> Self {
        Self::new(
            message.to_string(),
            "authentication_error",
            None,
            "unauthorized",
        )
    }

    /// Create a forbidden error (403).
    pub fn forbidden(message: &str) -> Self {
        Self::new(message.to_string(), "permission_error", None, "forbidden")
    }

    /// Create a bad gateway error (502).
    pub fn bad_gateway(message: &str) -> Self {
        Self::new(message.to_string(), "server_error", None, "bad_gateway")
    }

    /// Create a gateway timeout error (504).
    pub fn gateway_timeout() -> Self {
        Self::new(
            "Backend request timed out".to_string(),
            "server_error",
            None,
            "gateway_timeout",
        )
    }

    /// Create a service unavailable error (503).
    pub fn service_unavailable(message: &str) -> Self {
        Self::new(
            message.to_string(),
            "server_error",
            None,
            "service_unavailable",
        )
    }

    /// Create an internal error (500).
    pub fn internal(message: &str) -> Self {
        Self::new(message.to_string(), "server_error", None, "internal_error")
    }

    /// Attach a `Retry-After` hint.
    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self.error.code.as_deref() {
            Some("invalid_request_error") => StatusCode::BAD_REQUEST,
            Some("model_not_found") | Some("not_found") => StatusCode::NOT_FOUND,
            Some("unauthorized") => StatusCode::UNAUTHORIZED,
            Some("forbidden") | Some("admission_denied") => StatusCode::FORBIDDEN,
            Some("bad_gateway") => StatusCode::BAD_GATEWAY,
            Some("gateway_timeout") => StatusCode::GATEWAY_TIMEOUT,
            Some("service_unavailable") => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after = self.retry_after;
        let mut response = (status, Json(self)).into_response();
        if let Some(seconds) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_message_deserialize_text() {
        let json = json!({"role": "user", "content": "Hello"});
        let msg: ChatMessage = serde_json::from_value(json).unwrap();
        assert_eq!(msg.role, "user");
        assert_eq!(msg.content, Some(MessageContent::Text("Hello".to_string())));
        assert_eq!(msg.text(), "Hello");
    }

    #[test]
    fn test_chat_message_deserialize_multimodal() {
        let json = json!({
            "role": "user",
            "content": [
                {"type": "text", "text": "What's in this image?"},
                {"type": "image_url", "image_url": {"url": "data:image/png;base64,..."}}
            ]
        });
        let msg: ChatMessage = serde_json::from_value(json).unwrap();
        match &msg.content {
            Some(MessageContent::Parts(parts)) => {
                assert_eq!(parts.len(), 2);
                assert_eq!(parts[0].part_type, "text");
            }
            other => panic!("Expected parts content, got {:?}", other),
        }
        assert_eq!(msg.text(), "What's in this image?");
    }

    #[test]
    fn test_assistant_tool_call_message_without_content() {
        let json = json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {"name": "read_file", "arguments": "{\"path\":\"a.txt\"}"}
            }]
        });
        let msg: ChatMessage = serde_json::from_value(json).unwrap();
        assert!(msg.content.is_none());
        let calls = msg.tool_calls.unwrap();
        assert_eq!(calls[0].function.name, "read_file");
        assert_eq!(calls[0].call_type, "function");
    }

    #[test]
    fn test_tool_message_serialize() {
        let msg = ChatMessage::tool("call_1", "file contents");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "call_1");
        assert_eq!(json["content"], "file contents");
        assert!(json.get("tool_calls").is_none());
    }

    #[test]
    fn test_leading_text_is_first_text_part() {
        let mut msg: ChatMessage = serde_json::from_value(json!({
            "role": "user",
            "content": [
                {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}},
                {"type": "text", "text": "first"},
                {"type": "text", "text": "second"}
            ]
        }))
        .unwrap();
        assert_eq!(msg.leading_text_mut().map(|t| t.as_str()), Some("first"));

        let mut empty = ChatMessage {
            role: "assistant".to_string(),
            ..Default::default()
        };
        assert!(empty.leading_text_mut().is_none());
    }

    #[test]
    fn test_chat_request_deserialize_minimal() {
        let json = json!({
            "model": "auto",
            "messages": [{"role": "user", "content": "Hi"}]
        });
        let req: ChatCompletionRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.model, "auto");
        assert!(!req.stream);
        assert!(!req.force_big);
        assert!(!req.enhanced_status);
    }

    #[test]
    fn test_switchyard_fields_are_not_forwarded() {
        let json = json!({
            "model": "big",
            "messages": [{"role": "user", "content": "Hi"}],
            "force_big": true,
            "enhanced_status": true,
            "seed": 42
        });
        let req: ChatCompletionRequest = serde_json::from_value(json).unwrap();
        assert!(req.force_big);
        assert!(req.enhanced_status);

        let forwarded = serde_json::to_value(&req).unwrap();
        assert!(forwarded.get("force_big").is_none());
        assert!(forwarded.get("enhanced_status").is_none());
        assert_eq!(forwarded["seed"], 42);
    }

    #[test]
    fn test_last_user_index() {
        let req = ChatCompletionRequest::new(
            "auto",
            vec![
                ChatMessage::system("be brief"),
                ChatMessage::user("first"),
                ChatMessage::assistant("ok"),
                ChatMessage::user("second"),
            ],
        );
        assert_eq!(req.last_user_index(), Some(3));
    }

    #[test]
    fn test_chat_chunk_with_usage() {
        let json = json!({
            "id": "c1",
            "object": "chat.completion.chunk",
            "created": 1,
            "model": "m",
            "choices": [],
            "usage": {"prompt_tokens": 3, "completion_tokens": 4, "total_tokens": 7}
        });
        let chunk: ChatCompletionChunk = serde_json::from_value(json).unwrap();
        assert_eq!(chunk.usage.unwrap().total_tokens, 7);
    }

    #[test]
    fn test_api_error_serialize_404() {
        let error = ApiError::model_not_found(
            "gpt-4",
            &["llama3:70b".to_string(), "mistral:7b".to_string()],
        );
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["error"]["code"], "model_not_found");
        assert!(json["error"]["message"].as_str().unwrap().contains("gpt-4"));
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("llama3:70b"));
        assert!(json.get("retry_after").is_none());
    }

    #[test]
    fn test_admission_denied_mentions_force_big() {
        let error = ApiError::admission_denied("big", &["gpu-big".to_string()]);
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["error"]["code"], "admission_denied");
        assert_eq!(json["error"]["param"], "force_big");
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("force_big"));
    }

    #[test]
    fn test_service_unavailable_sets_retry_after() {
        let response = ApiError::service_unavailable("busy")
            .with_retry_after(2)
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "2");
    }

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            ApiError::bad_request("x").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::model_not_found("x", &[]).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::not_found("x").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::unauthorized("x").into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::forbidden("x").into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::admission_denied("x", &[]).into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::bad_gateway("x").into_response().status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::gateway_timeout().into_response().status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::internal("x").into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
