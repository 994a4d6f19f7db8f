//! Status events emitted to streaming clients.

use crate::api::types::Usage;
use serde::{Deserialize, Serialize};

/// Phase of a streamed completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    Routing,
    Loading,
    Generating,
    Streaming,
    Done,
    Error,
}

impl StreamStatus {
    /// `done` and `error` end the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamStatus::Done | StreamStatus::Error)
    }
}

/// One SSE `data:` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub status: StreamStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    /// Seconds until a cold model is expected to be ready
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<u64>,
}

impl StreamEvent {
    fn status(status: StreamStatus) -> Self {
        Self {
            status,
            message: None,
            delta: None,
            content: None,
            usage: None,
            model: None,
            provider_name: None,
            estimated_time: None,
        }
    }

    pub fn routing(provider_name: &str, model: &str) -> Self {
        Self {
            message: Some(format!("Routed to {}", provider_name)),
            model: Some(model.to_string()),
            provider_name: Some(provider_name.to_string()),
            ..Self::status(StreamStatus::Routing)
        }
    }

    pub fn loading(model: &str, estimated_time: Option<u64>) -> Self {
        Self {
            message: Some(format!("Loading model {}", model)),
            model: Some(model.to_string()),
            estimated_time,
            ..Self::status(StreamStatus::Loading)
        }
    }

    pub fn generating() -> Self {
        Self::status(StreamStatus::Generating)
    }

    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            delta: Some(text.into()),
            ..Self::status(StreamStatus::Streaming)
        }
    }

    pub fn done(content: String, usage: Usage, model: &str) -> Self {
        Self {
            content: Some(content),
            usage: Some(usage),
            model: Some(model.to_string()),
            ..Self::status(StreamStatus::Done)
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::status(StreamStatus::Error)
        }
    }
}
