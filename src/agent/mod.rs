//! Agent abstraction layer.
//!
//! Provides the `InferenceAgent` trait that hides backend-specific HTTP
//! details (probe endpoints, warm-model detection, SSE framing) from the
//! router, the streaming gateway, and the job executor.

use async_trait::async_trait;
use futures_util::stream::BoxStream;

pub mod error;
pub mod factory;
#[cfg(test)]
pub(crate) mod mock;
pub mod ollama;
pub mod openai;
pub mod types;

pub use error::AgentError;
pub use types::{AgentProfile, HealthStatus, StreamChunk, Utf8ChunkDecoder};

use crate::api::types::{ChatCompletionRequest, ChatCompletionResponse};

/// Unified interface for all inference backends.
///
/// # Object Safety
///
/// This trait is object-safe and designed to be used as `Arc<dyn InferenceAgent>`.
/// All async methods use `async_trait` for compatibility with trait objects.
///
/// # Cancellation Safety
///
/// All async methods are cancellation-safe. Dropping a future aborts the
/// in-flight HTTP request.
#[async_trait]
pub trait InferenceAgent: Send + Sync + 'static {
    /// Unique identifier, equal to the backend id.
    fn id(&self) -> &str;

    /// Human-readable name for logging.
    fn name(&self) -> &str;

    fn profile(&self) -> AgentProfile;

    /// Lightweight liveness probe.
    ///
    /// - `Ok(HealthStatus::Healthy)` if backend is reachable and functional
    /// - `Ok(HealthStatus::Unhealthy)` if backend answered with an error status
    /// - `Err(AgentError::Network)` / `Err(AgentError::Timeout)` otherwise
    async fn health_check(&self) -> Result<HealthStatus, AgentError>;

    /// Execute a non-streaming chat completion.
    async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, AgentError>;

    /// Execute a streaming chat completion.
    ///
    /// Yields raw SSE text as received; callers reassemble lines.
    /// Errors before the first byte are returned directly.
    async fn chat_completion_stream(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<BoxStream<'static, Result<StreamChunk, AgentError>>, AgentError>;

    /// Whether `model` is already resident on the backend.
    ///
    /// `None` means the backend cannot tell; callers treat it as warm.
    async fn is_model_loaded(&self, _model: &str) -> Option<bool> {
        None
    }
}
