//! Streaming gateway.
//!
//! Proxies a backend's token stream to one caller as a sequence of
//! [`StreamEvent`]s. A producer task reads the upstream into a bounded
//! channel; the caller holds the receiving end. Dropping the returned stream
//! closes the channel, which aborts the producer and its upstream request.
//! The producer owns the [`BackendLease`], so the slot is released exactly
//! once however the stream ends.

pub mod events;
pub mod sse;


pub use events::{StreamEvent, StreamStatus};

use crate::agent::InferenceAgent;
use crate::api::types::{ChatCompletionChunk, ChatCompletionRequest, Usage};
use crate::config::StreamingConfig;
use crate::routing::{estimate_text_tokens, estimate_tokens, BackendLease};
use futures::stream::{BoxStream, StreamExt};
use sse::{SseData, SseLineBuffer};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Which events reach the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamMode {
    /// `streaming`, `done` and `error` only
    #[default]
    PassThrough,
    /// Every status, including routing/loading/generating
    Enhanced,
}

impl StreamMode {
    pub fn from_flag(enhanced: bool) -> Self {
        if enhanced {
            StreamMode::Enhanced
        } else {
            StreamMode::PassThrough
        }
    }
}

/// Opens producer/consumer pairs for streamed completions.
#[derive(Debug, Clone)]
pub struct StreamingGateway {
    channel_capacity: usize,
}

/// The receiving side closed the channel.
struct Disconnected;

impl StreamingGateway {
    pub fn new(config: &StreamingConfig) -> Self {
        Self {
            channel_capacity: config.channel_capacity.max(1),
        }
    }

    /// Start streaming `request` from the leased backend.
    ///
    /// The returned stream ends after exactly one `done` or `error` event.
    pub fn open(
        &self,
        lease: BackendLease,
        agent: Arc<dyn InferenceAgent>,
        request: ChatCompletionRequest,
        mode: StreamMode,
    ) -> BoxStream<'static, StreamEvent> {
        let (tx, mut rx) = mpsc::channel(self.channel_capacity);

        tokio::spawn(async move {
            let backend_id = lease.backend_id().to_string();
            tokio::select! {
                _ = tx.closed() => {
                    debug!(backend_id = %backend_id, "Stream consumer went away, cancelling upstream");
                }
                _ = produce(&tx, &lease, agent, request, mode) => {}
            }
            lease.release();
        });

        async_stream::stream! {
            while let Some(event) = rx.recv().await {
                yield event;
            }
        }
        .boxed()
    }
}

async fn emit(tx: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> Result<(), Disconnected> {
    tx.send(event).await.map_err(|_| Disconnected)
}

async fn produce(
    tx: &mpsc::Sender<StreamEvent>,
    lease: &BackendLease,
    agent: Arc<dyn InferenceAgent>,
    request: ChatCompletionRequest,
    mode: StreamMode,
) -> Result<(), Disconnected> {
    let backend = lease.backend();
    let enhanced = mode == StreamMode::Enhanced;
    let model = request.model.clone();
    let prompt_tokens = estimate_tokens(&request);

    if enhanced {
        emit(tx, StreamEvent::routing(&backend.name, &model)).await?;
        if agent.is_model_loaded(&model).await == Some(false) {
            emit(tx, StreamEvent::loading(&model, backend.warmup_seconds)).await?;
        }
    }

    let mut upstream = match agent.chat_completion_stream(request).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(backend_id = %backend.id, error = %e, "Streaming request failed");
            return emit(tx, StreamEvent::error(e.to_string())).await;
        }
    };

    let mut lines = SseLineBuffer::new();
    let mut content = String::new();
    let mut reported_usage: Option<Usage> = None;
    let mut started = false;
    let mut finished = false;

    'read: while let Some(chunk) = upstream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(backend_id = %backend.id, error = %e, "Stream read error");
                return emit(tx, StreamEvent::error(e.to_string())).await;
            }
        };

        for data in lines.push(&chunk.data) {
            let json = match data {
                SseData::Done => {
                    finished = true;
                    break 'read;
                }
                SseData::Json(json) => json,
            };
            let parsed: ChatCompletionChunk = match serde_json::from_str(&json) {
                Ok(parsed) => parsed,
                Err(e) => {
                    debug!(backend_id = %backend.id, error = %e, "Skipping unparseable chunk");
                    continue;
                }
            };

            if !started {
                started = true;
                if enhanced {
                    emit(tx, StreamEvent::generating()).await?;
                }
            }
            if parsed.usage.is_some() {
                reported_usage = parsed.usage;
            }
            for choice in parsed.choices {
                if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                    content.push_str(&text);
                    emit(tx, StreamEvent::delta(text)).await?;
                }
            }
        }
    }

    if !finished && lines.finish() != Some(SseData::Done) && content.is_empty() {
        warn!(backend_id = %backend.id, "Upstream closed without producing output");
        return emit(tx, StreamEvent::error("Backend closed the stream without a response")).await;
    }

    let usage = reported_usage.unwrap_or_else(|| {
        let completion_tokens = estimate_text_tokens(&content);
        Usage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    });
    debug!(
        backend_id = %backend.id,
        completion_tokens = usage.completion_tokens,
        "Stream completed"
    );
    emit(tx, StreamEvent::done(content, usage, &model)).await
}
