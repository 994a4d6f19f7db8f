//! Routing request extraction

use super::alias::ModelAlias;
use crate::api::types::ChatCompletionRequest;
use std::collections::HashMap;

/// Everything the router looks at for one decision.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingRequest {
    pub alias: ModelAlias,

    /// Heuristic prompt size (characters / 4)
    pub estimated_tokens: u32,

    /// Bypass admission restrictions and prefer capacity backends for `auto`
    pub force_big: bool,

    /// Caller-supplied hints, carried along and never interpreted
    pub hints: Option<serde_json::Value>,
}

impl RoutingRequest {
    pub fn new(alias: ModelAlias, estimated_tokens: u32) -> Self {
        Self {
            alias,
            estimated_tokens,
            force_big: false,
            hints: None,
        }
    }

    pub fn with_force_big(mut self, force_big: bool) -> Self {
        self.force_big = force_big;
        self
    }

    /// Build from a chat request whose `@big` directive was already applied.
    pub fn from_chat(request: &ChatCompletionRequest, aliases: &HashMap<String, String>) -> Self {
        Self {
            alias: ModelAlias::parse(&request.model, aliases),
            estimated_tokens: estimate_tokens(request),
            force_big: request.force_big,
            hints: request.extra.get("hints").cloned(),
        }
    }
}

/// Sum of message text lengths divided by 4.
pub fn estimate_tokens(request: &ChatCompletionRequest) -> u32 {
    request
        .messages
        .iter()
        .map(|m| (m.text().len() / 4) as u32)
        .fold(0u32, u32::saturating_add)
}

/// Same heuristic for a bare string.
pub fn estimate_text_tokens(text: &str) -> u32 {
    (text.len() / 4) as u32
}
