//! Routing configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::error::ConfigError;

/// Routing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// `auto` requests estimated below this many tokens try fast backends first
    pub small_context_threshold: u32,
    /// Deadline for every backend invocation
    pub request_timeout_seconds: u64,
    /// `Retry-After` sent with 503 responses
    pub retry_after_seconds: u64,
    /// Model name → alias target (`auto`, a class, or a model id)
    pub aliases: HashMap<String, String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            small_context_threshold: 2048,
            request_timeout_seconds: 120,
            retry_after_seconds: 2,
            aliases: HashMap::new(),
        }
    }
}

/// Aliases resolve one level deep; a target that is itself an alias would be
/// silently ignored, so reject it.
pub fn validate_aliases(aliases: &HashMap<String, String>) -> Result<(), ConfigError> {
    for (name, target) in aliases {
        if target.trim().is_empty() {
            return Err(ConfigError::invalid(
                format!("routing.aliases.{}", name),
                "alias target cannot be empty",
            ));
        }
        if aliases.contains_key(target) {
            return Err(ConfigError::invalid(
                format!("routing.aliases.{}", name),
                format!("target '{}' is itself an alias", target),
            ));
        }
    }
    Ok(())
}
