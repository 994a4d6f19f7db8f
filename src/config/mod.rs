//! Configuration module for Switchyard
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`SWITCHYARD_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use switchyard::config::SwitchyardConfig;
//!
//! let config = SwitchyardConfig::default();
//! assert_eq!(config.server.port, 8000);
//!
//! let toml = r#"
//! [routing]
//! small_context_threshold = 4096
//! "#;
//! let config: SwitchyardConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.routing.small_context_threshold, 4096);
//! ```

pub mod admission;
pub mod backend;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod routing;
pub mod server;
pub mod streaming;

pub use admission::AdmissionConfig;
pub use backend::BackendConfig;
pub use error::ConfigError;
pub use jobs::JobsConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use routing::RoutingConfig;
pub use server::ServerConfig;
pub use streaming::StreamingConfig;

// Re-export HealthCheckConfig from health module
pub use crate::health::HealthCheckConfig;

use crate::admission::AdmissionMode;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Annotated example written by `switchyard config init`.
pub const EXAMPLE_CONFIG: &str = include_str!("../../switchyard.example.toml");

/// Unified configuration for the Switchyard server.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SwitchyardConfig {
    pub server: ServerConfig,
    pub health_check: HealthCheckConfig,
    pub routing: RoutingConfig,
    pub admission: AdmissionConfig,
    pub jobs: JobsConfig,
    pub streaming: StreamingConfig,
    pub backends: Vec<BackendConfig>,
    pub logging: LoggingConfig,
}

impl SwitchyardConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supports SWITCHYARD_* environment variables for common settings.
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(port) = std::env::var("SWITCHYARD_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(host) = std::env::var("SWITCHYARD_HOST") {
            self.server.host = host;
        }
        if let Ok(token) = std::env::var("SWITCHYARD_ADMIN_TOKEN") {
            if !token.is_empty() {
                self.server.admin_token = Some(token);
            }
        }

        if let Ok(level) = std::env::var("SWITCHYARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("SWITCHYARD_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        if let Ok(health) = std::env::var("SWITCHYARD_HEALTH_CHECK") {
            self.health_check.enabled = health.to_lowercase() == "true";
        }
        if let Ok(threshold) = std::env::var("SWITCHYARD_SMALL_CONTEXT_THRESHOLD") {
            if let Ok(t) = threshold.parse() {
                self.routing.small_context_threshold = t;
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "port must be non-zero"));
        }
        if self.health_check.failure_threshold == 0 {
            return Err(ConfigError::invalid(
                "health_check.failure_threshold",
                "must be at least 1",
            ));
        }
        if self.health_check.interval_seconds == 0 {
            return Err(ConfigError::invalid(
                "health_check.interval_seconds",
                "must be at least 1",
            ));
        }
        if self.streaming.channel_capacity == 0 {
            return Err(ConfigError::invalid(
                "streaming.channel_capacity",
                "must be at least 1",
            ));
        }
        if self.jobs.max_concurrent_jobs == 0 {
            return Err(ConfigError::invalid(
                "jobs.max_concurrent_jobs",
                "must be at least 1",
            ));
        }

        let mut names = HashSet::new();
        for (i, backend) in self.backends.iter().enumerate() {
            if backend.url.is_empty() {
                return Err(ConfigError::invalid(
                    format!("backends[{}].url", i),
                    "URL cannot be empty",
                ));
            }
            if backend.name.is_empty() {
                return Err(ConfigError::invalid(
                    format!("backends[{}].name", i),
                    "name cannot be empty",
                ));
            }
            if backend.max_concurrent == 0 {
                return Err(ConfigError::invalid(
                    format!("backends[{}].max_concurrent", i),
                    "must be at least 1",
                ));
            }
            if !names.insert(backend.name.as_str()) {
                return Err(ConfigError::invalid(
                    format!("backends[{}].name", i),
                    format!("duplicate backend name '{}'", backend.name),
                ));
            }
        }

        for name in &self.admission.restricted_backends {
            if !names.contains(name.as_str()) {
                return Err(ConfigError::invalid(
                    "admission.restricted_backends",
                    format!("unknown backend '{}'", name),
                ));
            }
        }
        if self.admission.mode == AdmissionMode::Restricted
            && self.admission.restricted_backends.is_empty()
        {
            return Err(ConfigError::invalid(
                "admission.restricted_backends",
                "restricted mode needs at least one backend",
            ));
        }

        routing::validate_aliases(&self.routing.aliases)?;

        Ok(())
    }
}
