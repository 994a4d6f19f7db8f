//! Structured logging setup.
//!
//! Components log under their module path (`switchyard::routing`,
//! `switchyard::jobs`, ...), so per-component levels are plain
//! `EnvFilter` directives. `RUST_LOG`, when set, replaces the configured
//! filter entirely.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Build filter directives string from LoggingConfig
///
/// # Examples
///
/// ```
/// use switchyard::config::LoggingConfig;
/// use switchyard::logging::build_filter_directives;
///
/// let mut config = LoggingConfig::default();
/// config.component_levels.insert("routing".to_string(), "debug".to_string());
///
/// assert_eq!(build_filter_directives(&config), "info,switchyard::routing=debug");
/// ```
pub fn build_filter_directives(config: &LoggingConfig) -> String {
    let mut components: Vec<_> = config.component_levels.iter().collect();
    components.sort();

    let mut filter_str = config.level.clone();
    for (component, level) in components {
        filter_str.push_str(&format!(",switchyard::{}={}", component, level));
    }
    filter_str
}

/// Install the global subscriber.
pub fn init(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter_str = build_filter_directives(config);
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&filter_str))?;

    match config.format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
    }

    Ok(())
}

/// Correlation id attached to each completion request's log lines.
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}
