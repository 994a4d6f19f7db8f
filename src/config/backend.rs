//! Backend configuration

use crate::registry::{BackendClass, BackendKind, BackendType};
use serde::{Deserialize, Serialize};

/// One `[[backends]]` entry. The name doubles as the backend id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub name: String,
    pub url: String,
    #[serde(rename = "type", default)]
    pub backend_type: BackendType,
    #[serde(default)]
    pub kind: BackendKind,
    #[serde(default)]
    pub class: BackendClass,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: u32,
    #[serde(default)]
    pub models: Vec<String>,
    /// Liveness path for OpenAI-compatible backends (default `/v1/models`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warmup_seconds: Option<u64>,
    /// Environment variable holding a bearer token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

fn default_priority() -> i32 {
    50
}

fn default_max_concurrent() -> u32 {
    4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_config_defaults() {
        let config: BackendConfig = toml::from_str(
            r#"
            name = "gpu-small"
            url = "http://localhost:11434"
            "#,
        )
        .unwrap();

        assert_eq!(config.backend_type, BackendType::OpenAI);
        assert_eq!(config.kind, BackendKind::LocalAccelerator);
        assert_eq!(config.class, BackendClass::Fast);
        assert_eq!(config.priority, 50);
        assert_eq!(config.max_concurrent, 4);
        assert!(config.models.is_empty());
        assert!(config.probe_path.is_none());
    }

    #[test]
    fn test_backend_config_full() {
        let config: BackendConfig = toml::from_str(
            r#"
            name = "cloud"
            url = "https://api.example.com"
            type = "openai"
            kind = "cloud"
            class = "capacity"
            priority = 90
            max_concurrent = 16
            models = ["gpt-4o"]
            api_key_env = "CLOUD_API_KEY"
            "#,
        )
        .unwrap();

        assert_eq!(config.kind, BackendKind::Cloud);
        assert_eq!(config.class, BackendClass::Capacity);
        assert_eq!(config.max_concurrent, 16);
        assert_eq!(config.api_key_env.as_deref(), Some("CLOUD_API_KEY"));
    }
}
