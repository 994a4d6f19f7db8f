//! Agent factory for creating InferenceAgent trait objects from configuration.

use super::{ollama::OllamaAgent, openai::OpenAICompatAgent, AgentError, InferenceAgent};
use crate::config::BackendConfig;
use crate::registry::{Backend, BackendType, Registry, RegistryError};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Deadlines applied to every agent built by the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentTimeouts {
    pub probe: Duration,
    pub request: Duration,
}

impl Default for AgentTimeouts {
    fn default() -> Self {
        Self {
            probe: Duration::from_secs(5),
            request: Duration::from_secs(120),
        }
    }
}

/// Create an agent for one `[[backends]]` entry.
///
/// The backend name is used as the agent id. A configured `api_key_env`
/// that is not set in the environment is a configuration error.
///
/// # Examples
///
/// ```
/// use switchyard::agent::factory::{create_agent, AgentTimeouts};
/// use switchyard::config::BackendConfig;
/// use reqwest::Client;
/// use std::sync::Arc;
///
/// let config: BackendConfig = toml::from_str(
///     "name = \"gpu-small\"\nurl = \"http://localhost:11434\"\ntype = \"ollama\"",
/// ).unwrap();
/// let agent = create_agent(&config, Arc::new(Client::new()), AgentTimeouts::default()).unwrap();
///
/// assert_eq!(agent.id(), "gpu-small");
/// assert_eq!(agent.profile().backend_type, "ollama");
/// ```
pub fn create_agent(
    config: &BackendConfig,
    client: Arc<Client>,
    timeouts: AgentTimeouts,
) -> Result<Arc<dyn InferenceAgent>, AgentError> {
    let id = config.name.clone();
    let name = config.name.clone();
    let url = config.url.trim_end_matches('/').to_string();

    match config.backend_type {
        BackendType::Ollama => Ok(Arc::new(
            OllamaAgent::new(id, name, url, client).with_timeouts(timeouts.probe, timeouts.request),
        )),
        BackendType::OpenAI => {
            let api_key = match &config.api_key_env {
                Some(var) => Some(std::env::var(var).map_err(|e| {
                    AgentError::Configuration(format!(
                        "Failed to read API key from env var '{}': {}",
                        var, e
                    ))
                })?),
                None => None,
            };

            let mut agent = OpenAICompatAgent::new(id, name, url, client)
                .with_api_key(api_key)
                .with_timeouts(timeouts.probe, timeouts.request);
            if let Some(path) = &config.probe_path {
                agent = agent.with_probe_path(path.clone());
            }
            Ok(Arc::new(agent))
        }
    }
}

/// Registry entry for a `[[backends]]` entry.
pub fn backend_from_config(config: &BackendConfig) -> Backend {
    Backend::new(
        config.name.clone(),
        config.name.clone(),
        config.url.trim_end_matches('/').to_string(),
        config.backend_type,
        config.kind,
        config.class,
    )
    .with_priority(config.priority)
    .with_max_concurrent(config.max_concurrent)
    .with_models(config.models.clone())
    .with_warmup_seconds(config.warmup_seconds)
}

/// Errors raised while populating the registry from configuration.
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("backend '{name}': {source}")]
    Agent { name: String, source: AgentError },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Build an agent for every configured backend and add both to `registry`.
///
/// Returns the number of backends registered.
pub fn register_backends(
    registry: &Registry,
    configs: &[BackendConfig],
    client: Arc<Client>,
    timeouts: AgentTimeouts,
) -> Result<usize, RegisterError> {
    for config in configs {
        let agent = create_agent(config, Arc::clone(&client), timeouts).map_err(|source| {
            RegisterError::Agent {
                name: config.name.clone(),
                source,
            }
        })?;
        registry.add_backend_with_agent(backend_from_config(config), agent)?;
        tracing::debug!(
            backend = %config.name,
            url = %config.url,
            kind = config.kind.as_str(),
            class = %config.class,
            "Registered backend"
        );
    }
    Ok(configs.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{BackendClass, BackendKind};

    fn config(toml: &str) -> BackendConfig {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_create_ollama_agent() {
        let c = config("name = \"local\"\nurl = \"http://localhost:11434/\"\ntype = \"ollama\"");
        let agent = create_agent(&c, Arc::new(Client::new()), AgentTimeouts::default()).unwrap();
        assert_eq!(agent.id(), "local");
        assert_eq!(agent.name(), "local");
        assert_eq!(agent.profile().backend_type, "ollama");
    }

    #[test]
    fn test_create_openai_agent_without_key() {
        let c = config("name = \"vllm\"\nurl = \"http://localhost:8000\"");
        let agent = create_agent(&c, Arc::new(Client::new()), AgentTimeouts::default()).unwrap();
        assert_eq!(agent.profile().backend_type, "openai");
    }

    #[test]
    fn test_missing_api_key_env_is_configuration_error() {
        let c = config(
            "name = \"cloud\"\nurl = \"https://api.example.com\"\napi_key_env = \"SWITCHYARD_TEST_KEY_THAT_IS_NEVER_SET\"",
        );
        let result = create_agent(&c, Arc::new(Client::new()), AgentTimeouts::default());
        assert!(matches!(result, Err(AgentError::Configuration(_))));
    }

    #[test]
    fn test_api_key_read_from_env() {
        std::env::set_var("SWITCHYARD_FACTORY_TEST_KEY", "sk-test");
        let c = config(
            "name = \"cloud\"\nurl = \"https://api.example.com\"\napi_key_env = \"SWITCHYARD_FACTORY_TEST_KEY\"",
        );
        let result = create_agent(&c, Arc::new(Client::new()), AgentTimeouts::default());
        std::env::remove_var("SWITCHYARD_FACTORY_TEST_KEY");
        assert!(result.is_ok());
    }

    #[test]
    fn test_backend_from_config_copies_fields() {
        let c = config(
            r#"
            name = "gpu-big"
            url = "http://gpu:8001/"
            kind = "local_accelerator"
            class = "capacity"
            priority = 20
            max_concurrent = 2
            models = ["qwen2.5:72b"]
            warmup_seconds = 45
            "#,
        );
        let backend = backend_from_config(&c);
        assert_eq!(backend.id, "gpu-big");
        assert_eq!(backend.url, "http://gpu:8001");
        assert_eq!(backend.kind, BackendKind::LocalAccelerator);
        assert_eq!(backend.class, BackendClass::Capacity);
        assert_eq!(backend.priority, 20);
        assert_eq!(backend.max_concurrent, 2);
        assert_eq!(backend.warmup_seconds, Some(45));
        assert!(backend.serves("qwen2.5:72b"));
    }

    #[test]
    fn test_register_backends_rejects_duplicates() {
        let registry = Registry::new();
        let a = config("name = \"a\"\nurl = \"http://a\"");
        let count = register_backends(
            &registry,
            &[a.clone()],
            Arc::new(Client::new()),
            AgentTimeouts::default(),
        )
        .unwrap();
        assert_eq!(count, 1);
        assert!(registry.get_agent("a").is_some());

        let result = register_backends(
            &registry,
            &[a],
            Arc::new(Client::new()),
            AgentTimeouts::default(),
        );
        assert!(matches!(result, Err(RegisterError::Registry(_))));
    }
}
