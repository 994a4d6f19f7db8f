//! Backends command implementation

use crate::agent::factory::backend_from_config;
use crate::cli::output::{format_backends_json, format_backends_table};
use crate::cli::BackendsArgs;
use crate::config::SwitchyardConfig;
use crate::registry::Registry;

/// Build a registry from the configured backends without contacting them.
pub fn load_registry(config: &SwitchyardConfig) -> Result<Registry, Box<dyn std::error::Error>> {
    let registry = Registry::new();
    for backend in &config.backends {
        registry.add_backend(backend_from_config(backend))?;
    }
    Ok(registry)
}

/// Handle the backends command
pub fn handle_backends(args: &BackendsArgs) -> Result<String, Box<dyn std::error::Error>> {
    let config = SwitchyardConfig::load(Some(&args.config))?.with_env_overrides();
    config.validate()?;

    let registry = load_registry(&config)?;
    let views = registry.views();

    if args.json {
        Ok(format_backends_json(&views)?)
    } else {
        Ok(format_backends_table(&views))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_backends_json_lists_configured_backends_by_priority() {
        let file = config_file(
            r#"
            [[backends]]
            name = "cloud"
            url = "https://api.example.com"
            kind = "cloud"
            priority = 90
            models = ["gpt-4o"]

            [[backends]]
            name = "gpu-small"
            url = "http://localhost:11434"
            type = "ollama"
            priority = 10
            models = ["llama3"]
            "#,
        );
        let args = BackendsArgs {
            json: true,
            config: file.path().to_path_buf(),
        };

        let output = handle_backends(&args).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        let ids: Vec<&str> = parsed["backends"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["gpu-small", "cloud"]);
    }

    #[test]
    fn test_backends_missing_config_is_error() {
        let args = BackendsArgs {
            json: false,
            config: "/nonexistent/switchyard.toml".into(),
        };
        assert!(handle_backends(&args).is_err());
    }
}
