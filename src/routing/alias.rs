//! Model alias parsing.

use crate::registry::{Backend, BackendClass};
use std::collections::HashMap;
use std::fmt;

/// The `model` field of a request, parsed once at the routing boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelAlias {
    /// A concrete model id served by one or more backends
    Explicit(String),
    /// Any backend of a capacity class (`small`/`fast`, `big`/`capacity`)
    Class(BackendClass),
    /// Pick by estimated context size
    Auto,
}

impl ModelAlias {
    /// Parse a model string, resolving configured aliases one level deep.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use switchyard::registry::BackendClass;
    /// use switchyard::routing::ModelAlias;
    ///
    /// let aliases = HashMap::from([("gpt-4".to_string(), "big".to_string())]);
    /// assert_eq!(ModelAlias::parse("gpt-4", &aliases), ModelAlias::Class(BackendClass::Capacity));
    /// assert_eq!(ModelAlias::parse("", &aliases), ModelAlias::Auto);
    /// assert_eq!(
    ///     ModelAlias::parse("llama3:8b", &aliases),
    ///     ModelAlias::Explicit("llama3:8b".to_string())
    /// );
    /// ```
    pub fn parse(model: &str, aliases: &HashMap<String, String>) -> Self {
        let model = model.trim();
        let target = aliases.get(model).map(String::as_str).unwrap_or(model);

        if target.is_empty() || target.eq_ignore_ascii_case("auto") {
            return ModelAlias::Auto;
        }
        match BackendClass::parse(target) {
            Some(class) => ModelAlias::Class(class),
            None => ModelAlias::Explicit(target.to_string()),
        }
    }

    /// Model name to send to the selected backend.
    ///
    /// Class and auto aliases are rewritten to the backend's first configured
    /// model; `requested` is kept when the backend lists none.
    pub fn upstream_model(&self, backend: &Backend, requested: &str) -> String {
        match self {
            ModelAlias::Explicit(model) => model.clone(),
            ModelAlias::Class(_) | ModelAlias::Auto => backend
                .default_model()
                .unwrap_or(requested)
                .to_string(),
        }
    }
}

impl fmt::Display for ModelAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelAlias::Explicit(model) => write!(f, "{}", model),
            ModelAlias::Class(class) => write!(f, "{}", class),
            ModelAlias::Auto => write!(f, "auto"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names() {
        let none = HashMap::new();
        assert_eq!(ModelAlias::parse("auto", &none), ModelAlias::Auto);
        assert_eq!(ModelAlias::parse("AUTO", &none), ModelAlias::Auto);
        assert_eq!(ModelAlias::parse("  ", &none), ModelAlias::Auto);
        assert_eq!(
            ModelAlias::parse("small", &none),
            ModelAlias::Class(BackendClass::Fast)
        );
        assert_eq!(
            ModelAlias::parse("fast", &none),
            ModelAlias::Class(BackendClass::Fast)
        );
        assert_eq!(
            ModelAlias::parse("big", &none),
            ModelAlias::Class(BackendClass::Capacity)
        );
        assert_eq!(
            ModelAlias::parse("capacity", &none),
            ModelAlias::Class(BackendClass::Capacity)
        );
    }

    #[test]
    fn test_configured_alias_resolves_single_level() {
        let aliases = HashMap::from([
            ("default".to_string(), "auto".to_string()),
            ("a".to_string(), "b".to_string()),
            ("b".to_string(), "big".to_string()),
        ]);
        assert_eq!(ModelAlias::parse("default", &aliases), ModelAlias::Auto);
        // "a" resolves to "b" and stops there
        assert_eq!(
            ModelAlias::parse("a", &aliases),
            ModelAlias::Explicit("b".to_string())
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ModelAlias::Auto.to_string(), "auto");
        assert_eq!(ModelAlias::Class(BackendClass::Capacity).to_string(), "capacity");
        assert_eq!(ModelAlias::Explicit("m".into()).to_string(), "m");
    }

    #[test]
    fn test_upstream_model_rewrites_class_aliases() {
        use crate::registry::{BackendKind, BackendType};

        let backend = Backend::new(
            "gpu".into(),
            "gpu".into(),
            "http://gpu".into(),
            BackendType::Ollama,
            BackendKind::LocalAccelerator,
            BackendClass::Fast,
        )
        .with_models(vec!["llama3.1:8b".into()]);

        assert_eq!(ModelAlias::Auto.upstream_model(&backend, "auto"), "llama3.1:8b");
        assert_eq!(
            ModelAlias::Explicit("llama3.1:8b".into()).upstream_model(&backend, "x"),
            "llama3.1:8b"
        );

        let bare = Backend::new(
            "b".into(),
            "b".into(),
            "http://b".into(),
            BackendType::OpenAI,
            BackendKind::Cloud,
            BackendClass::Capacity,
        );
        assert_eq!(
            ModelAlias::Class(BackendClass::Capacity).upstream_model(&bare, "gpt-4o"),
            "gpt-4o"
        );
    }
}
