//! Tools callable by jobs.
//!
//! Filesystem tools resolve paths against the job's working directory and
//! refuse anything that escapes it. Jobs without one get no filesystem access.

use crate::api::types::{FunctionDefinition, ToolDefinition};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Largest file body returned by `read_file`.
const MAX_READ_BYTES: usize = 64 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("path '{0}' is outside the working directory")]
    PathEscape(String),

    #[error("filesystem tools need a working directory")]
    NoWorkingDirectory,

    #[error("{0}")]
    Io(String),
}

/// Per-invocation context.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub working_directory: Option<PathBuf>,
}

impl ToolContext {
    pub fn new(working_directory: Option<PathBuf>) -> Self {
        Self { working_directory }
    }

    /// Resolve `path` for a filesystem tool.
    ///
    /// Relative paths are joined to the working directory. The result must
    /// stay inside it both after `..` is collapsed and after symlinks are
    /// followed. Without a working directory nothing resolves.
    pub async fn resolve(&self, path: &str) -> Result<PathBuf, ToolError> {
        let Some(root) = &self.working_directory else {
            return Err(ToolError::NoWorkingDirectory);
        };

        let root = tokio::fs::canonicalize(root)
            .await
            .map_err(|e| ToolError::Io(format!("{}: {}", root.display(), e)))?;
        let candidate = Path::new(path);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            root.join(candidate)
        };

        let normalized = normalize(&joined);
        if !normalized.starts_with(&root) {
            return Err(ToolError::PathEscape(path.to_string()));
        }

        match tokio::fs::canonicalize(&normalized).await {
            Ok(real) if real.starts_with(&root) => Ok(real),
            Ok(_) => Err(ToolError::PathEscape(path.to_string())),
            // Missing targets cannot be read through, so the lexical check suffices
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(normalized),
            Err(e) => Err(ToolError::Io(format!("{}: {}", normalized.display(), e))),
        }
    }
}

/// Lexically collapse `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// A capability the model can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object.
    fn parameters(&self) -> Value;

    async fn invoke(&self, args: Value, ctx: &ToolContext) -> Result<String, ToolError>;
}

fn string_arg<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing string field '{}'", key)))
}

pub struct ReadFile;

#[async_trait]
impl Tool for ReadFile {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a UTF-8 text file"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"path": {"type": "string", "description": "File path"}},
            "required": ["path"]
        })
    }

    async fn invoke(&self, args: Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let path = ctx.resolve(string_arg(&args, "path")?).await?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ToolError::Io(format!("{}: {}", path.display(), e)))?;

        let mut text = String::from_utf8_lossy(&bytes[..bytes.len().min(MAX_READ_BYTES)])
            .into_owned();
        if bytes.len() > MAX_READ_BYTES {
            text.push_str(&format!("\n[truncated, {} bytes total]", bytes.len()));
        }
        Ok(text)
    }
}

pub struct ListDirectory;

#[async_trait]
impl Tool for ListDirectory {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List the entries of a directory, one per line; directories end with '/'"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"path": {"type": "string", "description": "Directory path, default '.'"}}
        })
    }

    async fn invoke(&self, args: Value, ctx: &ToolContext) -> Result<String, ToolError> {
        let raw = args.get("path").and_then(Value::as_str).unwrap_or(".");
        let path = ctx.resolve(raw).await?;
        let io_err = |e: std::io::Error| ToolError::Io(format!("{}: {}", path.display(), e));

        let mut dir = tokio::fs::read_dir(&path).await.map_err(io_err)?;
        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(io_err)? {
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                name.push('/');
            }
            entries.push(name);
        }
        entries.sort();
        Ok(entries.join("\n"))
    }
}

pub struct CurrentTime;

#[async_trait]
impl Tool for CurrentTime {
    fn name(&self) -> &str {
        "current_time"
    }

    fn description(&self) -> &str {
        "Current UTC time in RFC 3339 format"
    }

    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn invoke(&self, _args: Value, _ctx: &ToolContext) -> Result<String, ToolError> {
        Ok(chrono::Utc::now().to_rfc3339())
    }
}

/// Tools offered to every job, keyed by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `read_file`, `list_directory` and `current_time`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ReadFile));
        registry.register(Arc::new(ListDirectory));
        registry.register(Arc::new(CurrentTime));
        registry
    }

    /// Add a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Schemas sent to the model with every turn.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|tool| ToolDefinition {
                tool_type: "function".to_string(),
                function: FunctionDefinition {
                    name: tool.name().to_string(),
                    description: Some(tool.description().to_string()),
                    parameters: tool.parameters(),
                },
            })
            .collect()
    }

    /// Invoke a tool with JSON-encoded arguments as sent by the model.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: &str,
        ctx: &ToolContext,
    ) -> Result<String, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let args = if arguments.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))?
        };

        tool.invoke(args, ctx).await
    }
}
