use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

/// Backend API flavour.
///
/// Determines which agent implementation talks to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// OpenAI-compatible server (vLLM, llama.cpp, LM Studio, hosted APIs)
    #[default]
    OpenAI,
    /// Ollama (<https://ollama.ai>), probed through its native API
    Ollama,
}

/// Where a backend executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Local accelerator-backed runtime
    #[default]
    LocalAccelerator,
    /// Hosted cloud fallback
    Cloud,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocalAccelerator => "local_accelerator",
            Self::Cloud => "cloud",
        }
    }
}

/// Capacity class used by class aliases and "auto" routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendClass {
    /// Fast, low-capacity models (short contexts)
    #[default]
    Fast,
    /// High-capacity models (long contexts, larger weights)
    Capacity,
}

impl BackendClass {
    /// Parse a class name. Accepts the public aliases `small`/`big` as well.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "fast" | "small" => Some(Self::Fast),
            "capacity" | "big" => Some(Self::Capacity),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Capacity => "capacity",
        }
    }
}

impl std::fmt::Display for BackendClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rolling health record for one backend.
///
/// Written only by the health monitor's probe loop for that backend.
/// Starts optimistic: a freshly registered backend is routable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub is_healthy: bool,
    pub consecutive_failures: u32,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_latency_ms: Option<u32>,
    pub last_error: Option<String>,
}

impl Default for HealthRecord {
    fn default() -> Self {
        Self {
            is_healthy: true,
            consecutive_failures: 0,
            last_checked_at: None,
            last_latency_ms: None,
            last_error: None,
        }
    }
}

/// An inference backend.
///
/// Static description plus two pieces of runtime state: the in-flight
/// counter (atomic, compare-and-increment against `max_concurrent`) and
/// the health record (single writer, many snapshot readers).
///
/// # Examples
///
/// ```
/// use switchyard::registry::{Backend, BackendClass, BackendKind, BackendType};
///
/// let backend = Backend::new(
///     "gpu-small".to_string(),
///     "GPU small".to_string(),
///     "http://localhost:11434".to_string(),
///     BackendType::Ollama,
///     BackendKind::LocalAccelerator,
///     BackendClass::Fast,
/// )
/// .with_max_concurrent(2);
///
/// assert!(backend.try_acquire());
/// assert!(backend.try_acquire());
/// assert!(!backend.try_acquire());
/// backend.release();
/// assert_eq!(backend.in_flight(), 1);
/// ```
#[derive(Debug)]
pub struct Backend {
    /// Unique identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Base URL for API requests
    pub url: String,
    /// API flavour
    pub backend_type: BackendType,
    /// Local accelerator or cloud
    pub kind: BackendKind,
    /// Fast or capacity class
    pub class: BackendClass,
    /// Priority for routing (lower = prefer)
    pub priority: i32,
    /// Maximum concurrent requests
    pub max_concurrent: u32,
    /// Model identifiers served, first entry is the default model
    pub models: Vec<String>,
    /// Cold-start estimate reported to streaming callers
    pub warmup_seconds: Option<u64>,
    in_flight: AtomicU32,
    health: RwLock<HealthRecord>,
}

impl Backend {
    /// Create a backend with capacity 1, priority 0 and an optimistic health record.
    pub fn new(
        id: String,
        name: String,
        url: String,
        backend_type: BackendType,
        kind: BackendKind,
        class: BackendClass,
    ) -> Self {
        Self {
            id,
            name,
            url,
            backend_type,
            kind,
            class,
            priority: 0,
            max_concurrent: 1,
            models: Vec::new(),
            warmup_seconds: None,
            in_flight: AtomicU32::new(0),
            health: RwLock::new(HealthRecord::default()),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: u32) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    pub fn with_warmup_seconds(mut self, warmup_seconds: Option<u64>) -> Self {
        self.warmup_seconds = warmup_seconds;
        self
    }

    /// Current in-flight request count.
    pub fn in_flight(&self) -> u32 {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Fraction of capacity in use (0.0 when capacity is zero).
    pub fn utilization(&self) -> f64 {
        if self.max_concurrent == 0 {
            return 0.0;
        }
        self.in_flight() as f64 / self.max_concurrent as f64
    }

    /// Atomically take one capacity slot if one is free.
    pub fn try_acquire(&self) -> bool {
        let mut current = self.in_flight.load(Ordering::SeqCst);
        loop {
            if current >= self.max_concurrent {
                return false;
            }
            match self.in_flight.compare_exchange(
                current,
                current + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Give back one capacity slot (saturating at 0).
    ///
    /// Returns the new in-flight value.
    pub fn release(&self) -> u32 {
        let mut current = self.in_flight.load(Ordering::SeqCst);
        loop {
            if current == 0 {
                tracing::warn!(
                    backend_id = %self.id,
                    "Attempted to release a slot when in_flight is already 0"
                );
                return 0;
            }
            match self.in_flight.compare_exchange(
                current,
                current - 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return current - 1,
                Err(actual) => current = actual,
            }
        }
    }

    /// Snapshot of the health record.
    pub fn health(&self) -> HealthRecord {
        self.health
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_healthy(&self) -> bool {
        self.health
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_healthy
    }

    pub(crate) fn set_health(&self, record: HealthRecord) {
        *self
            .health
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = record;
    }

    pub fn is_local(&self) -> bool {
        self.kind == BackendKind::LocalAccelerator
    }

    pub fn serves(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    /// Model sent upstream when the caller asked for a class or "auto".
    pub fn default_model(&self) -> Option<&str> {
        self.models.first().map(String::as_str)
    }
}

/// Health section of [`BackendView`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthView {
    pub is_healthy: bool,
    pub consecutive_failures: u32,
    pub last_latency_ms: Option<u32>,
    pub checked_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Load section of [`BackendView`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadView {
    pub current: u32,
    pub max: u32,
    pub utilization: f64,
}

/// Serializable view of a Backend with health and load.
///
/// This is the shape served by `GET /v1/backends`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendView {
    pub id: String,
    pub name: String,
    pub url: String,
    pub kind: BackendKind,
    pub class: BackendClass,
    pub priority: i32,
    pub health: HealthView,
    pub load: LoadView,
    pub models: Vec<String>,
}

impl From<&Backend> for BackendView {
    fn from(backend: &Backend) -> Self {
        let health = backend.health();
        Self {
            id: backend.id.clone(),
            name: backend.name.clone(),
            url: backend.url.clone(),
            kind: backend.kind,
            class: backend.class,
            priority: backend.priority,
            health: HealthView {
                is_healthy: health.is_healthy,
                consecutive_failures: health.consecutive_failures,
                last_latency_ms: health.last_latency_ms,
                checked_at: health.last_checked_at,
                last_error: health.last_error,
            },
            load: LoadView {
                current: backend.in_flight(),
                max: backend.max_concurrent,
                utilization: backend.utilization(),
            },
            models: backend.models.clone(),
        }
    }
}
