//! Admission control ("gaming mode").
//!
//! A process-wide gate that can fence off a subset of backends, typically
//! the big local accelerators while the machine is busy with something else.
//! Fenced backends stay routable for requests that explicitly ask for them
//! with `force_big` or the `@big` directive.

mod directive;
mod error;

pub use directive::*;
pub use error::*;

use crate::config::AdmissionConfig;
use crate::registry::Registry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

/// Admission mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AdmissionMode {
    /// Every backend admitted
    #[default]
    Normal,
    /// Backends in the restricted set need an explicit override
    Restricted,
}

/// Immutable admission snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionState {
    pub mode: AdmissionMode,
    pub restricted_backend_ids: BTreeSet<String>,
    pub updated_at: DateTime<Utc>,
}

impl AdmissionState {
    pub fn normal() -> Self {
        Self {
            mode: AdmissionMode::Normal,
            restricted_backend_ids: BTreeSet::new(),
            updated_at: Utc::now(),
        }
    }

    /// Whether `backend_id` may receive a request under this snapshot.
    pub fn is_allowed(&self, backend_id: &str, force_big: bool) -> bool {
        match self.mode {
            AdmissionMode::Normal => true,
            AdmissionMode::Restricted => {
                force_big || !self.restricted_backend_ids.contains(backend_id)
            }
        }
    }
}

impl Default for AdmissionState {
    fn default() -> Self {
        Self::normal()
    }
}

/// Single-writer, many-reader holder of the current [`AdmissionState`].
///
/// Readers clone the inner `Arc` and work against that snapshot for a whole
/// routing decision; writers swap in a fresh state under the write lock.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
/// use switchyard::admission::{AdmissionController, AdmissionMode};
/// use switchyard::registry::{Backend, BackendClass, BackendKind, BackendType, Registry};
///
/// let registry = Registry::new();
/// registry.add_backend(Backend::new(
///     "gpu-big".into(), "gpu-big".into(), "http://localhost:8001".into(),
///     BackendType::OpenAI, BackendKind::LocalAccelerator, BackendClass::Capacity,
/// )).unwrap();
///
/// let admission = AdmissionController::new();
/// admission
///     .set_mode(AdmissionMode::Restricted, Some(BTreeSet::from(["gpu-big".to_string()])), &registry)
///     .unwrap();
///
/// assert!(!admission.is_allowed("gpu-big", false));
/// assert!(admission.is_allowed("gpu-big", true));
/// ```
pub struct AdmissionController {
    state: RwLock<Arc<AdmissionState>>,
}

impl AdmissionController {
    pub fn new() -> Self {
        Self::with_state(AdmissionState::normal())
    }

    /// Initial state from `[admission]`. Backend names are checked by
    /// config validation, not here.
    pub fn from_config(config: &AdmissionConfig) -> Self {
        Self::with_state(AdmissionState {
            mode: config.mode,
            restricted_backend_ids: config.restricted_backends.iter().cloned().collect(),
            updated_at: Utc::now(),
        })
    }

    pub fn with_state(state: AdmissionState) -> Self {
        Self {
            state: RwLock::new(Arc::new(state)),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<AdmissionState> {
        let guard = self
            .state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Convenience check against a fresh snapshot.
    pub fn is_allowed(&self, backend_id: &str, force_big: bool) -> bool {
        self.snapshot().is_allowed(backend_id, force_big)
    }

    /// Administrative toggle.
    ///
    /// `restricted_backend_ids = None` keeps the current set. Every id is
    /// validated against the registry; restricted mode needs a non-empty set.
    pub fn set_mode(
        &self,
        mode: AdmissionMode,
        restricted_backend_ids: Option<BTreeSet<String>>,
        registry: &Registry,
    ) -> Result<Arc<AdmissionState>, AdmissionError> {
        let mut guard = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let restricted =
            restricted_backend_ids.unwrap_or_else(|| guard.restricted_backend_ids.clone());

        if let Some(unknown) = restricted
            .iter()
            .find(|id| registry.get_backend(id).is_none())
        {
            return Err(AdmissionError::UnknownBackend(unknown.clone()));
        }
        if mode == AdmissionMode::Restricted && restricted.is_empty() {
            return Err(AdmissionError::EmptyRestrictedSet);
        }

        let next = Arc::new(AdmissionState {
            mode,
            restricted_backend_ids: restricted,
            updated_at: Utc::now(),
        });
        *guard = Arc::clone(&next);

        tracing::info!(
            mode = ?next.mode,
            restricted = ?next.restricted_backend_ids,
            "Admission mode changed"
        );

        Ok(next)
    }
}

impl Default for AdmissionController {
    fn default() -> Self {
        Self::new()
    }
}
