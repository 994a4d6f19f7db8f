//! Backend Registry module.
//!
//! Provides thread-safe in-memory storage and querying of inference backends,
//! their agents, and their capacity counters.

mod backend;
mod error;

pub use backend::*;
pub use error::*;

use crate::agent::InferenceAgent;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// The Backend Registry stores all known inference backends.
///
/// Uses concurrent maps (DashMap) so unrelated routing decisions never
/// serialize on a global lock. Capacity accounting lives on each
/// [`Backend`]; the registry only forwards to it.
///
/// # Examples
///
/// ```
/// use switchyard::registry::{Backend, BackendClass, BackendKind, BackendType, Registry};
///
/// let registry = Registry::new();
/// let backend = Backend::new(
///     "gpu-small".to_string(),
///     "GPU small".to_string(),
///     "http://localhost:11434".to_string(),
///     BackendType::Ollama,
///     BackendKind::LocalAccelerator,
///     BackendClass::Fast,
/// )
/// .with_models(vec!["llama3:8b".to_string()]);
///
/// registry.add_backend(backend).unwrap();
/// assert_eq!(registry.backend_count(), 1);
/// assert_eq!(registry.backends_for_model("llama3:8b").len(), 1);
/// ```
pub struct Registry {
    backends: DashMap<String, Arc<Backend>>,
    model_index: DashMap<String, Vec<String>>,
    agents: DashMap<String, Arc<dyn InferenceAgent>>,
}

impl Registry {
    /// Create a new empty Registry.
    pub fn new() -> Self {
        Self {
            backends: DashMap::new(),
            model_index: DashMap::new(),
            agents: DashMap::new(),
        }
    }

    /// Register a new backend.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateBackend` if a backend with the same ID already exists.
    pub fn add_backend(&self, backend: Backend) -> Result<Arc<Backend>, RegistryError> {
        let id = backend.id.clone();
        let backend = Arc::new(backend);

        // The vacant entry holds the shard lock until the backend is in place
        match self.backends.entry(id.clone()) {
            Entry::Occupied(_) => return Err(RegistryError::DuplicateBackend(id)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&backend));
            }
        }

        for model in &backend.models {
            self.model_index
                .entry(model.clone())
                .or_default()
                .push(id.clone());
        }
        Ok(backend)
    }

    /// Register a backend together with the agent used to reach it.
    pub fn add_backend_with_agent(
        &self,
        backend: Backend,
        agent: Arc<dyn InferenceAgent>,
    ) -> Result<Arc<Backend>, RegistryError> {
        let id = backend.id.clone();
        let backend = self.add_backend(backend)?;
        self.agents.insert(id, agent);
        Ok(backend)
    }

    /// Remove a backend, its agent, and its model index entries.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::BackendNotFound` if no backend with the given ID exists.
    pub fn remove_backend(&self, id: &str) -> Result<Arc<Backend>, RegistryError> {
        let backend = self
            .backends
            .remove(id)
            .map(|(_, backend)| backend)
            .ok_or_else(|| RegistryError::BackendNotFound(id.to_string()))?;

        for model in &backend.models {
            if let Some(mut backend_ids) = self.model_index.get_mut(model) {
                backend_ids.retain(|bid| bid != id);
                if backend_ids.is_empty() {
                    drop(backend_ids); // Release the shard lock before removing
                    self.model_index.remove(model);
                }
            }
        }
        self.agents.remove(id);

        Ok(backend)
    }

    /// Get a backend by ID.
    pub fn get_backend(&self, id: &str) -> Option<Arc<Backend>> {
        self.backends.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Get a backend by ID, failing with `BackendNotFound`.
    pub fn get(&self, id: &str) -> Result<Arc<Backend>, RegistryError> {
        self.get_backend(id)
            .ok_or_else(|| RegistryError::BackendNotFound(id.to_string()))
    }

    /// All backends, ordered by `(priority, id)`.
    pub fn list(&self) -> Vec<Arc<Backend>> {
        let mut backends: Vec<_> = self
            .backends
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        sort_by_priority(&mut backends);
        backends
    }

    /// Get the number of registered backends.
    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    /// Backends serving a specific model, ordered by `(priority, id)`.
    pub fn backends_for_model(&self, model_id: &str) -> Vec<Arc<Backend>> {
        let mut backends: Vec<_> = match self.model_index.get(model_id) {
            Some(backend_ids) => backend_ids
                .iter()
                .filter_map(|id| self.get_backend(id))
                .collect(),
            None => Vec::new(),
        };
        sort_by_priority(&mut backends);
        backends
    }

    /// Get the number of unique models across all backends.
    pub fn model_count(&self) -> usize {
        self.model_index.len()
    }

    /// Sorted list of every served model id.
    pub fn model_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.model_index.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Get the agent for a backend.
    pub fn get_agent(&self, id: &str) -> Option<Arc<dyn InferenceAgent>> {
        self.agents.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Atomically take a capacity slot on a backend.
    ///
    /// Returns `Ok(false)` when the backend is at `max_concurrent`.
    pub fn try_acquire(&self, id: &str) -> Result<bool, RegistryError> {
        Ok(self.get(id)?.try_acquire())
    }

    /// Give back a capacity slot (saturating at 0). Returns the new in-flight value.
    pub fn release(&self, id: &str) -> Result<u32, RegistryError> {
        Ok(self.get(id)?.release())
    }

    /// Replace a backend's health record.
    pub fn update_health(&self, id: &str, record: HealthRecord) -> Result<(), RegistryError> {
        self.get(id)?.set_health(record);
        Ok(())
    }

    /// Serializable views of all backends.
    pub fn views(&self) -> Vec<BackendView> {
        self.list().iter().map(|b| BackendView::from(b.as_ref())).collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable ordering used everywhere a backend list is presented or routed.
pub(crate) fn sort_by_priority(backends: &mut [Arc<Backend>]) {
    backends.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
}
