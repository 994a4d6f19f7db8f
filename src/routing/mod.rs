//! Backend selection.
//!
//! The router turns a [`RoutingRequest`] into an ordered candidate chain,
//! drops unhealthy and non-admitted backends, and hands back a
//! [`BackendLease`] on the first candidate with free capacity. For a fixed
//! alias, token estimate, admission snapshot, health and load the outcome is
//! always the same.

use std::collections::HashMap;
use std::sync::Arc;

pub mod alias;
pub mod error;
pub mod lease;
pub mod request;


pub use alias::ModelAlias;
pub use error::RoutingError;
pub use lease::BackendLease;
pub use request::{estimate_text_tokens, estimate_tokens, RoutingRequest};

use crate::admission::AdmissionController;
use crate::config::RoutingConfig;
use crate::registry::{Backend, BackendClass, BackendKind, Registry};

/// Router selects a backend for each request
pub struct Router {
    registry: Arc<Registry>,
    admission: Arc<AdmissionController>,
    config: RoutingConfig,
}

impl Router {
    pub fn new(
        registry: Arc<Registry>,
        admission: Arc<AdmissionController>,
        config: RoutingConfig,
    ) -> Self {
        Self {
            registry,
            admission,
            config,
        }
    }

    pub fn aliases(&self) -> &HashMap<String, String> {
        &self.config.aliases
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Ordered candidate chain for a request, before health, admission and
    /// capacity filtering. Acquires nothing.
    pub fn plan(&self, request: &RoutingRequest) -> Result<Vec<Arc<Backend>>, RoutingError> {
        match &request.alias {
            ModelAlias::Explicit(model) => {
                let backends = self.registry.backends_for_model(model);
                if backends.is_empty() {
                    return Err(RoutingError::ModelNotFound {
                        model: model.clone(),
                    });
                }
                Ok(backends)
            }
            ModelAlias::Class(class) => Ok(self
                .registry
                .list()
                .into_iter()
                .filter(|b| b.class == *class)
                .collect()),
            ModelAlias::Auto => {
                // Already ordered by (priority, id); filtering keeps that order.
                let all = self.registry.list();
                let local = |class: BackendClass| -> Vec<Arc<Backend>> {
                    all.iter()
                        .filter(|b| b.kind == BackendKind::LocalAccelerator && b.class == class)
                        .cloned()
                        .collect()
                };
                let cloud = all.iter().filter(|b| b.kind == BackendKind::Cloud).cloned();

                let small = request.estimated_tokens < self.config.small_context_threshold
                    && !request.force_big;

                let mut chain = Vec::with_capacity(all.len());
                if small {
                    chain.extend(local(BackendClass::Fast));
                }
                chain.extend(local(BackendClass::Capacity));
                chain.extend(cloud);
                Ok(chain)
            }
        }
    }

    /// Select a backend and take one capacity slot on it.
    pub fn route(&self, request: &RoutingRequest) -> Result<BackendLease, RoutingError> {
        let alias = request.alias.to_string();

        let candidates = self.plan(request).inspect_err(|e| {
            metrics::counter!("switchyard_route_total",
                "backend" => "none",
                "outcome" => e.outcome()
            )
            .increment(1);
        })?;

        let admission = self.admission.snapshot();
        let mut denied = Vec::new();
        let mut tried = Vec::new();

        for backend in candidates {
            if !backend.is_healthy() {
                tracing::trace!(backend_id = %backend.id, "Skipping unhealthy backend");
                continue;
            }
            if !admission.is_allowed(&backend.id, request.force_big) {
                denied.push(backend.id.clone());
                continue;
            }
            if backend.try_acquire() {
                tracing::debug!(
                    alias = %alias,
                    backend_id = %backend.id,
                    estimated_tokens = request.estimated_tokens,
                    force_big = request.force_big,
                    "Routed request"
                );
                metrics::counter!("switchyard_route_total",
                    "backend" => backend.id.clone(),
                    "outcome" => "selected"
                )
                .increment(1);
                return Ok(BackendLease::new(backend));
            }
            tried.push(backend.id.clone());
        }

        let err = if denied.is_empty() {
            RoutingError::NoBackendAvailable { alias, tried }
        } else {
            RoutingError::AdmissionDenied { alias, denied }
        };

        tracing::debug!(error = %err, "Routing failed");
        metrics::counter!("switchyard_route_total",
            "backend" => "none",
            "outcome" => err.outcome()
        )
        .increment(1);

        Err(err)
    }
}
