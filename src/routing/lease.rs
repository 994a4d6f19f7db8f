//! Capacity lease returned by the router.

use crate::registry::Backend;
use std::sync::Arc;

/// One acquired capacity slot on a backend.
///
/// The slot is given back exactly once: by [`BackendLease::release`] or,
/// failing that, when the lease is dropped.
#[derive(Debug)]
pub struct BackendLease {
    backend: Arc<Backend>,
    released: bool,
}

impl BackendLease {
    /// Wrap a slot that was already taken with `try_acquire`.
    pub(crate) fn new(backend: Arc<Backend>) -> Self {
        metrics::gauge!("switchyard_backend_in_flight", "backend" => backend.id.clone())
            .set(backend.in_flight() as f64);
        Self {
            backend,
            released: false,
        }
    }

    pub fn backend(&self) -> &Arc<Backend> {
        &self.backend
    }

    pub fn backend_id(&self) -> &str {
        &self.backend.id
    }

    /// Give the slot back now.
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let in_flight = self.backend.release();
        metrics::gauge!("switchyard_backend_in_flight", "backend" => self.backend.id.clone())
            .set(in_flight as f64);
        tracing::trace!(backend_id = %self.backend.id, in_flight, "Lease released");
    }
}

impl Drop for BackendLease {
    fn drop(&mut self) {
        self.release_once();
    }
}
