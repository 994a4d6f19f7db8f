//! # Metrics
//!
//! Prometheus exposition at `GET /metrics`.
//!
//! ## Metrics Tracked
//!
//! **Counters:**
//! - `switchyard_route_total{backend, outcome}` - Routing decisions
//! - `switchyard_jobs_total{status}` - Job status transitions
//! - `switchyard_job_steps_total{action}` - Job steps recorded
//!
//! **Histograms:**
//! - `switchyard_request_duration_seconds{backend}` - Completion duration
//! - `switchyard_probe_latency_seconds{backend}` - Health probe latency
//!
//! **Gauges:**
//! - `switchyard_backends_total` - Registered backends
//! - `switchyard_backends_healthy` - Healthy backends
//! - `switchyard_backend_in_flight{backend}` - Leased slots per backend
//! - `switchyard_backend_healthy{backend}` - 1 when healthy, 0 otherwise

pub mod handler;

use crate::registry::Registry;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Latency buckets in seconds, sized for LLM inference.
const DURATION_BUCKETS: &[f64] = &[
    0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0,
];

/// Computes fleet gauges on scrape and renders the exporter output.
pub struct MetricsCollector {
    registry: Arc<Registry>,
    start_time: Instant,
    prometheus_handle: PrometheusHandle,
}

impl MetricsCollector {
    pub fn new(
        registry: Arc<Registry>,
        start_time: Instant,
        prometheus_handle: PrometheusHandle,
    ) -> Self {
        Self {
            registry,
            start_time,
            prometheus_handle,
        }
    }

    /// Refresh gauges derived from the registry.
    pub fn update_fleet_gauges(&self) {
        let backends = self.registry.list();
        let healthy = backends.iter().filter(|b| b.is_healthy()).count();

        metrics::gauge!("switchyard_backends_total").set(backends.len() as f64);
        metrics::gauge!("switchyard_backends_healthy").set(healthy as f64);

        for backend in &backends {
            metrics::gauge!("switchyard_backend_in_flight", "backend" => backend.id.clone())
                .set(backend.in_flight() as f64);
            metrics::gauge!("switchyard_backend_healthy", "backend" => backend.id.clone())
                .set(if backend.is_healthy() { 1.0 } else { 0.0 });
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn render_metrics(&self) -> String {
        self.prometheus_handle.render()
    }
}

/// Install the global Prometheus recorder once and return its handle.
///
/// Later calls return the same handle. If another recorder is already
/// installed (tests, embedding applications) a detached handle is returned
/// and renders nothing recorded through the `metrics` macros.
pub fn prometheus_handle() -> PrometheusHandle {
    HANDLE
        .get_or_init(|| {
            setup_metrics().unwrap_or_else(|e| {
                tracing::debug!(error = %e, "Metrics recorder already installed");
                PrometheusBuilder::new().build_recorder().handle()
            })
        })
        .clone()
}

fn setup_metrics() -> Result<PrometheusHandle, Box<dyn std::error::Error>> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("switchyard_request_duration_seconds".to_string()),
            DURATION_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full("switchyard_probe_latency_seconds".to_string()),
            DURATION_BUCKETS,
        )?
        .install_recorder()?;
    Ok(handle)
}
