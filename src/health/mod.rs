//! Health monitoring for registered backends.
//!
//! One probe loop per backend keeps that backend's [`HealthRecord`]
//! current. The router never waits on a probe; it reads whatever record was
//! last committed.
//!
//! [`HealthRecord`]: crate::registry::HealthRecord

mod config;
mod error;
mod state;


pub use config::*;
pub use error::*;
pub use state::*;

use crate::agent::HealthStatus;
use crate::registry::{Backend, Registry};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Background service that periodically probes backend health.
pub struct HealthMonitor {
    registry: Arc<Registry>,
    config: HealthCheckConfig,
}

impl HealthMonitor {
    pub fn new(registry: Arc<Registry>, config: HealthCheckConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &HealthCheckConfig {
        &self.config
    }

    /// Probe one backend through its agent, bounded by `timeout_seconds`.
    pub async fn probe(&self, backend: &Backend) -> ProbeResult {
        let Some(agent) = self.registry.get_agent(&backend.id) else {
            return ProbeResult::Failure {
                error: HealthCheckError::NoAgent,
            };
        };

        let start = Instant::now();
        let deadline = Duration::from_secs(self.config.timeout_seconds);

        let outcome = tokio::time::timeout(deadline, agent.health_check()).await;
        let latency_ms = start.elapsed().as_millis() as u32;

        metrics::histogram!("switchyard_probe_latency_seconds",
            "backend" => backend.id.clone()
        )
        .record(latency_ms as f64 / 1000.0);

        match outcome {
            Ok(Ok(HealthStatus::Healthy { .. })) => ProbeResult::Success { latency_ms },
            Ok(Ok(HealthStatus::Unhealthy)) => ProbeResult::Failure {
                error: HealthCheckError::ReportedUnhealthy,
            },
            Ok(Err(e)) => ProbeResult::Failure {
                error: HealthCheckError::from_agent_error(e),
            },
            Err(_) => ProbeResult::Failure {
                error: HealthCheckError::Timeout(self.config.timeout_seconds),
            },
        }
    }

    /// Commit a probe result to the backend's health record.
    ///
    /// Returns the transition, if the probe flipped the backend.
    pub fn apply_result(&self, backend_id: &str, result: &ProbeResult) -> Option<HealthTransition> {
        let backend = self.registry.get_backend(backend_id)?;

        let mut record = backend.health();
        let transition = apply_probe(
            &mut record,
            result,
            self.config.failure_threshold,
            chrono::Utc::now(),
        );

        if let ProbeResult::Failure { error } = result {
            tracing::warn!(
                backend_id = backend_id,
                consecutive_failures = record.consecutive_failures,
                error = %error,
                "Health probe failed"
            );
        }

        let is_healthy = record.is_healthy;
        backend.set_health(record);

        metrics::gauge!("switchyard_backend_healthy", "backend" => backend_id.to_string())
            .set(if is_healthy { 1.0 } else { 0.0 });

        if let Some(transition) = transition {
            tracing::info!(
                backend_id = backend_id,
                transition = ?transition,
                "Backend health changed"
            );
        }

        transition
    }

    /// Probe and commit a single backend.
    pub async fn check_backend(&self, backend: &Backend) -> ProbeResult {
        let result = self.probe(backend).await;
        self.apply_result(&backend.id, &result);
        result
    }

    /// Probe every registered backend once, concurrently.
    pub async fn check_all_backends(&self) -> Vec<(String, ProbeResult)> {
        let backends = self.registry.list();
        let checks = backends.iter().map(|backend| async move {
            let result = self.check_backend(backend).await;
            (backend.id.clone(), result)
        });
        futures::future::join_all(checks).await
    }

    /// Start one probe loop per registered backend.
    ///
    /// Returns a JoinHandle that resolves when every loop has observed the
    /// cancellation token.
    pub fn start(self, cancel_token: CancellationToken) -> JoinHandle<()> {
        let monitor = Arc::new(self);

        tokio::spawn(async move {
            let interval = Duration::from_secs(monitor.config.interval_seconds.max(1));
            let backends = monitor.registry.list();

            tracing::info!(
                interval_seconds = monitor.config.interval_seconds,
                backends = backends.len(),
                "Health monitor started"
            );

            let loops: Vec<_> = backends
                .into_iter()
                .map(|backend| {
                    let monitor = Arc::clone(&monitor);
                    let cancel = cancel_token.clone();
                    tokio::spawn(async move {
                        monitor.probe_loop(backend, interval, cancel).await;
                    })
                })
                .collect();

            futures::future::join_all(loops).await;
            tracing::info!("Health monitor shutting down");
        })
    }

    async fn probe_loop(&self, backend: Arc<Backend>, period: Duration, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let result = self.check_backend(&backend).await;
                    tracing::trace!(
                        backend_id = %backend.id,
                        success = result.is_success(),
                        "Probe completed"
                    );
                }
            }
        }
    }
}
