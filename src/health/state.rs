//! Health record state machine.

use super::error::HealthCheckError;
use crate::registry::HealthRecord;
use chrono::{DateTime, Utc};

/// Outcome of one probe.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeResult {
    Success { latency_ms: u32 },
    Failure { error: HealthCheckError },
}

impl ProbeResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeResult::Success { .. })
    }
}

/// A healthy/unhealthy flip caused by a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthTransition {
    BecameHealthy,
    BecameUnhealthy,
}

/// Fold a probe result into a health record.
///
/// One success restores health. Failures accumulate and flip the backend
/// unhealthy once `failure_threshold` is reached. Returns the transition,
/// if any.
pub fn apply_probe(
    record: &mut HealthRecord,
    result: &ProbeResult,
    failure_threshold: u32,
    now: DateTime<Utc>,
) -> Option<HealthTransition> {
    let was_healthy = record.is_healthy;
    record.last_checked_at = Some(now);

    match result {
        ProbeResult::Success { latency_ms } => {
            record.consecutive_failures = 0;
            record.is_healthy = true;
            record.last_latency_ms = Some(*latency_ms);
            record.last_error = None;
        }
        ProbeResult::Failure { error } => {
            record.consecutive_failures = record.consecutive_failures.saturating_add(1);
            record.last_error = Some(error.to_string());
            if record.consecutive_failures >= failure_threshold {
                record.is_healthy = false;
            }
        }
    }

    match (was_healthy, record.is_healthy) {
        (false, true) => Some(HealthTransition::BecameHealthy),
        (true, false) => Some(HealthTransition::BecameUnhealthy),
        _ => None,
    }
}
