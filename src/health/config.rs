//! Configuration for health checking.

use serde::{Deserialize, Serialize};

/// Configuration for backend health probing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Whether background probing runs at all
    pub enabled: bool,
    /// Seconds between probes of one backend
    pub interval_seconds: u64,
    /// Deadline for each probe
    pub timeout_seconds: u64,
    /// Consecutive failures before a backend is marked unhealthy
    pub failure_threshold: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 10,
            timeout_seconds: 5,
            failure_threshold: 3,
        }
    }
}
