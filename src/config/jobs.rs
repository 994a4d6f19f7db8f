//! Job executor configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Jobs running at once; the rest wait as pending
    pub max_concurrent_jobs: usize,
    /// Model turns allowed when a job does not set `max_turns`
    pub default_max_turns: u32,
    /// Pause between routing attempts while no backend is free
    pub route_retry_delay_ms: u64,
    /// Log a warning each time a turn has waited this long for a backend
    pub route_wait_warn_seconds: u64,
    /// Root for filesystem tools when a job does not set `working_directory`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_working_directory: Option<PathBuf>,
    /// Append-only JSON-lines journal of jobs and steps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal_path: Option<PathBuf>,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
            default_max_turns: 10,
            route_retry_delay_ms: 500,
            route_wait_warn_seconds: 30,
            default_working_directory: None,
            journal_path: None,
        }
    }
}
