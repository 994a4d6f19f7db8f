//! Admission configuration

use crate::admission::AdmissionMode;
use serde::{Deserialize, Serialize};

/// Initial admission state applied at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AdmissionConfig {
    pub mode: AdmissionMode,
    /// Backend names fenced off while in restricted mode
    pub restricted_backends: Vec<String>,
    /// When set, `force_big` and `@big` only count for callers holding the
    /// admin token
    pub require_admin_for_force: bool,
}
