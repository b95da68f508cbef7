#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// Which categories are collected and shown to the operator.
///
/// The notification engine may force additional probes on; see
/// `orchestrator::required_categories`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Checks {
    pub ports: bool,
    pub ssh: bool,
    pub firewall: bool,
    pub users: bool,
    pub logs: bool,
    pub updates: bool,
}

impl Default for Checks {
    fn default() -> Self {
        Self {
            ports: true,
            ssh: true,
            firewall: false,
            users: false,
            logs: false,
            updates: false,
        }
    }
}
