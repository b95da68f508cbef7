#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// Alert delivery policy.
///
/// `send_warning` and `send_critical` gate delivery only. Suppression state
/// advances regardless of them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Notifications {
    pub enabled: bool,
    pub send_warning: bool,
    pub send_critical: bool,

    /// New login source addresses in the auth log.
    pub new_ips: bool,
    /// Listening socket additions and removals.
    pub ports: bool,
    /// New members of privileged groups.
    pub sudo_users: bool,
    /// Pending package updates appearing.
    pub updates: bool,
    /// Auth log severity escalation.
    pub logs: bool,
    /// Firewall enable/disable and rule changes.
    pub firewall: bool,
}

impl Default for Notifications {
    fn default() -> Self {
        Self {
            enabled: false,
            send_warning: true,
            send_critical: true,
            new_ips: true,
            ports: true,
            sudo_users: true,
            updates: true,
            logs: true,
            firewall: true,
        }
    }
}
