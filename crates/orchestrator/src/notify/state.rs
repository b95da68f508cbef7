#![forbid(unsafe_code)]

use crate::notify::extract::Socket;
use probes::CheckStatus;
use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnError, serde_as};
use std::collections::BTreeSet;

/// Last observed firewall condition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallFingerprint {
    pub backend: String,
    pub enabled: Option<bool>,
    pub rules: BTreeSet<String>,
}

/// Suppression memory of the notification engine, one slice per detector.
///
/// `None` means nothing was observed yet. A detector seeing `None` adopts the
/// current value without alerting. An unreadable slice is read back as
/// `None`, leaving the other slices intact.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationState {
    #[serde_as(as = "DefaultOnError")]
    pub ips: Option<BTreeSet<String>>,
    #[serde_as(as = "DefaultOnError")]
    pub ports: Option<BTreeSet<Socket>>,
    #[serde_as(as = "DefaultOnError")]
    pub sudo_users: Option<BTreeSet<String>>,
    #[serde_as(as = "DefaultOnError")]
    pub updates_count: Option<u64>,
    #[serde_as(as = "DefaultOnError")]
    pub logs_status: Option<CheckStatus>,
    #[serde_as(as = "DefaultOnError")]
    pub firewall: Option<FirewallFingerprint>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bad_slices_do_not_poison_the_rest() {
        let state: NotificationState = serde_json::from_value(json!({
            "ips": "not-a-list",
            "updates_count": 3,
            "logs_status": "crit",
            "unknown": true,
        }))
        .unwrap();

        assert_eq!(state.ips, None);
        assert_eq!(state.updates_count, Some(3));
        assert_eq!(state.logs_status, Some(CheckStatus::Crit));
        assert_eq!(state.firewall, None);
    }

    #[test]
    fn roundtrips_through_json() {
        let state = NotificationState {
            ports: Some(BTreeSet::from([Socket {
                proto: "tcp".into(),
                ip: "0.0.0.0".into(),
                port: 22,
            }])),
            firewall: Some(FirewallFingerprint {
                backend: "ufw".into(),
                enabled: Some(true),
                rules: BTreeSet::from(["22/tcp ALLOW".to_string()]),
            }),
            ..Default::default()
        };
        let text = serde_json::to_string(&state).unwrap();
        assert_eq!(serde_json::from_str::<NotificationState>(&text).unwrap(), state);
    }
}
