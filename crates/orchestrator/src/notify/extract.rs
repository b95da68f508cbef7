#![forbid(unsafe_code)]

//! Typed, lenient views over the `data` payload of each category.
//!
//! A view is `None` when its category is missing or the payload lacks the
//! field the view is built around. Inside a view, individual bad entries are
//! skipped and bad scalars fall back to their defaults.

use crate::domain::Snapshot;
use probes::{Category, CheckResult, CheckStatus, MAX_RULES};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_with::{DefaultOnError, DisplayFromStr, PickFirst, VecSkipError, serde_as};
use std::{collections::BTreeSet, fmt, net::IpAddr};

pub trait Extract: Sized {
    const CATEGORY: Category;

    fn from_result(result: &CheckResult) -> Option<Self>;

    fn from_snapshot(snapshot: &Snapshot) -> Option<Self> {
        snapshot.get(Self::CATEGORY).and_then(Self::from_result)
    }
}

fn parse<T: DeserializeOwned>(result: &CheckResult) -> Option<T> {
    T::deserialize(&result.data).ok()
}

fn clean_strings(items: &[String]) -> BTreeSet<String> {
    items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Source addresses of recent logins (`logs.data.ips`).
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LoginSources {
    #[serde_as(as = "VecSkipError<_>")]
    ips: Vec<String>,
}

impl LoginSources {
    /// Non-empty addresses, without the unspecified `0.0.0.0`/`::`.
    pub fn addresses(&self) -> BTreeSet<String> {
        clean_strings(&self.ips)
            .into_iter()
            .filter(|ip| !ip.parse::<IpAddr>().is_ok_and(|ip| ip.is_unspecified()))
            .collect()
    }
}

impl Extract for LoginSources {
    const CATEGORY: Category = Category::Logs;

    fn from_result(result: &CheckResult) -> Option<Self> {
        parse(result)
    }
}

/// One listening socket, the unit of the port fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Socket {
    pub proto: String,
    pub ip: String,
    pub port: u16,
}

impl fmt::Display for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ip.contains(':') {
            write!(f, "[{}]:{} {}", self.ip, self.port, self.proto)
        } else {
            write!(f, "{}:{} {}", self.ip, self.port, self.proto)
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
struct RawSocket {
    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    proto: String,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    ip: String,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    port: u64,
}

/// Listening sockets (`ports.data.entries`).
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortsData {
    #[serde_as(as = "VecSkipError<_>")]
    entries: Vec<RawSocket>,
}

impl PortsData {
    /// Sockets with a protocol and a real port; protocols are lowercased.
    pub fn sockets(&self) -> BTreeSet<Socket> {
        self.entries
            .iter()
            .filter_map(|entry| {
                let proto = entry.proto.trim().to_ascii_lowercase();
                let port = u16::try_from(entry.port).ok().filter(|port| *port > 0)?;
                (!proto.is_empty()).then(|| Socket {
                    proto,
                    ip: entry.ip.trim().to_string(),
                    port,
                })
            })
            .collect()
    }
}

impl Extract for PortsData {
    const CATEGORY: Category = Category::Ports;

    fn from_result(result: &CheckResult) -> Option<Self> {
        parse(result)
    }
}

/// Members of privileged groups (`users.data.sudo_users`).
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsersData {
    #[serde_as(as = "VecSkipError<_>")]
    sudo_users: Vec<String>,
}

impl UsersData {
    pub fn users(&self) -> BTreeSet<String> {
        clean_strings(&self.sudo_users)
    }
}

impl Extract for UsersData {
    const CATEGORY: Category = Category::Users;

    fn from_result(result: &CheckResult) -> Option<Self> {
        parse(result)
    }
}

/// Pending upgrades (`updates.data.count`, `updates.data.packages`).
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatesData {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub count: u64,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError<VecSkipError<_>>")]
    pub packages: Vec<String>,
}

impl Extract for UpdatesData {
    const CATEGORY: Category = Category::Updates;

    fn from_result(result: &CheckResult) -> Option<Self> {
        parse(result)
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawAuthCounters {
    #[serde_as(as = "DefaultOnError")]
    failed_total: u64,
    #[serde_as(as = "DefaultOnError")]
    failed_root: u64,
    #[serde_as(as = "DefaultOnError")]
    invalid_user: u64,
}

/// Severity of the auth log plus the counters behind it. The view needs the
/// `failed_total` counter, so a degraded `logs` record yields `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthLog {
    pub status: CheckStatus,
    pub failed_total: u64,
    pub failed_root: u64,
    pub invalid_user: u64,
}

impl Extract for AuthLog {
    const CATEGORY: Category = Category::Logs;

    fn from_result(result: &CheckResult) -> Option<Self> {
        result.data.get("failed_total")?;
        let counters: RawAuthCounters = parse(result).unwrap_or_default();
        Some(Self {
            status: result.status,
            failed_total: counters.failed_total,
            failed_root: counters.failed_root,
            invalid_user: counters.invalid_user,
        })
    }
}

/// Firewall backend, state and rule list (`firewall.data`).
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FirewallData {
    #[serde_as(as = "DefaultOnError")]
    pub backend: String,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError")]
    pub enabled: Option<bool>,
    #[serde(default)]
    #[serde_as(as = "DefaultOnError<VecSkipError<_>>")]
    rules: Vec<String>,
}

impl FirewallData {
    /// At most [`MAX_RULES`] distinct rules, sorted.
    pub fn rules(&self) -> BTreeSet<String> {
        clean_strings(&self.rules).into_iter().take(MAX_RULES).collect()
    }
}

impl Extract for FirewallData {
    const CATEGORY: Category = Category::Firewall;

    fn from_result(result: &CheckResult) -> Option<Self> {
        parse(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ok(data: serde_json::Value) -> CheckResult {
        CheckResult::new(CheckStatus::Ok, "", data)
    }

    #[test]
    fn login_sources_skip_junk() {
        let view =
            LoginSources::from_result(&ok(json!({ "ips": ["1.2.3.4", 7, "", "0.0.0.0", "::"] })))
                .unwrap();
        assert_eq!(view.addresses(), BTreeSet::from(["1.2.3.4".to_string()]));
    }

    #[test]
    fn ports_need_protocol_and_port() {
        let view = PortsData::from_result(&ok(json!({ "entries": [
            { "proto": "TCP", "ip": "0.0.0.0", "port": 22 },
            { "proto": "udp", "ip": "::", "port": "53" },
            { "proto": "", "ip": "0.0.0.0", "port": 80 },
            { "proto": "tcp", "ip": "0.0.0.0", "port": 0 },
            { "proto": "tcp", "ip": "0.0.0.0", "port": 70000 },
            "garbage",
        ]})))
        .unwrap();
        let sockets: Vec<_> = view.sockets().into_iter().map(|s| s.to_string()).collect();
        assert_eq!(sockets, vec!["0.0.0.0:22 tcp"]);
    }

    #[test]
    fn missing_key_means_no_view() {
        let degraded = CheckResult::new(
            CheckStatus::Warn,
            "probe_failed",
            json!({ "error": "boom" }),
        );
        assert!(PortsData::from_result(&degraded).is_none());
        assert!(UsersData::from_result(&degraded).is_none());
        assert!(UpdatesData::from_result(&degraded).is_none());
        assert!(LoginSources::from_result(&degraded).is_none());
        assert!(FirewallData::from_result(&degraded).is_none());
        assert!(AuthLog::from_result(&degraded).is_none());
        assert!(PortsData::from_result(&ok(serde_json::Value::Null)).is_none());
    }

    #[test]
    fn update_count_accepts_strings() {
        let view =
            UpdatesData::from_result(&ok(json!({ "count": "4", "packages": "oops" }))).unwrap();
        assert_eq!(view.count, 4);
        assert!(view.packages.is_empty());
        assert!(UpdatesData::from_result(&ok(json!({ "count": -1 }))).is_none());
    }

    #[test]
    fn auth_log_tolerates_bad_counters() {
        let result = CheckResult::new(
            CheckStatus::Crit,
            "",
            json!({ "failed_total": "many", "failed_root": 2 }),
        );
        let view = AuthLog::from_result(&result).unwrap();
        assert_eq!(view.status, CheckStatus::Crit);
        assert_eq!(view.failed_total, 0);
        assert_eq!(view.failed_root, 2);
    }

    #[test]
    fn firewall_rules_are_deduplicated() {
        let view = FirewallData::from_result(&ok(json!({
            "backend": "ufw",
            "enabled": "yes",
            "rules": ["22/tcp ALLOW", "22/tcp ALLOW", 5, "80 ALLOW"],
        })))
        .unwrap();
        assert_eq!(view.enabled, None);
        assert_eq!(view.rules().len(), 2);
    }
}
