use crate::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

/// One security-state dimension of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Ports,
    Ssh,
    Firewall,
    Users,
    Logs,
    Updates,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Ports,
        Category::Ssh,
        Category::Firewall,
        Category::Users,
        Category::Logs,
        Category::Updates,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Ports => "ports",
            Category::Ssh => "ssh",
            Category::Firewall => "firewall",
            Category::Users => "users",
            Category::Logs => "logs",
            Category::Updates => "updates",
        }
    }

    /// Categories the operator switched on in `[checks]`.
    pub fn enabled_in(checks: &config::Checks) -> Vec<Category> {
        Self::ALL
            .into_iter()
            .filter(|category| match category {
                Category::Ports => checks.ports,
                Category::Ssh => checks.ssh,
                Category::Firewall => checks.firewall,
                Category::Users => checks.users,
                Category::Logs => checks.logs,
                Category::Updates => checks.updates,
            })
            .collect()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Warn,
    Crit,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Ok => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Crit => "crit",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one probe run. `data` is category specific and opaque to
/// everything except the notification extractors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub status: CheckStatus,
    pub details: String,
    #[serde(default)]
    pub data: Value,
}

impl CheckResult {
    pub fn new(status: CheckStatus, details: impl Into<String>, data: Value) -> Self {
        Self {
            status,
            details: details.into(),
            data,
        }
    }

    /// Stand-in for a category whose probe failed, so the category stays
    /// visible in the snapshot.
    pub fn degraded(err: &Error) -> Self {
        let details = match err {
            Error::Timeout(_) => "probe_timeout",
            _ => "probe_failed",
        };
        Self::new(CheckStatus::Warn, details, json!({ "error": err.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn category_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Category::Firewall).unwrap(), "\"firewall\"");
        let parsed: Category = serde_json::from_str("\"updates\"").unwrap();
        assert_eq!(parsed, Category::Updates);
    }

    #[test]
    fn enabled_in_follows_flags() {
        let checks = config::Checks {
            ports: false,
            ssh: true,
            firewall: false,
            users: true,
            logs: false,
            updates: false,
        };
        assert_eq!(
            Category::enabled_in(&checks),
            vec![Category::Ssh, Category::Users]
        );
    }

    #[test]
    fn degraded_result_names_the_failure() {
        let result = CheckResult::degraded(&Error::Timeout(Duration::from_secs(3)));
        assert_eq!(result.status, CheckStatus::Warn);
        assert_eq!(result.details, "probe_timeout");
        assert!(result.data["error"].as_str().unwrap().contains("timed out"));
    }

    #[test]
    fn missing_data_defaults_to_null() {
        let result: CheckResult =
            serde_json::from_str(r#"{"status":"ok","details":"x"}"#).unwrap();
        assert_eq!(result.data, Value::Null);
    }
}
