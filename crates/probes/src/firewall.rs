use crate::{Category, CheckResult, CheckStatus, Error, Probe, utils::run_command};
use serde_json::json;
use std::{collections::BTreeSet, path::Path};

/// Rule lists longer than this are truncated.
pub const MAX_RULES: usize = 200;

/// Firewall state from `ufw` or, failing that, `firewalld`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirewallProbe;

impl Probe for FirewallProbe {
    fn category(&self) -> Category {
        Category::Firewall
    }

    fn run(&self) -> Result<CheckResult, Error> {
        if Path::new("/usr/sbin/ufw").exists() {
            let status = run_command("ufw", &["status"])?;
            let numbered = run_command("ufw", &["status", "numbered"])?;
            let reading = FirewallReading {
                backend: "ufw",
                enabled: parse_ufw_enabled(&status.stdout),
                rules: parse_ufw_rules(&numbered.stdout),
            };
            Ok(reading.into_result(json!({
                "status": status.stdout.trim(),
                "rules": numbered.stdout.trim(),
            })))
        } else if Path::new("/usr/bin/firewall-cmd").exists() {
            let state = run_command("firewall-cmd", &["--state"])?;
            let list_all = run_command("firewall-cmd", &["--list-all"])?;
            let state_text = state.stdout.trim().to_ascii_lowercase();
            let reading = FirewallReading {
                backend: "firewalld",
                enabled: Some(state_text == "running"),
                rules: parse_firewalld_rules(&list_all.stdout),
            };
            Ok(reading.into_result(json!({
                "state": state_text,
                "list_all": list_all.stdout.trim(),
            })))
        } else {
            Ok(CheckResult::new(
                CheckStatus::Warn,
                "firewall_unsupported",
                json!({ "backend": "none" }),
            ))
        }
    }
}

struct FirewallReading {
    backend: &'static str,
    enabled: Option<bool>,
    rules: BTreeSet<String>,
}

impl FirewallReading {
    fn into_result(self, raw: serde_json::Value) -> CheckResult {
        let status = match self.enabled {
            Some(true) => CheckStatus::Ok,
            Some(false) => CheckStatus::Crit,
            None => CheckStatus::Warn,
        };
        let state = match self.enabled {
            Some(true) => "active",
            Some(false) => "inactive",
            None => "unknown",
        };
        let rules: Vec<String> = self.rules.into_iter().take(MAX_RULES).collect();

        CheckResult::new(
            status,
            format!("{} {state} rules={}", self.backend, rules.len()),
            json!({
                "backend": self.backend,
                "enabled": self.enabled,
                "rules": rules,
                "raw": raw,
            }),
        )
    }
}

pub fn parse_ufw_enabled(status: &str) -> Option<bool> {
    if status.contains("Status: active") {
        Some(true)
    } else if status.contains("Status: inactive") {
        Some(false)
    } else {
        None
    }
}

/// `[ 1] 22/tcp (v6)   ALLOW IN    Anywhere (v6)` becomes `22/tcp (v6) ALLOW`.
pub fn parse_ufw_rules(numbered: &str) -> BTreeSet<String> {
    numbered
        .lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix('[')?.split_once(']')?.1;
            let mut tokens = rest.split_whitespace().peekable();
            let mut to = tokens.next()?.to_string();
            if tokens.peek() == Some(&"(v6)") {
                tokens.next();
                to.push_str(" (v6)");
            }
            let action = tokens.next()?;
            Some(format!("{to} {action}"))
        })
        .collect()
}

/// `services:` entries become `service:<name>`, `ports:` entries are kept.
pub fn parse_firewalld_rules(list_all: &str) -> BTreeSet<String> {
    let mut rules = BTreeSet::new();
    for line in list_all.lines() {
        let line = line.trim();
        if let Some(services) = line.strip_prefix("services:") {
            rules.extend(services.split_whitespace().map(|s| format!("service:{s}")));
        } else if let Some(ports) = line.strip_prefix("ports:") {
            rules.extend(ports.split_whitespace().map(str::to_owned));
        }
    }
    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    const UFW_NUMBERED: &str = "\
Status: active

     To                         Action      From
     --                         ------      ----
[ 1] 22/tcp                     ALLOW IN    Anywhere
[ 2] 443                        ALLOW IN    10.0.0.0/8
[10] 22/tcp (v6)                ALLOW IN    Anywhere (v6)
";

    #[test]
    fn parses_ufw() {
        assert_eq!(parse_ufw_enabled("Status: active\n"), Some(true));
        assert_eq!(parse_ufw_enabled("Status: inactive\n"), Some(false));
        assert_eq!(parse_ufw_enabled("ERROR: need root"), None);

        let rules: Vec<_> = parse_ufw_rules(UFW_NUMBERED).into_iter().collect();
        assert_eq!(rules, vec!["22/tcp (v6) ALLOW", "22/tcp ALLOW", "443 ALLOW"]);
    }

    #[test]
    fn parses_firewalld() {
        let list_all = "\
public (active)
  target: default
  services: ssh dhcpv6-client
  ports: 8080/tcp 53/udp
  protocols:
";
        let rules: Vec<_> = parse_firewalld_rules(list_all).into_iter().collect();
        assert_eq!(
            rules,
            vec!["53/udp", "8080/tcp", "service:dhcpv6-client", "service:ssh"]
        );
    }

    #[test]
    fn disabled_firewall_is_critical() {
        let result = FirewallReading {
            backend: "ufw",
            enabled: Some(false),
            rules: BTreeSet::new(),
        }
        .into_result(json!({}));
        assert_eq!(result.status, CheckStatus::Crit);
        assert_eq!(result.details, "ufw inactive rules=0");
        assert_eq!(result.data["enabled"], false);
    }
}
