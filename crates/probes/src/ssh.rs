use crate::{Category, CheckResult, CheckStatus, Error, Probe};
use serde::Serialize;
use serde_json::json;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Directives worth reporting. Everything else in the file is ignored.
const KEYS: [&str; 12] = [
    "Port",
    "PermitRootLogin",
    "PasswordAuthentication",
    "PubkeyAuthentication",
    "ChallengeResponseAuthentication",
    "UsePAM",
    "KbdInteractiveAuthentication",
    "AuthenticationMethods",
    "AllowUsers",
    "AllowGroups",
    "DenyUsers",
    "DenyGroups",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Directive {
    Single(String),
    Repeated(Vec<String>),
}

/// Security-relevant settings of the SSH daemon.
#[derive(Debug, Clone)]
pub struct SshProbe {
    path: PathBuf,
}

impl Default for SshProbe {
    fn default() -> Self {
        Self::new("/etc/ssh/sshd_config")
    }
}

impl SshProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Probe for SshProbe {
    fn category(&self) -> Category {
        Category::Ssh
    }

    fn run(&self) -> Result<CheckResult, Error> {
        let path = self.path.display().to_string();
        if !self.path.exists() {
            return Ok(CheckResult::new(
                CheckStatus::Warn,
                "sshd_config_not_found",
                json!({ "path": path }),
            ));
        }

        let text = match std::fs::read(&self.path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => {
                return Ok(CheckResult::new(
                    CheckStatus::Warn,
                    "sshd_config_read_failed",
                    json!({ "path": path, "error": err.to_string() }),
                ));
            }
        };

        let mut parsed = parse_sshd_config(&text);
        parsed.retain(|key, _| KEYS.contains(&key.as_str()));

        let details = match parsed.get("Port") {
            Some(Directive::Single(port)) => format!("port={port}"),
            _ => "parsed".to_string(),
        };

        Ok(CheckResult::new(
            CheckStatus::Ok,
            details,
            json!({ "path": path, "config": parsed }),
        ))
    }
}

/// Parse `Key value...` lines, dropping comments. Repeated keys collect
/// their values in order.
pub fn parse_sshd_config(text: &str) -> BTreeMap<String, Directive> {
    let mut out: BTreeMap<String, Directive> = BTreeMap::new();

    for raw in text.lines() {
        let line = raw.split_once('#').map_or(raw, |(code, _)| code).trim();
        let mut parts = line.split_whitespace();
        let (Some(key), Some(first)) = (parts.next(), parts.next()) else {
            continue;
        };
        let value = std::iter::once(first).chain(parts).collect::<Vec<_>>().join(" ");

        match out.remove(key) {
            None => {
                out.insert(key.to_string(), Directive::Single(value));
            }
            Some(Directive::Single(prev)) => {
                out.insert(key.to_string(), Directive::Repeated(vec![prev, value]));
            }
            Some(Directive::Repeated(mut values)) => {
                values.push(value);
                out.insert(key.to_string(), Directive::Repeated(values));
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = "\
# comment
Port 2222
PermitRootLogin no   # inline
ListenAddress 0.0.0.0
ListenAddress ::
Subsystem sftp /usr/lib/openssh/sftp-server
Lonely
";

    #[test]
    fn parses_repeated_and_inline_comments() {
        let parsed = parse_sshd_config(CONFIG);
        assert_eq!(parsed["Port"], Directive::Single("2222".into()));
        assert_eq!(parsed["PermitRootLogin"], Directive::Single("no".into()));
        assert_eq!(
            parsed["ListenAddress"],
            Directive::Repeated(vec!["0.0.0.0".into(), "::".into()])
        );
        assert_eq!(
            parsed["Subsystem"],
            Directive::Single("sftp /usr/lib/openssh/sftp-server".into())
        );
        assert!(!parsed.contains_key("Lonely"));
    }

    #[test]
    fn probe_reports_selected_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let result = SshProbe::new(file.path()).run().unwrap();
        assert_eq!(result.status, CheckStatus::Ok);
        assert_eq!(result.details, "port=2222");
        assert_eq!(result.data["config"]["PermitRootLogin"], "no");
        assert!(result.data["config"].get("Subsystem").is_none());
    }

    #[test]
    fn missing_config_is_a_warning() {
        let result = SshProbe::new("/nonexistent/sshd_config").run().unwrap();
        assert_eq!(result.status, CheckStatus::Warn);
        assert_eq!(result.details, "sshd_config_not_found");
    }
}
