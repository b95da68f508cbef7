use crate::{
    Category, CheckResult, CheckStatus, Error, Probe,
    utils::{run_command, tail_lines},
};
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use std::{
    collections::BTreeSet,
    net::IpAddr,
    path::{Path, PathBuf},
    sync::LazyLock,
};
use tracing::debug;

const TAIL_BYTES: u64 = 256_000;
const MAX_SESSIONS: usize = 50;

// The patterns are literals, so compilation cannot fail at runtime.
static FAILED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Failed password").expect("valid regex"));
static INVALID_USER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Invalid user").expect("valid regex"));
static FOR_ROOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfor\s+root\b").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user: String,
    pub ip: String,
    pub raw: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthCounters {
    pub failed_total: u64,
    pub failed_root: u64,
    pub invalid_user: u64,
}

impl AuthCounters {
    pub fn status(&self) -> CheckStatus {
        if self.failed_root > 0 {
            CheckStatus::Crit
        } else if self.failed_total > 0 || self.invalid_user > 0 {
            CheckStatus::Warn
        } else {
            CheckStatus::Ok
        }
    }
}

/// Recent logins (`last`) plus failed authentication counters from the
/// tail of the system auth log.
#[derive(Debug, Clone)]
pub struct LogsProbe {
    auth_logs: Vec<PathBuf>,
}

impl Default for LogsProbe {
    fn default() -> Self {
        Self::new(["/var/log/auth.log", "/var/log/secure"])
    }
}

impl LogsProbe {
    /// The first existing path in `auth_logs` is read.
    pub fn new<P: Into<PathBuf>>(auth_logs: impl IntoIterator<Item = P>) -> Self {
        Self {
            auth_logs: auth_logs.into_iter().map(Into::into).collect(),
        }
    }

    fn auth_log(&self) -> Option<&Path> {
        self.auth_logs
            .iter()
            .map(PathBuf::as_path)
            .find(|path| path.exists())
    }
}

impl Probe for LogsProbe {
    fn category(&self) -> Category {
        Category::Logs
    }

    fn run(&self) -> Result<CheckResult, Error> {
        let sessions = match run_command("last", &["-i", "-n", "50"]) {
            Ok(output) => parse_last(&output.stdout),
            Err(err) => {
                debug!(%err, "login history unavailable");
                Vec::new()
            }
        };
        let ips: BTreeSet<&str> = sessions
            .iter()
            .filter(|session| is_source_address(&session.ip))
            .map(|session| session.ip.as_str())
            .collect();

        let source = self.auth_log();
        let (counters, auth_log_error) = match source.map(|path| tail_lines(path, TAIL_BYTES)) {
            Some(Ok(lines)) => (count_auth_failures(&lines), None),
            Some(Err(err)) => {
                debug!(%err, "auth log unreadable");
                (AuthCounters::default(), Some(err.to_string()))
            }
            None => (AuthCounters::default(), None),
        };

        Ok(CheckResult::new(
            counters.status(),
            format!(
                "failed={} invalid={}",
                counters.failed_total, counters.invalid_user
            ),
            json!({
                "ips": ips,
                "sessions": sessions.iter().take(MAX_SESSIONS).collect::<Vec<_>>(),
                "auth_log": source.map(|p| p.display().to_string()),
                "auth_log_error": auth_log_error,
                "failed_total": counters.failed_total,
                "failed_root": counters.failed_root,
                "invalid_user": counters.invalid_user,
            }),
        ))
    }
}

/// Parse `last -i` rows (`user tty address ...`).
pub fn parse_last(stdout: &str) -> Vec<Session> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("wtmp begins"))
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let user = fields.next()?;
            let _tty = fields.next()?;
            let ip = fields.next()?;
            Some(Session {
                user: user.to_string(),
                ip: ip.to_string(),
                raw: line.to_string(),
            })
        })
        .collect()
}

/// A real remote address: parses as an IP and is not the unspecified one.
pub fn is_source_address(candidate: &str) -> bool {
    candidate
        .parse::<IpAddr>()
        .is_ok_and(|ip| !ip.is_unspecified())
}

pub fn count_auth_failures<S: AsRef<str>>(lines: &[S]) -> AuthCounters {
    let mut counters = AuthCounters::default();
    for line in lines {
        let line = line.as_ref();
        if INVALID_USER.is_match(line) {
            counters.invalid_user += 1;
        }
        if FAILED.is_match(line) {
            counters.failed_total += 1;
            if FOR_ROOT.is_match(line) {
                counters.failed_root += 1;
            }
        }
    }
    counters
}
