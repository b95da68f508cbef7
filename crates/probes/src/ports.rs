use crate::{
    Category, CheckResult, CheckStatus, Error, Probe,
    utils::{run_command, split_host_port},
};
use serde::Serialize;
use serde_json::json;

/// One listening socket as reported by `ss`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct PortEntry {
    pub proto: String,
    pub ip: String,
    pub port: u16,
    pub process: Option<String>,
}

/// Listening TCP/UDP sockets via `ss -tulpnH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PortsProbe;

impl Probe for PortsProbe {
    fn category(&self) -> Category {
        Category::Ports
    }

    fn run(&self) -> Result<CheckResult, Error> {
        let output = run_command("ss", &["-tulpnH"])?;
        let entries = parse_ss(&output.stdout);
        let status = if output.success() {
            CheckStatus::Ok
        } else {
            CheckStatus::Warn
        };

        Ok(CheckResult::new(
            status,
            format!("entries={}", entries.len()),
            json!({
                "returncode": output.code,
                "stderr": output.stderr.trim(),
                "entries": entries,
            }),
        ))
    }
}

/// Parse `ss -tulpnH` rows: `netid state recv-q send-q local peer [process]`.
pub fn parse_ss(stdout: &str) -> Vec<PortEntry> {
    let mut entries: Vec<PortEntry> = stdout
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 6 {
                return None;
            }
            let (ip, port) = split_host_port(fields[4])?;
            let process = (fields.len() > 6).then(|| process_name(&fields[6..].join(" ")));
            Some(PortEntry {
                proto: fields[0].to_ascii_lowercase(),
                ip,
                port,
                process,
            })
        })
        .collect();
    entries.sort();
    entries.dedup();
    entries
}

/// `users:(("sshd",pid=812,fd=3))` becomes `sshd`; anything else is kept
/// verbatim.
fn process_name(raw: &str) -> String {
    raw.split_once("((\"")
        .and_then(|(_, rest)| rest.split_once('"'))
        .map_or_else(|| raw.to_string(), |(name, _)| name.to_string())
}
