use crate::{Category, CheckResult, CheckStatus, Error, Probe, utils::run_command};
use itertools::Itertools;
use serde_json::json;
use std::path::Path;

/// Package names beyond this are left out of the result data.
const MAX_PACKAGES: usize = 50;

/// Pending package upgrades according to a dry-run `apt-get upgrade`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UpdatesProbe;

impl Probe for UpdatesProbe {
    fn category(&self) -> Category {
        Category::Updates
    }

    fn run(&self) -> Result<CheckResult, Error> {
        if !Path::new("/usr/bin/apt-get").exists() {
            return Ok(CheckResult::new(
                CheckStatus::Warn,
                "updates_check_unsupported",
                json!({ "backend": "none" }),
            ));
        }

        let output = run_command("apt-get", &["-s", "upgrade"])?;
        if !output.success() {
            return Ok(CheckResult::new(
                CheckStatus::Warn,
                "updates_check_failed",
                json!({
                    "backend": "apt",
                    "returncode": output.code,
                    "stderr": output.stderr.trim(),
                }),
            ));
        }

        let packages = parse_apt_simulation(&output.stdout);
        let status = if packages.is_empty() {
            CheckStatus::Ok
        } else {
            CheckStatus::Warn
        };

        Ok(CheckResult::new(
            status,
            format!("updates={}", packages.len()),
            json!({
                "backend": "apt",
                "count": packages.len(),
                "packages": packages.iter().take(MAX_PACKAGES).collect::<Vec<_>>(),
            }),
        ))
    }
}

/// Package names from the `Inst <name> ...` lines of `apt-get -s upgrade`,
/// sorted and unique.
pub fn parse_apt_simulation(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.strip_prefix("Inst "))
        .filter_map(|rest| rest.split_whitespace().next())
        .map(str::to_owned)
        .sorted()
        .dedup()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_installable_packages() {
        let stdout = "\
Reading package lists...
Inst openssl [3.0.2-0ubuntu1.14] (3.0.2-0ubuntu1.15 Ubuntu:22.04/jammy-updates [amd64])
Inst libssl3 [3.0.2-0ubuntu1.14] (3.0.2-0ubuntu1.15 Ubuntu:22.04/jammy-updates [amd64])
Conf openssl (3.0.2-0ubuntu1.15 Ubuntu:22.04/jammy-updates [amd64])
Inst openssl [3.0.2-0ubuntu1.14] (duplicate)
";
        assert_eq!(parse_apt_simulation(stdout), vec!["libssl3", "openssl"]);
    }

    #[test]
    fn up_to_date_system_has_nothing() {
        assert!(parse_apt_simulation("0 upgraded, 0 newly installed.\n").is_empty());
    }
}
