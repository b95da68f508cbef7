use crate::{Category, CheckResult, CheckStatus, Error, Probe};
use nix::unistd::Group;
use serde_json::json;
use std::collections::BTreeSet;
use tracing::debug;

/// Members of the groups that grant `sudo`.
#[derive(Debug, Clone)]
pub struct UsersProbe {
    groups: Vec<String>,
}

impl Default for UsersProbe {
    fn default() -> Self {
        Self::new(["sudo", "wheel"])
    }
}

impl UsersProbe {
    pub fn new<S: Into<String>>(groups: impl IntoIterator<Item = S>) -> Self {
        Self {
            groups: groups.into_iter().map(Into::into).collect(),
        }
    }
}

impl Probe for UsersProbe {
    fn category(&self) -> Category {
        Category::Users
    }

    fn run(&self) -> Result<CheckResult, Error> {
        let mut members = BTreeSet::new();
        for name in &self.groups {
            match Group::from_name(name)? {
                Some(group) => members.extend(clean_members(group.mem)),
                None => debug!(group = %name, "group does not exist"),
            }
        }

        Ok(CheckResult::new(
            CheckStatus::Ok,
            format!("sudo_users={}", members.len()),
            json!({ "sudo_users": members }),
        ))
    }
}

fn clean_members(members: Vec<String>) -> impl Iterator<Item = String> {
    members
        .into_iter()
        .map(|member| member.trim().to_string())
        .filter(|member| !member.is_empty())
}
