#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk locations. Unset optional paths live inside `state_dir`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Paths {
    /// Root of snapshots, diffs and notification state.
    pub state_dir: PathBuf,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Stdout/stderr of the detached daemon child.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_log: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid_file: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart_marker: Option<PathBuf>,

    /// Keep a timestamped copy of every snapshot and diff.
    pub archive: bool,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("var/secwatch"),
            log_file: None,
            run_log: None,
            pid_file: None,
            restart_marker: None,
            archive: false,
        }
    }
}

impl Paths {
    pub fn log_file(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.state_dir.join("secwatch.log"))
    }

    pub fn run_log(&self) -> PathBuf {
        self.run_log
            .clone()
            .unwrap_or_else(|| self.state_dir.join("run.log"))
    }

    pub fn pid_file(&self) -> PathBuf {
        self.pid_file
            .clone()
            .unwrap_or_else(|| self.state_dir.join("secwatch.pid"))
    }

    pub fn restart_marker(&self) -> PathBuf {
        self.restart_marker
            .clone()
            .unwrap_or_else(|| self.state_dir.join("restart.flag"))
    }

    /// Anchor every relative path at `base`.
    pub(crate) fn resolve(self, base: &Path) -> Self {
        let anchor = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        Self {
            state_dir: anchor(self.state_dir),
            log_file: self.log_file.map(anchor),
            run_log: self.run_log.map(anchor),
            pid_file: self.pid_file.map(anchor),
            restart_marker: self.restart_marker.map(anchor),
            archive: self.archive,
        }
    }
}
