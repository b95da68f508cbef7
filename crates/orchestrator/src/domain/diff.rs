#![forbid(unsafe_code)]

use probes::{Category, CheckResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A diff only knows "something changed"; severity is decided by the
/// notification detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus {
    Ok,
    Warn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub before: Option<CheckResult>,
    pub after: Option<CheckResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diff {
    pub status: DiffStatus,
    pub details: String,
    #[serde(default)]
    pub changed: BTreeMap<Category, Change>,
}
