#![forbid(unsafe_code)]

use probes::CheckStatus;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warn,
    Crit,
}

impl Severity {
    /// `ok` has no alert severity.
    pub fn from_status(status: CheckStatus) -> Option<Self> {
        match status {
            CheckStatus::Ok => None,
            CheckStatus::Warn => Some(Severity::Warn),
            CheckStatus::Crit => Some(Severity::Crit),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warn => f.write_str("warn"),
            Severity::Crit => f.write_str("crit"),
        }
    }
}

/// One classified, ready-to-send message produced by a detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub severity: Severity,
    /// Name of the detector that raised it.
    pub kind: &'static str,
    pub message: String,
}

impl Alert {
    pub fn warn(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warn,
            kind,
            message: message.into(),
        }
    }

    pub fn crit(kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Crit,
            kind,
            message: message.into(),
        }
    }
}
