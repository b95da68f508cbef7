#![forbid(unsafe_code)]

use crate::domain::{Alert, Snapshot};
use crate::notify::detectors::{
    Detector, FirewallDetector, LogSeverityDetector, NewIpsDetector, PortsDetector,
    SudoUsersDetector, UpdatesDetector,
};
use crate::notify::state::NotificationState;
use config::Notifications;
use probes::Category;
use std::collections::BTreeSet;
use tracing::debug;

/// Alerts raised for one snapshot together with the state to persist.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub alerts: Vec<Alert>,
    pub next_state: NotificationState,
}

/// Runs a fixed set of detectors over each new snapshot.
pub struct NotificationEngine {
    detectors: Vec<Box<dyn Detector>>,
}

impl NotificationEngine {
    pub fn new(detectors: Vec<Box<dyn Detector>>) -> Self {
        Self { detectors }
    }

    /// The detectors switched on in `[notifications]`.
    pub fn from_config(notifications: &Notifications) -> Self {
        let mut detectors: Vec<Box<dyn Detector>> = Vec::new();
        if notifications.new_ips {
            detectors.push(Box::new(NewIpsDetector));
        }
        if notifications.ports {
            detectors.push(Box::new(PortsDetector));
        }
        if notifications.sudo_users {
            detectors.push(Box::new(SudoUsersDetector));
        }
        if notifications.updates {
            detectors.push(Box::new(UpdatesDetector));
        }
        if notifications.logs {
            detectors.push(Box::new(LogSeverityDetector));
        }
        if notifications.firewall {
            detectors.push(Box::new(FirewallDetector));
        }
        Self::new(detectors)
    }

    /// Categories that must be collected for the detectors to see anything.
    pub fn required_categories(&self) -> BTreeSet<Category> {
        self.detectors.iter().map(|d| d.category()).collect()
    }

    pub fn detector_names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Run every detector against `previous` and rebuild the state from
    /// `current`. A slice whose category is missing this cycle is carried
    /// over; slices of disabled detectors are dropped.
    pub fn evaluate(&self, current: &Snapshot, previous: &NotificationState) -> Evaluation {
        let mut evaluation = Evaluation::default();
        for detector in &self.detectors {
            let alerts = detector.detect(current, previous);
            if !alerts.is_empty() {
                debug!(detector = detector.name(), count = alerts.len(), "detector fired");
            }
            evaluation.alerts.extend(alerts);
            detector.advance(current, previous, &mut evaluation.next_state);
        }
        evaluation
    }
}

impl std::fmt::Debug for NotificationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationEngine")
            .field("detectors", &self.detector_names())
            .finish()
    }
}

/// Categories to collect on behalf of notifications, empty when they are off.
pub fn required_categories(notifications: &Notifications) -> BTreeSet<Category> {
    if !notifications.enabled {
        return BTreeSet::new();
    }
    NotificationEngine::from_config(notifications).required_categories()
}
