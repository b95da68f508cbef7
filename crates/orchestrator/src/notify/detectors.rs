#![forbid(unsafe_code)]

use crate::domain::{Alert, Severity, Snapshot};
use crate::notify::extract::{
    AuthLog, Extract, FirewallData, LoginSources, PortsData, Socket, UpdatesData, UsersData,
};
use crate::notify::render::{
    FIREWALL_CHANGES_CAP, Message, NEW_IPS_CAP, PORT_CHANGES_CAP, SUDO_USERS_CAP,
    UPDATE_PACKAGES_CAP, code,
};
use crate::notify::state::{FirewallFingerprint, NotificationState};
use probes::Category;
use std::collections::BTreeSet;

/// An edge detector over one slice of [`NotificationState`].
///
/// `detect` compares the current snapshot against the stored slice and never
/// fires while the slice is still empty. `advance` writes the slice for the
/// next cycle from the current snapshot, keeping the previous slice when the
/// category is missing or unreadable this cycle.
pub trait Detector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Category the detector reads.
    fn category(&self) -> Category;

    fn detect(&self, current: &Snapshot, previous: &NotificationState) -> Vec<Alert>;

    fn advance(
        &self,
        current: &Snapshot,
        previous: &NotificationState,
        next: &mut NotificationState,
    );
}

fn added<T: Ord + Clone>(now: &BTreeSet<T>, before: &BTreeSet<T>) -> Vec<T> {
    now.difference(before).cloned().collect()
}

/// Login addresses not seen before.
#[derive(Debug, Default, Clone, Copy)]
pub struct NewIpsDetector;

impl NewIpsDetector {
    fn fingerprint(snapshot: &Snapshot) -> Option<BTreeSet<String>> {
        LoginSources::from_snapshot(snapshot).map(|view| view.addresses())
    }
}

impl Detector for NewIpsDetector {
    fn name(&self) -> &'static str {
        "new_ips"
    }

    fn category(&self) -> Category {
        Category::Logs
    }

    fn detect(&self, current: &Snapshot, previous: &NotificationState) -> Vec<Alert> {
        let (Some(now), Some(before)) = (Self::fingerprint(current), previous.ips.as_ref()) else {
            return Vec::new();
        };
        let new_ips = added(&now, before);
        if new_ips.is_empty() {
            return Vec::new();
        }
        vec![Alert::warn(
            self.name(),
            Message::titled("New login source")
                .items(&new_ips, NEW_IPS_CAP)
                .build(),
        )]
    }

    fn advance(
        &self,
        current: &Snapshot,
        previous: &NotificationState,
        next: &mut NotificationState,
    ) {
        next.ips = Self::fingerprint(current).or_else(|| previous.ips.clone());
    }
}

/// Sockets that started or stopped listening.
#[derive(Debug, Default, Clone, Copy)]
pub struct PortsDetector;

impl PortsDetector {
    fn fingerprint(snapshot: &Snapshot) -> Option<BTreeSet<Socket>> {
        PortsData::from_snapshot(snapshot).map(|view| view.sockets())
    }
}

impl Detector for PortsDetector {
    fn name(&self) -> &'static str {
        "ports"
    }

    fn category(&self) -> Category {
        Category::Ports
    }

    fn detect(&self, current: &Snapshot, previous: &NotificationState) -> Vec<Alert> {
        let (Some(now), Some(before)) = (Self::fingerprint(current), previous.ports.as_ref())
        else {
            return Vec::new();
        };
        let opened = added(&now, before);
        let closed = added(before, &now);
        if opened.is_empty() && closed.is_empty() {
            return Vec::new();
        }
        vec![Alert::warn(
            self.name(),
            Message::titled("Listening ports changed")
                .section("Opened", &opened, PORT_CHANGES_CAP)
                .section("Closed", &closed, PORT_CHANGES_CAP)
                .build(),
        )]
    }

    fn advance(
        &self,
        current: &Snapshot,
        previous: &NotificationState,
        next: &mut NotificationState,
    ) {
        next.ports = Self::fingerprint(current).or_else(|| previous.ports.clone());
    }
}

/// Newly privileged accounts. Removals are not reported.
#[derive(Debug, Default, Clone, Copy)]
pub struct SudoUsersDetector;

impl SudoUsersDetector {
    fn fingerprint(snapshot: &Snapshot) -> Option<BTreeSet<String>> {
        UsersData::from_snapshot(snapshot).map(|view| view.users())
    }
}

impl Detector for SudoUsersDetector {
    fn name(&self) -> &'static str {
        "sudo_users"
    }

    fn category(&self) -> Category {
        Category::Users
    }

    fn detect(&self, current: &Snapshot, previous: &NotificationState) -> Vec<Alert> {
        let (Some(now), Some(before)) = (Self::fingerprint(current), previous.sudo_users.as_ref())
        else {
            return Vec::new();
        };
        let new_users = added(&now, before);
        if new_users.is_empty() {
            return Vec::new();
        }
        vec![Alert::crit(
            self.name(),
            Message::titled("New sudo user")
                .items(&new_users, SUDO_USERS_CAP)
                .build(),
        )]
    }

    fn advance(
        &self,
        current: &Snapshot,
        previous: &NotificationState,
        next: &mut NotificationState,
    ) {
        next.sudo_users = Self::fingerprint(current).or_else(|| previous.sudo_users.clone());
    }
}

/// Fires when pending updates appear on a host that had none. Growth of an
/// already non-zero count stays quiet.
#[derive(Debug, Default, Clone, Copy)]
pub struct UpdatesDetector;

impl Detector for UpdatesDetector {
    fn name(&self) -> &'static str {
        "updates"
    }

    fn category(&self) -> Category {
        Category::Updates
    }

    fn detect(&self, current: &Snapshot, previous: &NotificationState) -> Vec<Alert> {
        let (Some(view), Some(0)) = (UpdatesData::from_snapshot(current), previous.updates_count)
        else {
            return Vec::new();
        };
        if view.count == 0 {
            return Vec::new();
        }
        let packages: Vec<&str> = view
            .packages
            .iter()
            .map(String::as_str)
            .take(UPDATE_PACKAGES_CAP)
            .collect();
        let mut message = Message::titled("Updates available")
            .line(format!("{} packages", code(view.count)));
        if !packages.is_empty() {
            message = message.blank().items(&packages, UPDATE_PACKAGES_CAP);
        }
        vec![Alert::warn(self.name(), message.build())]
    }

    fn advance(
        &self,
        current: &Snapshot,
        previous: &NotificationState,
        next: &mut NotificationState,
    ) {
        next.updates_count = UpdatesData::from_snapshot(current)
            .map(|view| view.count)
            .or(previous.updates_count);
    }
}

/// Fires when the auth log status moves to `warn` or `crit`. Staying
/// elevated, or calming down, is silent.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSeverityDetector;

impl Detector for LogSeverityDetector {
    fn name(&self) -> &'static str {
        "logs"
    }

    fn category(&self) -> Category {
        Category::Logs
    }

    fn detect(&self, current: &Snapshot, previous: &NotificationState) -> Vec<Alert> {
        let (Some(view), Some(before)) = (AuthLog::from_snapshot(current), previous.logs_status)
        else {
            return Vec::new();
        };
        if view.status == before {
            return Vec::new();
        }
        match Severity::from_status(view.status) {
            Some(Severity::Crit) => vec![Alert::crit(
                self.name(),
                Message::titled("Critical events in auth log")
                    .line(format!(
                        "failed_total={} failed_root={} invalid_user={}",
                        code(view.failed_total),
                        code(view.failed_root),
                        code(view.invalid_user)
                    ))
                    .build(),
            )],
            Some(Severity::Warn) => vec![Alert::warn(
                self.name(),
                Message::titled("Warnings in auth log")
                    .line(format!(
                        "failed_total={} invalid_user={}",
                        code(view.failed_total),
                        code(view.invalid_user)
                    ))
                    .build(),
            )],
            None => Vec::new(),
        }
    }

    fn advance(
        &self,
        current: &Snapshot,
        previous: &NotificationState,
        next: &mut NotificationState,
    ) {
        next.logs_status = AuthLog::from_snapshot(current)
            .map(|view| view.status)
            .or(previous.logs_status);
    }
}

/// Firewall switched on or off, or its rule set changed.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirewallDetector;

impl FirewallDetector {
    fn fingerprint(snapshot: &Snapshot) -> Option<FirewallFingerprint> {
        FirewallData::from_snapshot(snapshot).map(|view| FirewallFingerprint {
            rules: view.rules(),
            backend: view.backend,
            enabled: view.enabled,
        })
    }
}

impl Detector for FirewallDetector {
    fn name(&self) -> &'static str {
        "firewall"
    }

    fn category(&self) -> Category {
        Category::Firewall
    }

    fn detect(&self, current: &Snapshot, previous: &NotificationState) -> Vec<Alert> {
        let (Some(now), Some(before)) = (Self::fingerprint(current), previous.firewall.as_ref())
        else {
            return Vec::new();
        };
        let backend = if now.backend.is_empty() {
            &before.backend
        } else {
            &now.backend
        };

        let mut alerts = Vec::new();
        match (before.enabled, now.enabled) {
            (Some(true), Some(false)) => alerts.push(Alert::crit(
                self.name(),
                Message::titled("Firewall disabled")
                    .line(format!("backend={}", code(backend)))
                    .build(),
            )),
            (Some(false), Some(true)) => alerts.push(Alert::warn(
                self.name(),
                Message::titled("Firewall enabled")
                    .line(format!("backend={}", code(backend)))
                    .build(),
            )),
            _ => {}
        }

        if !now.rules.is_empty() && now.rules != before.rules {
            let added_rules = added(&now.rules, &before.rules);
            let removed_rules = added(&before.rules, &now.rules);
            alerts.push(Alert::warn(
                self.name(),
                Message::titled("Firewall rules changed")
                    .section("Added", &added_rules, FIREWALL_CHANGES_CAP)
                    .section("Removed", &removed_rules, FIREWALL_CHANGES_CAP)
                    .build(),
            ));
        }
        alerts
    }

    fn advance(
        &self,
        current: &Snapshot,
        previous: &NotificationState,
        next: &mut NotificationState,
    ) {
        next.firewall = Self::fingerprint(current).or_else(|| previous.firewall.clone());
    }
}
