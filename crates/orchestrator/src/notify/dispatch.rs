#![forbid(unsafe_code)]

use crate::domain::{Alert, Severity};
use async_trait::async_trait;
use config::Notifications;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The gateway could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// The gateway answered but refused the message.
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Outbound channel to the operator.
#[async_trait]
pub trait AlertGateway: Send + Sync {
    async fn send(&self, recipient: i64, text: &str) -> Result<(), DeliveryError>;
}

/// What happened to one batch of alerts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Alerts held back by the severity switches.
    pub suppressed: usize,
    /// Successful sends, counted per recipient.
    pub delivered: usize,
    /// Failed sends, counted per recipient.
    pub failed: usize,
}

/// Applies the severity switches and fans alerts out to every recipient.
#[derive(Clone)]
pub struct Dispatcher {
    gateway: Arc<dyn AlertGateway>,
    recipients: Vec<i64>,
    send_warning: bool,
    send_critical: bool,
}

impl Dispatcher {
    pub fn new(
        gateway: Arc<dyn AlertGateway>,
        recipients: Vec<i64>,
        notifications: &Notifications,
    ) -> Self {
        Self {
            gateway,
            recipients,
            send_warning: notifications.send_warning,
            send_critical: notifications.send_critical,
        }
    }

    pub fn allows(&self, severity: Severity) -> bool {
        match severity {
            Severity::Warn => self.send_warning,
            Severity::Crit => self.send_critical,
        }
    }

    /// Deliver every allowed alert to every recipient.
    ///
    /// A failed send is logged and counted; it never stops the remaining
    /// sends.
    pub async fn dispatch(&self, alerts: &[Alert]) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for alert in alerts {
            if !self.allows(alert.severity) {
                debug!(kind = alert.kind, severity = %alert.severity, "alert suppressed");
                report.suppressed += 1;
                continue;
            }
            for &recipient in &self.recipients {
                match self.gateway.send(recipient, &alert.message).await {
                    Ok(()) => report.delivered += 1,
                    Err(err) => {
                        warn!(kind = alert.kind, recipient, %err, "alert delivery failed");
                        report.failed += 1;
                    }
                }
            }
        }
        report
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("recipients", &self.recipients)
            .field("send_warning", &self.send_warning)
            .field("send_critical", &self.send_critical)
            .finish()
    }
}
