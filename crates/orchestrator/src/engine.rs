#![forbid(unsafe_code)]

use crate::clock::Clock;
use crate::diff::diff;
use crate::domain::{DiffStatus, Snapshot};
use crate::error::Error;
use crate::notify::{DeliveryReport, Dispatcher, NotificationEngine};
use crate::persistence::StateRepository;
use chrono::{DateTime, Utc};
use config::Monitor;
use probes::{Category, CheckResult, ProbeSet};
use std::{collections::BTreeMap, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// Detectors plus the channel their alerts go out on.
#[derive(Debug)]
pub struct Notifier {
    pub engine: NotificationEngine,
    pub dispatcher: Dispatcher,
}

pub struct Services {
    pub probes: ProbeSet,
    pub repo: Arc<dyn StateRepository>,
    /// `None` when notifications are off.
    pub notifier: Option<Notifier>,
    pub clock: Box<dyn Clock + Send + Sync>,
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    pub ts: DateTime<Utc>,
    pub categories: Vec<Category>,
    pub diff_status: DiffStatus,
    pub diff_details: String,
    pub alerts: usize,
    pub delivery: Option<DeliveryReport>,
}

/// The sampling pipeline: collect, persist, diff, notify.
pub struct MonitorEngine {
    monitor: Monitor,
    services: Services,
    cycle: u64,
}

impl MonitorEngine {
    pub fn new(monitor: Monitor, services: Services) -> Self {
        Self {
            monitor,
            services,
            cycle: 0,
        }
    }

    /// Run one complete cycle without sleeping.
    pub async fn tick(&mut self) -> Result<CycleReport, Error> {
        let categories = self.collect().await;
        self.process(categories).await
    }

    /// Cycles until `cancel` fires.
    ///
    /// The first cycle starts immediately. Cancellation is honoured while
    /// probes run and while waiting for the next cycle, but once results are
    /// in, persisting and notifying always finish. A failed cycle is logged
    /// and the loop carries on at the normal interval.
    pub async fn run_until(&mut self, cancel: CancellationToken) {
        info!(interval = ?self.monitor.interval, probes = ?self.services.probes, "sampling started");
        loop {
            let started = self.services.clock.now();

            let categories = tokio::select! {
                _ = cancel.cancelled() => break,
                categories = self.collect() => categories,
            };

            match self.process(categories).await {
                Ok(report) => info!(
                    cycle = report.cycle,
                    diff = %report.diff_details,
                    alerts = report.alerts,
                    "cycle finished"
                ),
                Err(err) => error!(cycle = self.cycle, %err, "cycle failed"),
            }

            let elapsed = self.services.clock.now().saturating_duration_since(started);
            let remaining = self.monitor.interval.saturating_sub(elapsed);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.services.clock.sleep(remaining) => {}
            }
        }
        info!("sampling stopped");
    }

    async fn collect(&self) -> BTreeMap<Category, CheckResult> {
        self.services
            .probes
            .collect(self.monitor.probe_timeout)
            .await
    }

    async fn process(
        &mut self,
        categories: BTreeMap<Category, CheckResult>,
    ) -> Result<CycleReport, Error> {
        self.cycle = self.cycle.saturating_add(1);
        let span = info_span!("cycle", n = self.cycle);
        self.persist_and_notify(categories).instrument(span).await
    }

    async fn persist_and_notify(
        &self,
        categories: BTreeMap<Category, CheckResult>,
    ) -> Result<CycleReport, Error> {
        let repo = &self.services.repo;
        let previous = repo.load_latest().await?;
        let snapshot = repo.save(self.services.clock.utc_now(), categories).await?;

        let diff = diff(previous.as_ref(), &snapshot);
        repo.save_diff(&diff, snapshot.meta.ts).await?;
        debug!(status = ?diff.status, details = %diff.details, "diff stored");

        let (alerts, delivery) = match &self.services.notifier {
            Some(notifier) => {
                let (alerts, delivery) = self.notify(notifier, &snapshot).await?;
                (alerts, Some(delivery))
            }
            None => (0, None),
        };

        Ok(CycleReport {
            cycle: self.cycle,
            ts: snapshot.meta.ts,
            categories: snapshot.categories.keys().copied().collect(),
            diff_status: diff.status,
            diff_details: diff.details,
            alerts,
            delivery,
        })
    }

    /// The new state is saved whether or not delivery worked, so a flaky
    /// gateway cannot cause the same alerts to be sent every cycle.
    async fn notify(
        &self,
        notifier: &Notifier,
        snapshot: &Snapshot,
    ) -> Result<(usize, DeliveryReport), Error> {
        let repo = &self.services.repo;
        let previous = repo.load_notify_state().await?;
        let evaluation = notifier.engine.evaluate(snapshot, &previous);
        let delivery = notifier.dispatcher.dispatch(&evaluation.alerts).await;
        if delivery.failed > 0 {
            warn!(failed = delivery.failed, delivered = delivery.delivered, "some alerts were not delivered");
        }
        repo.save_notify_state(&evaluation.next_state).await?;
        Ok((evaluation.alerts.len(), delivery))
    }
}
