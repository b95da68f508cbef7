use crate::{error::Error, signals::ControlEvent, supervisor::Service};
use async_trait::async_trait;
use chrono::Utc;
use flume::Sender;
use orchestrator::persistence::write_atomic;
use std::{
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Request a restart from whichever instance watches `path`.
///
/// The body is informational; only the modification time matters.
pub fn write_marker(path: &Path) -> Result<(), Error> {
    let body = format!("{}\n", Utc::now().to_rfc3339());
    write_atomic(path, body.as_bytes())?;
    Ok(())
}

/// Whether the marker moved since it was last seen. A marker that
/// disappears does not count.
pub fn changed(seen: Option<SystemTime>, now: Option<SystemTime>) -> bool {
    now.is_some() && now != seen
}

/// Watches the restart marker and asks for a restart when its mtime moves.
#[derive(Debug)]
pub struct RestartWatcher {
    path: PathBuf,
    interval: Duration,
    events: Sender<ControlEvent>,
}

impl RestartWatcher {
    pub fn new(path: impl Into<PathBuf>, events: Sender<ControlEvent>) -> Self {
        Self {
            path: path.into(),
            interval: POLL_INTERVAL,
            events,
        }
    }

    pub fn with_interval(self, interval: Duration) -> Self {
        Self { interval, ..self }
    }

    async fn mtime(&self) -> Option<SystemTime> {
        let meta = tokio::fs::metadata(&self.path).await.ok()?;
        meta.modified().ok()
    }
}

#[async_trait]
impl Service for RestartWatcher {
    fn name(&self) -> &'static str {
        "restart-marker"
    }

    async fn run(self: Box<Self>, cancel: CancellationToken) -> Result<(), Error> {
        let mut seen = self.mtime().await;
        debug!(path = %self.path.display(), ?seen, "watching restart marker");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = ticker.tick() => {}
            }
            let now = self.mtime().await;
            if changed(seen, now) {
                info!(path = %self.path.display(), "restart requested via marker");
                self.events.send_async(ControlEvent::Restart).await?;
                seen = now;
            }
        }
    }
}
