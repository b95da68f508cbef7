#![forbid(unsafe_code)]

use crate::domain::{Diff, Snapshot};
use crate::error::Error;
use crate::notify::NotificationState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use probes::{Category, CheckResult};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Storage for the latest snapshot, the latest diff and the notification
/// suppression state.
///
/// Readers never fail on missing or unreadable state: they report `None`
/// (or an empty [`NotificationState`]) and let the pipeline start over.
#[async_trait]
pub trait StateRepository: Send + Sync {
    /// The snapshot that is currently "latest", if any.
    async fn load_latest(&self) -> Result<Option<Snapshot>, Error>;
    /// Make `snapshot` the latest one.
    async fn write_snapshot(&self, snapshot: &Snapshot) -> Result<(), Error>;
    async fn load_latest_diff(&self) -> Result<Option<Diff>, Error>;
    /// Make `diff` the latest diff. `ts` is the timestamp of the snapshot it
    /// was computed for.
    async fn save_diff(&self, diff: &Diff, ts: DateTime<Utc>) -> Result<(), Error>;
    async fn load_notify_state(&self) -> Result<NotificationState, Error>;
    async fn save_notify_state(&self, state: &NotificationState) -> Result<(), Error>;

    /// Stamp `categories` with `ts` and store the result as the latest
    /// snapshot.
    async fn save(
        &self,
        ts: DateTime<Utc>,
        categories: BTreeMap<Category, CheckResult>,
    ) -> Result<Snapshot, Error> {
        let snapshot = Snapshot::new(ts, categories);
        self.write_snapshot(&snapshot).await?;
        Ok(snapshot)
    }
}

/// Keeps everything in memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    snapshot: RwLock<Option<Snapshot>>,
    diff: RwLock<Option<Diff>>,
    notify: RwLock<NotificationState>,
}

#[async_trait]
impl StateRepository for MemoryRepository {
    async fn load_latest(&self) -> Result<Option<Snapshot>, Error> {
        Ok(self.snapshot.read().await.clone())
    }

    async fn write_snapshot(&self, snapshot: &Snapshot) -> Result<(), Error> {
        *self.snapshot.write().await = Some(snapshot.clone());
        Ok(())
    }

    async fn load_latest_diff(&self) -> Result<Option<Diff>, Error> {
        Ok(self.diff.read().await.clone())
    }

    async fn save_diff(&self, diff: &Diff, _ts: DateTime<Utc>) -> Result<(), Error> {
        *self.diff.write().await = Some(diff.clone());
        Ok(())
    }

    async fn load_notify_state(&self) -> Result<NotificationState, Error> {
        Ok(self.notify.read().await.clone())
    }

    async fn save_notify_state(&self, state: &NotificationState) -> Result<(), Error> {
        *self.notify.write().await = state.clone();
        Ok(())
    }
}
