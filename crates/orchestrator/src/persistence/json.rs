#![forbid(unsafe_code)]

use crate::domain::{ARCHIVE_FORMAT, Diff, Snapshot};
use crate::error::Error;
use crate::notify::NotificationState;
use crate::persistence::{StateRepository, write_atomic};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const LATEST: &str = "latest.json";

/// JSON files under a state directory:
///
/// ```text
/// <state_dir>/snapshots/latest.json   <state_dir>/snapshots/<ts>.json
/// <state_dir>/diffs/latest.json       <state_dir>/diffs/<ts>.json
/// <state_dir>/notify_state.json
/// ```
///
/// Timestamped copies are only written when archiving is on. Every file is
/// replaced atomically.
#[derive(Debug, Clone)]
pub struct JsonRepository {
    state_dir: PathBuf,
    archive: bool,
}

impl JsonRepository {
    pub fn new(state_dir: impl Into<PathBuf>, archive: bool) -> Self {
        Self {
            state_dir: state_dir.into(),
            archive,
        }
    }

    pub fn from_config(paths: &config::Paths) -> Self {
        Self::new(&paths.state_dir, paths.archive)
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.state_dir.join("snapshots")
    }

    pub fn diffs_dir(&self) -> PathBuf {
        self.state_dir.join("diffs")
    }

    pub fn notify_state_path(&self) -> PathBuf {
        self.state_dir.join("notify_state.json")
    }

    /// Create the directory layout up front so that permission problems
    /// surface at startup.
    pub async fn prepare(&self) -> Result<(), Error> {
        tokio::fs::create_dir_all(self.snapshots_dir()).await?;
        tokio::fs::create_dir_all(self.diffs_dir()).await?;
        Ok(())
    }

    async fn read<T: DeserializeOwned>(path: PathBuf) -> Option<T> {
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %path.display(), %err, "state file unreadable, ignoring");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(path = %path.display(), %err, "state file corrupt, ignoring");
                None
            }
        }
    }

    async fn write<T: Serialize + ?Sized>(path: PathBuf, value: &T) -> Result<(), Error> {
        let bytes = serde_json::to_vec_pretty(value)?;
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&target, &bytes))
            .await?
            .map_err(|source| Error::Write {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), "state file written");
        Ok(())
    }

    fn archive_path(dir: PathBuf, ts: DateTime<Utc>) -> PathBuf {
        dir.join(format!("{}.json", ts.format(ARCHIVE_FORMAT)))
    }
}

#[async_trait]
impl StateRepository for JsonRepository {
    async fn load_latest(&self) -> Result<Option<Snapshot>, Error> {
        Ok(Self::read(self.snapshots_dir().join(LATEST)).await)
    }

    async fn write_snapshot(&self, snapshot: &Snapshot) -> Result<(), Error> {
        if self.archive {
            let path = Self::archive_path(self.snapshots_dir(), snapshot.meta.ts);
            Self::write(path, snapshot).await?;
        }
        Self::write(self.snapshots_dir().join(LATEST), snapshot).await
    }

    async fn load_latest_diff(&self) -> Result<Option<Diff>, Error> {
        Ok(Self::read(self.diffs_dir().join(LATEST)).await)
    }

    async fn save_diff(&self, diff: &Diff, ts: DateTime<Utc>) -> Result<(), Error> {
        if self.archive {
            Self::write(Self::archive_path(self.diffs_dir(), ts), diff).await?;
        }
        Self::write(self.diffs_dir().join(LATEST), diff).await
    }

    async fn load_notify_state(&self) -> Result<NotificationState, Error> {
        Ok(Self::read(self.notify_state_path())
            .await
            .unwrap_or_default())
    }

    async fn save_notify_state(&self, state: &NotificationState) -> Result<(), Error> {
        Self::write(self.notify_state_path(), state).await
    }
}
