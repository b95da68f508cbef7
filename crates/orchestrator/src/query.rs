#![forbid(unsafe_code)]

use crate::domain::{DiffStatus, Snapshot};
use crate::error::Error;
use crate::notify::{Socket, extract::{Extract, PortsData}};
use crate::persistence::StateRepository;
use chrono::{DateTime, Utc};
use probes::{Category, CheckStatus};
use std::{collections::BTreeSet, sync::Arc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySummary {
    pub category: Category,
    pub status: CheckStatus,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub ts: DateTime<Utc>,
    pub categories: Vec<CategorySummary>,
}

impl SnapshotSummary {
    /// The worst status among the shown categories.
    pub fn overall(&self) -> CheckStatus {
        self.categories
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(CheckStatus::Ok)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSummary {
    pub category: Category,
    pub before: Option<CheckStatus>,
    pub after: Option<CheckStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSummary {
    pub status: DiffStatus,
    pub details: String,
    pub changes: Vec<ChangeSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub snapshot: Option<SnapshotSummary>,
    pub diff: Option<DiffSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub ts: DateTime<Utc>,
    pub sockets: Vec<Socket>,
}

/// Read-only views over the stored snapshot and diff, for the query front
/// end. Never touches the sampling pipeline.
#[derive(Clone)]
pub struct QueryService {
    repo: Arc<dyn StateRepository>,
    display: BTreeSet<Category>,
}

impl QueryService {
    /// `display` limits which categories appear in summaries; categories
    /// collected only for notifications stay hidden.
    pub fn new(repo: Arc<dyn StateRepository>, display: impl IntoIterator<Item = Category>) -> Self {
        Self {
            repo,
            display: display.into_iter().collect(),
        }
    }

    fn summarize(&self, snapshot: &Snapshot) -> SnapshotSummary {
        SnapshotSummary {
            ts: snapshot.meta.ts,
            categories: snapshot
                .categories
                .iter()
                .filter(|(category, _)| self.display.contains(category))
                .map(|(category, result)| CategorySummary {
                    category: *category,
                    status: result.status,
                    details: result.details.clone(),
                })
                .collect(),
        }
    }

    pub async fn latest_snapshot_summary(&self) -> Result<Option<SnapshotSummary>, Error> {
        let snapshot = self.repo.load_latest().await?;
        Ok(snapshot.map(|snapshot| self.summarize(&snapshot)))
    }

    pub async fn latest_diff_summary(&self) -> Result<Option<DiffSummary>, Error> {
        let diff = self.repo.load_latest_diff().await?;
        Ok(diff.map(|diff| DiffSummary {
            status: diff.status,
            details: diff.details,
            changes: diff
                .changed
                .into_iter()
                .filter(|(category, _)| self.display.contains(category))
                .map(|(category, change)| ChangeSummary {
                    category,
                    before: change.before.map(|r| r.status),
                    after: change.after.map(|r| r.status),
                })
                .collect(),
        }))
    }

    pub async fn combined_report(&self) -> Result<Report, Error> {
        Ok(Report {
            snapshot: self.latest_snapshot_summary().await?,
            diff: self.latest_diff_summary().await?,
        })
    }

    /// Listening sockets from the latest snapshot, if it has port data.
    pub async fn endpoints(&self) -> Result<Option<Endpoints>, Error> {
        let Some(snapshot) = self.repo.load_latest().await? else {
            return Ok(None);
        };
        Ok(PortsData::from_snapshot(&snapshot).map(|view| Endpoints {
            ts: snapshot.meta.ts,
            sockets: view.sockets().into_iter().collect(),
        }))
    }
}

impl std::fmt::Debug for QueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryService")
            .field("display", &self.display)
            .finish()
    }
}
