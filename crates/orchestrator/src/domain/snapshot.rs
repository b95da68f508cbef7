#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use probes::{Category, CheckResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `strftime` pattern for archive file stems.
pub const ARCHIVE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub ts: DateTime<Utc>,
}

/// All category results collected in one cycle.
///
/// Serialized flat: `meta` sits next to one key per collected category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub meta: SnapshotMeta,
    #[serde(flatten)]
    pub categories: BTreeMap<Category, CheckResult>,
}

impl Snapshot {
    pub fn new(ts: DateTime<Utc>, categories: BTreeMap<Category, CheckResult>) -> Self {
        Self {
            meta: SnapshotMeta { ts },
            categories,
        }
    }

    pub fn get(&self, category: Category) -> Option<&CheckResult> {
        self.categories.get(&category)
    }

    pub fn archive_stem(&self) -> String {
        self.meta.ts.format(ARCHIVE_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use probes::CheckStatus;
    use serde_json::json;

    #[test]
    fn serializes_categories_next_to_meta() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 5).unwrap();
        let snapshot = Snapshot::new(
            ts,
            BTreeMap::from([(
                Category::Ssh,
                CheckResult::new(CheckStatus::Ok, "port=22", json!({})),
            )]),
        );

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["ssh"]["details"], "port=22");
        assert!(value["meta"]["ts"].is_string());
        assert_eq!(snapshot.archive_stem(), "20250301T123005Z");

        let parsed: Snapshot = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
