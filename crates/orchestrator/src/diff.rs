#![forbid(unsafe_code)]

use crate::domain::{Change, Diff, DiffStatus, Snapshot};
use std::collections::BTreeMap;

/// Compare two snapshots category by category.
///
/// Without a previous snapshot the diff is empty and `ok`. Categories are
/// compared by structural equality of the whole result; a category that
/// disappeared is reported with `after: None`. `meta` never takes part.
pub fn diff(previous: Option<&Snapshot>, current: &Snapshot) -> Diff {
    let Some(previous) = previous else {
        return Diff {
            status: DiffStatus::Ok,
            details: "no_previous_snapshot".into(),
            changed: BTreeMap::new(),
        };
    };

    let mut changed = BTreeMap::new();
    for (category, after) in &current.categories {
        let before = previous.categories.get(category);
        if before != Some(after) {
            changed.insert(
                *category,
                Change {
                    before: before.cloned(),
                    after: Some(after.clone()),
                },
            );
        }
    }
    for (category, before) in &previous.categories {
        if !current.categories.contains_key(category) {
            changed.insert(
                *category,
                Change {
                    before: Some(before.clone()),
                    after: None,
                },
            );
        }
    }

    if changed.is_empty() {
        Diff {
            status: DiffStatus::Ok,
            details: "no_changes".into(),
            changed,
        }
    } else {
        Diff {
            status: DiffStatus::Warn,
            details: format!("changed={}", changed.len()),
            changed,
        }
    }
}
