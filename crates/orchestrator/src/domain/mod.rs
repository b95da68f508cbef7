#![forbid(unsafe_code)]

mod alert;
mod diff;
mod snapshot;

pub use alert::{Alert, Severity};
pub use diff::{Change, Diff, DiffStatus};
pub use snapshot::{ARCHIVE_FORMAT, Snapshot, SnapshotMeta};
