#![forbid(unsafe_code)]

//! Snapshot storage, diffing, change detection and the sampling loop.

pub mod clock;
pub mod diff;
pub mod domain;
pub mod engine;
pub mod error;
pub mod notify;
pub mod persistence;
pub mod query;

pub use clock::{Clock, SystemClock};
pub use diff::diff;
pub use engine::{CycleReport, MonitorEngine, Notifier, Services};
pub use error::Error;
pub use persistence::{JsonRepository, MemoryRepository, StateRepository};
pub use query::QueryService;
