#![forbid(unsafe_code)]

mod detectors;
mod dispatch;
mod engine;
pub mod extract;
mod render;
mod state;

pub use detectors::{
    Detector, FirewallDetector, LogSeverityDetector, NewIpsDetector, PortsDetector,
    SudoUsersDetector, UpdatesDetector,
};
pub use dispatch::{AlertGateway, DeliveryError, DeliveryReport, Dispatcher};
pub use engine::{Evaluation, NotificationEngine, required_categories};
pub use extract::Socket;
pub use render::{Message, bold, code, escape};
pub use state::{FirewallFingerprint, NotificationState};
