#![forbid(unsafe_code)]

//! Host probes. Each probe inspects one security-relevant category of the
//! machine and reports a [`CheckResult`].

mod error;
mod firewall;
pub mod host;
mod logs;
mod model;
mod ports;
mod probe;
mod ssh;
mod updates;
mod users;
pub mod utils;

pub use error::Error;
pub use firewall::{FirewallProbe, MAX_RULES};
pub use host::HostInfo;
pub use logs::{AuthCounters, LogsProbe, Session};
pub use model::{Category, CheckResult, CheckStatus};
pub use ports::{PortEntry, PortsProbe};
pub use probe::{Probe, ProbeSet, standard_probe};
pub use ssh::{Directive, SshProbe};
pub use updates::UpdatesProbe;
pub use users::UsersProbe;
