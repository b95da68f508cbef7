#![forbid(unsafe_code)]

//! The `secwatch` binary: command line, logging, the supervisor and its
//! services, daemonizing, self-restart and the Telegram front end.

pub mod app;
pub mod bot;
pub mod cli;
pub mod daemon;
pub mod error;
pub mod logging;
pub mod marker;
pub mod relaunch;
pub mod signals;
pub mod supervisor;
pub mod telegram;

pub use error::Error;
pub use supervisor::{Exit, Phase, Service, Supervisor};
