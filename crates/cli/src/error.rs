use crate::signals::ControlEvent;
use flume::SendError;
use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to send control event: {0}")]
    SendControl(#[from] SendError<ControlEvent>),

    #[error("Failed to start background process: {0}")]
    Daemonize(#[source] io::Error),

    #[error("Failed to re-execute {exe}: {source}")]
    Exec {
        exe: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to set up logging: {0}")]
    Logging(String),

    #[error("No process found in pid file {0}")]
    NoPid(PathBuf),

    #[error("Failed to signal process {pid}: {source}")]
    Kill {
        pid: i32,
        #[source]
        source: nix::Error,
    },

    #[error("Telegram request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Telegram API error: {0}")]
    Api(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Config(#[from] config::Error),

    #[error(transparent)]
    Orchestrator(#[from] orchestrator::Error),
}
