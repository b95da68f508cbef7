use std::time::Duration;

/// Represents all possible errors that can occur while probing the host.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An external tool could not be started.
    #[error("Failed to run `{program}`: {source}")]
    CommandFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Error occurred while reading a file.
    #[error("Failed to read file: {0}")]
    FileReadFailed(#[from] std::io::Error),

    /// The group database lookup failed.
    #[error("Failed to look up group: {0}")]
    GroupLookupFailed(#[from] nix::Error),

    /// The blocking probe task panicked or was cancelled.
    #[error("Failed to join probe task: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    /// The probe did not finish within its budget.
    #[error("Probe timed out after {0:?}")]
    Timeout(Duration),
}
