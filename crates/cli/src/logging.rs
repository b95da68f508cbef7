use crate::error::Error;
use std::{fs::OpenOptions, path::Path, sync::Arc};
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

/// Install the global subscriber. `RUST_LOG` overrides `level`.
///
/// With a `logfile` the output is appended there without colours, which is
/// what keeps log history across restarts; otherwise it goes to stderr.
pub fn init(level: LevelFilter, logfile: Option<&Path>) -> Result<(), Error> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_level(true)
        .with_file(true)
        .with_line_number(true);

    let installed = match logfile {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    installed.map_err(|err| Error::Logging(err.to_string()))
}
