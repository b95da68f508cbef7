use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use std::path::{Path, PathBuf};

/// secwatch: host security monitoring agent
///
/// Periodically samples listening ports, SSH settings, firewall rules,
/// privileged users, authentication logs and pending updates, stores each
/// sample, and alerts the operator over Telegram when something changes.
#[derive(Debug, Parser, Clone)]
#[command(about, long_about, version, args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Path to configuration file.
    ///
    /// Without one, only the built-in defaults are used: `SECWATCH_*`
    /// variables are ignored and relative paths are taken from the working
    /// directory.
    #[arg(short, long, global = true, value_parser = validate_file)]
    pub config: Option<PathBuf>,

    /// Path to log file.
    ///
    /// Foreground runs log to stderr unless this is given; background runs
    /// default to `paths.log_file`.
    #[arg(short, long, global = true)]
    pub logfile: Option<PathBuf>,

    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    run: RunArgs,
}

impl Cli {
    /// The selected subcommand; a bare invocation means `run`.
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Run(self.run.clone()))
    }
}

#[derive(Debug, Subcommand, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start monitoring (the default).
    Run(RunArgs),

    /// Ask the running instance to restart itself.
    Restart,

    /// Stop the background instance recorded in the pid file.
    Stop,

    /// Print the default configuration as TOML.
    PrintConfig,
}

#[derive(Debug, Args, Clone, Default, PartialEq, Eq)]
pub struct RunArgs {
    /// Run a single sampling cycle and exit.
    #[arg(long)]
    pub once: bool,

    /// Only answer queries, do not sample.
    #[arg(long)]
    pub no_agent: bool,

    /// Run in foreground, do not daemonize.
    #[arg(short, long)]
    pub foreground: bool,

    /// Set on processes started by `run` in the background or by a restart.
    #[arg(long, hide = true)]
    pub daemon_child: bool,
}

impl RunArgs {
    pub fn should_daemonize(&self) -> bool {
        !(self.foreground || self.once || self.daemon_child)
    }
}

/// Check if the file exists.
#[inline(always)]
fn validate_file(file: &str) -> Result<PathBuf, String> {
    let path = Path::new(file);
    if path.is_file() {
        Ok(path.to_owned())
    } else {
        Err(format!("File not found: {:?}", path))
    }
}
