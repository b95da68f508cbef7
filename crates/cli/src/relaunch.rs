use crate::{
    cli::{Cli, RunArgs},
    error::Error,
};
use std::{ffi::OsString, os::unix::process::CommandExt, path::PathBuf, process::Command};
use tracing::info;
use tracing_log::AsTrace;
use tracing_subscriber::filter::LevelFilter;

/// Everything a fresh instance needs to continue where this one stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub config: Option<PathBuf>,
    pub logfile: Option<PathBuf>,
    pub level: LevelFilter,
    pub no_agent: bool,
    /// The instance runs without a terminal.
    pub detached: bool,
}

impl Invocation {
    pub fn new(cli: &Cli, args: &RunArgs) -> Self {
        Self {
            config: cli
                .config
                .as_ref()
                .map(|path| path.canonicalize().unwrap_or_else(|_| path.clone())),
            logfile: cli.logfile.clone(),
            level: cli.verbosity.log_level_filter().as_trace(),
            no_agent: args.no_agent,
            detached: args.daemon_child,
        }
    }

    /// The same invocation as a background child.
    pub fn detach(self) -> Self {
        Self {
            detached: true,
            ..self
        }
    }

    /// Arguments for `secwatch` that reproduce this invocation in the
    /// foreground, so the new process never daemonizes again.
    pub fn child_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["run".into(), "--foreground".into()];
        if self.detached {
            args.push("--daemon-child".into());
        }
        if self.no_agent {
            args.push("--no-agent".into());
        }
        if let Some(config) = &self.config {
            args.push("--config".into());
            args.push(config.into());
        }
        if let Some(logfile) = &self.logfile {
            args.push("--logfile".into());
            args.push(logfile.into());
        }
        if let Some(flag) = verbosity_flag(self.level) {
            args.push(flag.into());
        }
        args
    }

    /// Replace the current process image. Only returns on failure.
    pub fn exec(&self) -> Error {
        let exe = match std::env::current_exe() {
            Ok(exe) => exe,
            Err(source) => {
                return Error::Exec {
                    exe: PathBuf::from("secwatch"),
                    source,
                };
            }
        };
        let args = self.child_args();
        info!(exe = %exe.display(), ?args, "re-executing");
        let source = Command::new(&exe).args(&args).exec();
        Error::Exec { exe, source }
    }
}

/// `-v`/`-q` flags for `level`, relative to the default of WARN.
fn verbosity_flag(level: LevelFilter) -> Option<&'static str> {
    [
        (LevelFilter::OFF, "-qq"),
        (LevelFilter::ERROR, "-q"),
        (LevelFilter::INFO, "-v"),
        (LevelFilter::DEBUG, "-vv"),
        (LevelFilter::TRACE, "-vvv"),
    ]
    .into_iter()
    .find(|(candidate, _)| *candidate == level)
    .map(|(_, flag)| flag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Command;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    fn reparse(invocation: &Invocation) -> Cli {
        let argv = std::iter::once(OsString::from("secwatch")).chain(invocation.child_args());
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn restart_keeps_config_and_never_daemonizes() {
        let config = tempfile::NamedTempFile::new().unwrap();
        let path = config.path().to_str().unwrap();
        let cli = Cli::try_parse_from(["secwatch", "--config", path, "--no-agent", "-vv"]).unwrap();
        let Command::Run(args) = cli.command() else {
            panic!("expected run");
        };
        assert!(args.should_daemonize());

        let invocation = Invocation::new(&cli, &args).detach();
        let relaunched = reparse(&invocation);
        let Command::Run(relaunched_args) = relaunched.command() else {
            panic!("expected run");
        };

        assert_eq!(
            relaunched.config,
            Some(config.path().canonicalize().unwrap())
        );
        assert!(!relaunched_args.should_daemonize());
        assert!(relaunched_args.daemon_child);
        assert!(relaunched_args.no_agent);
        assert!(!relaunched_args.once);
        assert_eq!(Invocation::new(&relaunched, &relaunched_args), invocation);
    }

    #[test]
    fn foreground_restart_stays_attached() {
        let cli = Cli::try_parse_from(["secwatch", "run", "--foreground", "-q"]).unwrap();
        let Command::Run(args) = cli.command() else {
            panic!("expected run");
        };
        let invocation = Invocation::new(&cli, &args);
        assert_eq!(invocation.child_args(), ["run", "--foreground", "-q"]);

        let relaunched = reparse(&invocation);
        assert_eq!(relaunched.verbosity.log_level_filter().as_trace(), LevelFilter::ERROR);
    }

    #[test]
    fn verbosity_round_trips() {
        for level in [
            LevelFilter::OFF,
            LevelFilter::ERROR,
            LevelFilter::WARN,
            LevelFilter::INFO,
            LevelFilter::DEBUG,
            LevelFilter::TRACE,
        ] {
            let invocation = Invocation {
                config: None,
                logfile: None,
                level,
                no_agent: false,
                detached: false,
            };
            let cli = reparse(&invocation);
            assert_eq!(cli.verbosity.log_level_filter().as_trace(), level);
        }
    }
}
