#![forbid(unsafe_code)]

use anyhow::Context;
use clap::Parser;
use config::Config;
use nix::{
    sys::signal::{Signal, kill},
    unistd::Pid,
};
use secwatch::{
    Error, Exit, app,
    cli::{Cli, Command, RunArgs},
    daemon, logging,
    marker::write_marker,
    relaunch::Invocation,
};
use std::{path::Path, time::Duration};
use tracing::{debug, error, info, warn};

#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Pause before relaunching after a crash, so a failing service cannot spin.
const CRASH_BACKOFF: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("cannot load configuration from {}", path.display()))?,
        _ => Config::new(),
    };

    match cli.command() {
        Command::Run(args) => run(&cli, &args, &config).await,
        Command::Restart => {
            let marker = config.paths.restart_marker();
            write_marker(&marker)?;
            report(&format!("restart requested via {}", marker.display()));
            Ok(())
        }
        Command::Stop => {
            let pid = stop(&config.paths.pid_file())?;
            report(&format!("sent SIGTERM to {pid}"));
            Ok(())
        }
        Command::PrintConfig => {
            report(&Config::new().to_toml()?);
            Ok(())
        }
    }
}

async fn run(cli: &Cli, args: &RunArgs, config: &Config) -> anyhow::Result<()> {
    let invocation = Invocation::new(cli, args);

    if args.should_daemonize() {
        logging::init(invocation.level, cli.logfile.as_deref())?;
        let detached = daemon::spawn_detached(&invocation.clone().detach(), config)
            .await
            .context("cannot start in the background")?;
        let bot = daemon::bot_username(config).await;
        report(&detached.banner(bot.as_deref()));
        return Ok(());
    }

    let logfile = cli
        .logfile
        .clone()
        .or_else(|| args.daemon_child.then(|| config.paths.log_file()));
    logging::init(invocation.level, logfile.as_deref())?;
    debug!(?cli, ?config, "starting");

    if args.once {
        let report = app::run_once(config).await?;
        info!(cycle = report.cycle, diff = %report.diff_details, alerts = report.alerts, "single cycle finished");
        return Ok(());
    }

    match app::supervise(config, args).await? {
        Exit::Terminated => {
            info!("stopped");
            Ok(())
        }
        Exit::Restart => Err(invocation.exec().into()),
        Exit::Crashed => {
            warn!(delay = ?CRASH_BACKOFF, "restarting after a service failure");
            tokio::time::sleep(CRASH_BACKOFF).await;
            let err = invocation.exec();
            error!(%err, "restart failed");
            Err(err.into())
        }
    }
}

/// Send `SIGTERM` to the pid recorded in `pid_file`.
fn stop(pid_file: &Path) -> Result<i32, Error> {
    let pid = std::fs::read_to_string(pid_file)
        .ok()
        .and_then(|text| text.trim().parse::<i32>().ok())
        .filter(|pid| *pid > 0)
        .ok_or_else(|| Error::NoPid(pid_file.to_owned()))?;
    kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(|source| Error::Kill { pid, source })?;
    Ok(pid)
}

#[allow(clippy::print_stdout)]
fn report(text: &str) {
    println!("{text}");
}
