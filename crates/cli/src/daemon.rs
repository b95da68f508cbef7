use crate::{error::Error, relaunch::Invocation, telegram::TelegramClient};
use config::Config;
use orchestrator::persistence::write_atomic;
use std::{
    fs::{File, OpenOptions},
    os::unix::process::CommandExt,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::Duration,
};
use tracing::{debug, info};

/// How long the child has to survive for the start to count as successful.
const STARTUP_CHECK: Duration = Duration::from_millis(500);

/// What the operator needs to find the background instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detached {
    pub pid: u32,
    pub pid_file: PathBuf,
    pub log_file: PathBuf,
    pub run_log: PathBuf,
}

fn append(path: &Path) -> Result<File, Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(Error::Daemonize)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(Error::Daemonize)
}

/// Start `invocation` as a background child in its own process group with
/// output going to the run log, and record its pid.
///
/// Fails if the child cannot be spawned or exits during the startup check.
pub async fn spawn_detached(invocation: &Invocation, config: &Config) -> Result<Detached, Error> {
    let paths = &config.paths;
    let exe = std::env::current_exe().map_err(Error::Daemonize)?;
    let run_log = paths.run_log();
    let out = append(&run_log)?;
    let err = out.try_clone().map_err(Error::Daemonize)?;

    let args = invocation.child_args();
    debug!(exe = %exe.display(), ?args, "spawning background child");
    let mut child = Command::new(&exe)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(out)
        .stderr(err)
        .process_group(0)
        .spawn()
        .map_err(Error::Daemonize)?;

    tokio::time::sleep(STARTUP_CHECK).await;
    if let Some(status) = child.try_wait().map_err(Error::Daemonize)? {
        return Err(Error::Daemonize(std::io::Error::other(format!(
            "background process exited during startup ({status}), see {}",
            run_log.display()
        ))));
    }

    let pid = child.id();
    let pid_file = paths.pid_file();
    write_atomic(&pid_file, format!("{pid}\n").as_bytes()).map_err(Error::Daemonize)?;
    info!(pid, "background process started");

    Ok(Detached {
        pid,
        pid_file,
        log_file: invocation
            .logfile
            .clone()
            .unwrap_or_else(|| paths.log_file()),
        run_log,
    })
}

/// Bot `@username` for the startup banner, if Telegram answers.
pub async fn bot_username(config: &Config) -> Option<String> {
    if !config.telegram.is_configured() {
        return None;
    }
    let client = TelegramClient::new(&config.telegram).ok()?;
    match client.get_me().await {
        Ok(me) => me.username,
        Err(err) => {
            debug!(%err, "getMe failed");
            None
        }
    }
}

impl Detached {
    pub fn banner(&self, bot: Option<&str>) -> String {
        let mut lines = vec![format!("secwatch started (pid {})", self.pid)];
        if let Some(bot) = bot {
            lines.push(format!("bot: @{bot}"));
        }
        lines.push(format!("logs: tail -f {}", self.log_file.display()));
        lines.push(format!("output: tail -f {}", self.run_log.display()));
        lines.push(format!("stop: kill $(cat {})", self.pid_file.display()));
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_lists_locations() {
        let detached = Detached {
            pid: 4242,
            pid_file: "/srv/secwatch/secwatch.pid".into(),
            log_file: "/srv/secwatch/secwatch.log".into(),
            run_log: "/srv/secwatch/run.log".into(),
        };
        let banner = detached.banner(Some("watch_bot"));
        assert_eq!(
            banner,
            "secwatch started (pid 4242)\n\
             bot: @watch_bot\n\
             logs: tail -f /srv/secwatch/secwatch.log\n\
             output: tail -f /srv/secwatch/run.log\n\
             stop: kill $(cat /srv/secwatch/secwatch.pid)"
        );
        assert!(!detached.banner(None).contains("bot:"));
    }
}
