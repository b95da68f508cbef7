//! Assembles the configured pieces into a sampling engine and a supervisor.

use crate::{
    bot::QueryBot,
    cli::RunArgs,
    error::Error,
    marker::RestartWatcher,
    signals::SignalListener,
    supervisor::{Exit, Service, Supervisor},
    telegram::TelegramClient,
};
use async_trait::async_trait;
use config::Config;
use orchestrator::{
    CycleReport, JsonRepository, MonitorEngine, Notifier, QueryService, Services, StateRepository,
    SystemClock,
    notify::{Dispatcher, NotificationEngine, required_categories},
    persistence::write_atomic,
};
use probes::{Category, ProbeSet};
use std::{collections::BTreeSet, path::Path, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Categories to collect: everything shown to the operator plus whatever
/// the enabled detectors read.
pub fn probe_categories(config: &Config) -> BTreeSet<Category> {
    let mut categories: BTreeSet<Category> =
        Category::enabled_in(&config.checks).into_iter().collect();
    categories.extend(required_categories(&config.notifications));
    categories
}

/// The sampling loop as a supervised service.
pub struct Sampler(MonitorEngine);

#[async_trait]
impl Service for Sampler {
    fn name(&self) -> &'static str {
        "sampler"
    }

    async fn run(self: Box<Self>, cancel: CancellationToken) -> Result<(), Error> {
        let Sampler(mut engine) = *self;
        engine.run_until(cancel).await;
        Ok(())
    }
}

/// Shared handles built once per process.
struct Components {
    repo: Arc<JsonRepository>,
    client: Option<Arc<TelegramClient>>,
}

impl Components {
    async fn build(config: &Config) -> Result<Self, Error> {
        let repo = Arc::new(JsonRepository::from_config(&config.paths));
        repo.prepare().await?;

        let client = if config.telegram.is_configured() {
            Some(Arc::new(TelegramClient::new(&config.telegram)?))
        } else {
            debug!("telegram token not set");
            None
        };
        Ok(Self { repo, client })
    }

    fn notifier(&self, config: &Config) -> Option<Notifier> {
        if !config.notifications.enabled {
            return None;
        }
        let Some(client) = &self.client else {
            warn!("notifications are enabled but telegram.token is empty; alerts will not be sent");
            return None;
        };
        if config.telegram.recipients.is_empty() {
            warn!("notifications are enabled but telegram.recipients is empty");
        }
        Some(Notifier {
            engine: NotificationEngine::from_config(&config.notifications),
            dispatcher: Dispatcher::new(
                client.clone(),
                config.telegram.recipients.clone(),
                &config.notifications,
            ),
        })
    }

    fn engine(&self, config: &Config) -> MonitorEngine {
        let categories = probe_categories(config);
        info!(?categories, "probes selected");
        let repo: Arc<dyn StateRepository> = self.repo.clone();
        MonitorEngine::new(
            config.monitor.clone(),
            Services {
                probes: ProbeSet::standard(categories),
                repo,
                notifier: self.notifier(config),
                clock: Box::new(SystemClock),
            },
        )
    }
}

/// One cycle, no supervisor.
pub async fn run_once(config: &Config) -> Result<CycleReport, Error> {
    let components = Components::build(config).await?;
    let mut engine = components.engine(config);
    Ok(engine.tick().await?)
}

/// Run the sampler, the query bot and the control watchers until stopped.
pub async fn supervise(config: &Config, args: &RunArgs) -> Result<Exit, Error> {
    let components = Components::build(config).await?;
    let pid_file = config.paths.pid_file();
    write_pid(&pid_file)?;

    let mut supervisor = Supervisor::new(config.monitor.shutdown_grace);
    let events = supervisor.events();
    supervisor
        .add(SignalListener::install(events.clone()))
        .add(RestartWatcher::new(config.paths.restart_marker(), events));

    if args.no_agent {
        info!("sampling disabled by --no-agent");
    } else {
        supervisor.add(Sampler(components.engine(config)));
    }

    match &components.client {
        Some(client) => {
            let repo: Arc<dyn StateRepository> = components.repo.clone();
            let query = QueryService::new(repo, Category::enabled_in(&config.checks));
            supervisor.add(QueryBot::new(
                client.clone(),
                query,
                config.telegram.recipients.iter().copied(),
                config.telegram.poll_timeout,
            ));
        }
        None if args.no_agent => warn!("nothing to do: no telegram token and --no-agent"),
        None => info!("query bot disabled: no telegram token"),
    }

    info!(?supervisor, "supervisor starting");
    let exit = supervisor.run().await;
    if exit == Exit::Terminated {
        clear_pid(&pid_file);
    }
    Ok(exit)
}

fn write_pid(path: &Path) -> Result<(), Error> {
    write_atomic(path, format!("{}\n", std::process::id()).as_bytes())?;
    Ok(())
}

/// Remove the pid file if it still names this process.
fn clear_pid(path: &Path) {
    let ours = std::fs::read_to_string(path)
        .ok()
        .and_then(|text| text.trim().parse::<u32>().ok())
        .is_some_and(|pid| pid == std::process::id());
    if ours {
        if let Err(err) = std::fs::remove_file(path) {
            warn!(path = %path.display(), %err, "cannot remove pid file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn notification_detectors_force_their_probes() {
        let mut config = Config::default();
        config.checks.ssh = false;
        assert_eq!(
            probe_categories(&config).into_iter().collect::<Vec<_>>(),
            vec![Category::Ports]
        );

        config.notifications.enabled = true;
        config.notifications.updates = false;
        let categories = probe_categories(&config);
        assert!(categories.contains(&Category::Logs));
        assert!(categories.contains(&Category::Users));
        assert!(categories.contains(&Category::Firewall));
        assert!(!categories.contains(&Category::Updates));
        assert!(!categories.contains(&Category::Ssh));
    }

    #[test]
    fn pid_file_is_removed_only_when_ours() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secwatch.pid");

        write_pid(&path).unwrap();
        clear_pid(&path);
        assert!(!path.exists());

        std::fs::write(&path, "1\n").unwrap();
        clear_pid(&path);
        assert!(path.exists());
    }
}
