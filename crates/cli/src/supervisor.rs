use crate::{error::Error, signals::ControlEvent};
use async_trait::async_trait;
use flume::{Receiver, Sender};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// A long-lived task owned by the [`Supervisor`].
///
/// `run` must return soon after `cancel` fires. Returning an error (or
/// panicking) before that counts as a crash.
#[async_trait]
pub trait Service: Send {
    fn name(&self) -> &'static str;

    async fn run(self: Box<Self>, cancel: CancellationToken) -> Result<(), Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Running,
    Stopping,
    Terminated,
    Restarting,
}

/// How a supervised run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Stop was requested; the process should exit cleanly.
    Terminated,
    /// Restart was requested; the process should replace itself.
    Restart,
    /// A service failed on its own.
    Crashed,
}

/// Runs services concurrently until a control event arrives or one of them
/// fails, then cancels everything and waits, up to `grace`, for them to
/// finish.
pub struct Supervisor {
    services: Vec<Box<dyn Service>>,
    events_tx: Sender<ControlEvent>,
    events_rx: Receiver<ControlEvent>,
    grace: Duration,
    phase: Phase,
}

impl Supervisor {
    pub fn new(grace: Duration) -> Self {
        let (events_tx, events_rx) = flume::bounded(8);
        Self {
            services: Vec::new(),
            events_tx,
            events_rx,
            grace,
            phase: Phase::Starting,
        }
    }

    /// Sender for stop and restart requests.
    pub fn events(&self) -> Sender<ControlEvent> {
        self.events_tx.clone()
    }

    pub fn add(&mut self, service: impl Service + 'static) -> &mut Self {
        self.services.push(Box::new(service));
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn transition(&mut self, next: Phase) {
        debug!(from = ?self.phase, to = ?next, "supervisor phase");
        self.phase = next;
    }

    pub async fn run(&mut self) -> Exit {
        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();
        for service in self.services.drain(..) {
            let name = service.name();
            let token = cancel.child_token();
            tasks.spawn(async move { (name, service.run(token).await) });
            debug!(service = name, "service started");
        }
        self.transition(Phase::Running);

        let exit = loop {
            tokio::select! {
                event = self.events_rx.recv_async() => match event {
                    Ok(ControlEvent::Stop) => break Exit::Terminated,
                    Ok(ControlEvent::Restart) => break Exit::Restart,
                    // Unreachable while `self` holds a sender.
                    Err(_) => break Exit::Terminated,
                },
                joined = tasks.join_next() => match joined {
                    None => {
                        info!("no services left");
                        break Exit::Terminated;
                    }
                    Some(Ok((name, Ok(())))) => info!(service = name, "service finished"),
                    Some(Ok((name, Err(err)))) => {
                        error!(service = name, %err, "service failed");
                        break Exit::Crashed;
                    }
                    Some(Err(err)) => {
                        error!(%err, "service panicked");
                        break Exit::Crashed;
                    }
                },
            }
        };

        self.transition(Phase::Stopping);
        info!(?exit, "stopping services");
        cancel.cancel();
        self.drain(&mut tasks).await;

        self.transition(match exit {
            Exit::Terminated => Phase::Terminated,
            Exit::Restart | Exit::Crashed => Phase::Restarting,
        });
        exit
    }

    async fn drain(&self, tasks: &mut JoinSet<(&'static str, Result<(), Error>)>) {
        let wait = async {
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((name, Ok(()))) => debug!(service = name, "service stopped"),
                    Ok((name, Err(err))) => warn!(service = name, %err, "service stopped with error"),
                    Err(err) => warn!(%err, "service panicked while stopping"),
                }
            }
        };
        if tokio::time::timeout(self.grace, wait).await.is_err() {
            warn!(remaining = tasks.len(), grace = ?self.grace, "services ignored cancellation, aborting");
            tasks.abort_all();
        }
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field(
                "services",
                &self.services.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("grace", &self.grace)
            .field("phase", &self.phase)
            .finish()
    }
}
