use crate::{error::Error, supervisor::Service};
use async_trait::async_trait;
use flume::Sender;
use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Shut down and exit.
    Stop,
    /// Shut down and replace this process with a fresh instance.
    Restart,
}

/// Forwards `SIGINT`/`SIGTERM` as [`ControlEvent::Stop`] and
/// `SIGHUP`/`SIGUSR1` as [`ControlEvent::Restart`].
pub struct SignalListener {
    interrupt: Option<Signal>,
    terminate: Option<Signal>,
    hangup: Option<Signal>,
    user1: Option<Signal>,
    events: Sender<ControlEvent>,
}

impl SignalListener {
    /// Handlers are installed one by one; a signal that cannot be hooked is
    /// logged and ignored.
    pub fn install(events: Sender<ControlEvent>) -> Self {
        Self {
            interrupt: hook("SIGINT", SignalKind::interrupt()),
            terminate: hook("SIGTERM", SignalKind::terminate()),
            hangup: hook("SIGHUP", SignalKind::hangup()),
            user1: hook("SIGUSR1", SignalKind::user_defined1()),
            events,
        }
    }

    /// Indefinitely listens to signals and sends control events to the
    /// channel.
    pub async fn wait_for_signal(&mut self) -> Result<(), Error> {
        loop {
            let (name, event) = tokio::select! {
                _ = recv(&mut self.interrupt) => ("SIGINT", ControlEvent::Stop),
                _ = recv(&mut self.terminate) => ("SIGTERM", ControlEvent::Stop),
                _ = recv(&mut self.hangup) => ("SIGHUP", ControlEvent::Restart),
                _ = recv(&mut self.user1) => ("SIGUSR1", ControlEvent::Restart),
            };
            info!(signal = name, ?event, "signal received");
            self.events.send_async(event).await?;
        }
    }
}

#[async_trait]
impl Service for SignalListener {
    fn name(&self) -> &'static str {
        "signals"
    }

    async fn run(self: Box<Self>, cancel: CancellationToken) -> Result<(), Error> {
        let mut listener = self;
        tokio::select! {
            _ = cancel.cancelled() => Ok(()),
            res = listener.wait_for_signal() => res,
        }
    }
}

fn hook(name: &'static str, kind: SignalKind) -> Option<Signal> {
    signal(kind)
        .inspect_err(|err| warn!(signal = name, %err, "cannot install signal handler"))
        .ok()
}

/// Never resolves for a handler that was not installed.
async fn recv(signal: &mut Option<Signal>) {
    match signal {
        Some(signal) => {
            if signal.recv().await.is_none() {
                std::future::pending::<()>().await;
            }
        }
        None => std::future::pending().await,
    }
}
