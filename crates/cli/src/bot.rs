use crate::{
    error::Error,
    supervisor::Service,
    telegram::{IncomingMessage, TelegramClient},
};
use async_trait::async_trait;
use orchestrator::{
    QueryService,
    domain::DiffStatus,
    notify::{Message, bold, code, escape},
    query::{DiffSummary, Endpoints, SnapshotSummary},
};
use probes::HostInfo;
use std::{collections::BTreeSet, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const ENDPOINTS_CAP: usize = 50;
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    Status,
    Diff,
    Report,
    Endpoints,
}

impl BotCommand {
    /// `/status`, `/status@my_bot` and `/status extra words` all parse.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?.strip_prefix('/')?;
        let name = word.split_once('@').map_or(word, |(name, _)| name);
        Some(match name.to_ascii_lowercase().as_str() {
            "start" => Self::Start,
            "help" => Self::Help,
            "status" => Self::Status,
            "diff" => Self::Diff,
            "report" => Self::Report,
            "endpoints" => Self::Endpoints,
            _ => return None,
        })
    }
}

/// Doubling delay between failed polls, capped.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    initial: Duration,
    max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30))
    }
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            current: initial,
            initial,
            max,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Answers operator commands over Telegram, reading only the stored state.
pub struct QueryBot {
    client: Arc<TelegramClient>,
    query: QueryService,
    allowed: BTreeSet<i64>,
    poll_timeout: Duration,
}

impl QueryBot {
    pub fn new(
        client: Arc<TelegramClient>,
        query: QueryService,
        allowed: impl IntoIterator<Item = i64>,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            client,
            query,
            allowed: allowed.into_iter().collect(),
            poll_timeout,
        }
    }

    fn is_allowed(&self, message: &IncomingMessage) -> bool {
        self.allowed.contains(&message.chat.id)
            || message
                .from
                .as_ref()
                .is_some_and(|user| self.allowed.contains(&user.id))
    }

    async fn handle(&self, message: IncomingMessage) {
        let chat = message.chat.id;
        let reply = if self.is_allowed(&message) {
            let command = message.text.as_deref().and_then(BotCommand::parse);
            debug!(chat, ?command, "query received");
            self.answer(command.unwrap_or(BotCommand::Help)).await
        } else {
            let user = message.from.as_ref().map_or(chat, |user| user.id);
            info!(chat, user, "query from unknown user rejected");
            access_denied(user)
        };

        if let Err(err) = self.client.send_message(chat, &reply).await {
            warn!(chat, %err, "reply failed");
        }
    }

    async fn answer(&self, command: BotCommand) -> String {
        let rendered = match command {
            BotCommand::Start | BotCommand::Help => Ok(help()),
            BotCommand::Status => match self.query.latest_snapshot_summary().await {
                Ok(summary) => {
                    let host = tokio::task::spawn_blocking(HostInfo::collect).await.ok();
                    Ok(render_status(summary.as_ref(), host.as_ref()))
                }
                Err(err) => Err(err),
            },
            BotCommand::Diff => self
                .query
                .latest_diff_summary()
                .await
                .map(|diff| render_diff(diff.as_ref())),
            BotCommand::Report => self.query.combined_report().await.map(|report| {
                format!(
                    "{}\n\n{}",
                    render_status(report.snapshot.as_ref(), None),
                    render_diff(report.diff.as_ref())
                )
            }),
            BotCommand::Endpoints => self
                .query
                .endpoints()
                .await
                .map(|endpoints| render_endpoints(endpoints.as_ref())),
        };
        rendered.unwrap_or_else(|err| {
            warn!(?command, %err, "query failed");
            Message::titled("Could not read the stored state.").build()
        })
    }

    async fn poll(&self, cancel: &CancellationToken) {
        let mut offset = None;
        let mut backoff = Backoff::default();
        loop {
            let polled = tokio::select! {
                _ = cancel.cancelled() => return,
                polled = self.client.get_updates(offset, self.poll_timeout) => polled,
            };
            match polled {
                Ok(updates) => {
                    backoff.reset();
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        if let Some(message) = update.message {
                            self.handle(message).await;
                        }
                    }
                }
                Err(err) => {
                    let delay = backoff.next_delay();
                    warn!(%err, ?delay, "polling failed");
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}

#[async_trait]
impl Service for QueryBot {
    fn name(&self) -> &'static str {
        "query-bot"
    }

    async fn run(self: Box<Self>, cancel: CancellationToken) -> Result<(), Error> {
        info!(allowed = self.allowed.len(), "query bot started");
        self.poll(&cancel).await;
        info!("query bot stopped");
        Ok(())
    }
}

impl std::fmt::Debug for QueryBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBot")
            .field("allowed", &self.allowed)
            .field("poll_timeout", &self.poll_timeout)
            .finish()
    }
}

pub fn help() -> String {
    Message::titled("secwatch")
        .line("/status - current checks and host info")
        .line("/diff - what changed in the last sample")
        .line("/report - checks and changes together")
        .line("/endpoints - listening sockets")
        .line("/help - this message")
        .build()
}

pub fn access_denied(user: i64) -> String {
    Message::titled("Access denied.")
        .line(format!("Your id is {}.", code(user)))
        .line("Ask the operator to add it to telegram.recipients.")
        .build()
}

pub fn render_status(summary: Option<&SnapshotSummary>, host: Option<&HostInfo>) -> String {
    let mut message = match summary {
        Some(summary) => {
            let mut message = Message::titled(&format!(
                "Status: {}",
                summary.overall().as_str().to_uppercase()
            ))
            .line(format!("<i>{}</i>", summary.ts.format(TIME_FORMAT)));
            for category in &summary.categories {
                message = message.line(format!(
                    "{} {}: {}",
                    code(category.status),
                    bold(category.category),
                    escape(&category.details)
                ));
            }
            message
        }
        None => Message::titled("No snapshot yet."),
    };
    if let Some(host) = host {
        message = message
            .blank()
            .line(format!("host: {}", code(&host.hostname)))
            .line(format!("os: {}", escape(&host.os)))
            .line(format!("uptime: {}", escape(&host.uptime())))
            .line(format!("memory: {}", escape(&host.memory())))
            .line(format!("load: {}", escape(&host.load())));
    }
    message.build()
}

pub fn render_diff(diff: Option<&DiffSummary>) -> String {
    let Some(diff) = diff else {
        return Message::titled("No diff yet.").build();
    };
    let title = match diff.status {
        DiffStatus::Ok => "Diff: no changes",
        DiffStatus::Warn => "Diff: changes detected",
    };
    let mut message = Message::titled(title).line(code(&diff.details));
    for change in &diff.changes {
        let status = |s: Option<probes::CheckStatus>| s.map_or("-", |s| s.as_str());
        message = message.line(format!(
            "{}: {} → {}",
            bold(change.category),
            status(change.before),
            status(change.after)
        ));
    }
    message.build()
}

pub fn render_endpoints(endpoints: Option<&Endpoints>) -> String {
    match endpoints {
        Some(endpoints) if !endpoints.sockets.is_empty() => {
            Message::titled(&format!("Listening sockets: {}", endpoints.sockets.len()))
                .line(format!("<i>{}</i>", endpoints.ts.format(TIME_FORMAT)))
                .items(&endpoints.sockets, ENDPOINTS_CAP)
                .build()
        }
        Some(_) => Message::titled("No listening sockets.").build(),
        None => Message::titled("No port data yet. Is the ports check enabled?").build(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use orchestrator::{
        notify::Socket,
        query::{CategorySummary, ChangeSummary},
    };
    use pretty_assertions::assert_eq;
    use probes::{Category, CheckStatus};

    #[test]
    fn parses_commands() {
        assert_eq!(BotCommand::parse("/status"), Some(BotCommand::Status));
        assert_eq!(BotCommand::parse("  /Diff@secwatch_bot now"), Some(BotCommand::Diff));
        assert_eq!(BotCommand::parse("/endpoints"), Some(BotCommand::Endpoints));
        assert_eq!(BotCommand::parse("status"), None);
        assert_eq!(BotCommand::parse("/reboot"), None);
        assert_eq!(BotCommand::parse(""), None);
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        let mut backoff = Backoff::default();
        let delays: Vec<u64> = (0..7).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn denial_shows_user_id() {
        let text = access_denied(1234);
        assert!(text.contains("<code>1234</code>"));
    }

    #[test]
    fn status_lists_categories_and_host() {
        let summary = SnapshotSummary {
            ts: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            categories: vec![
                CategorySummary {
                    category: Category::Ports,
                    status: CheckStatus::Ok,
                    details: "entries=3".into(),
                },
                CategorySummary {
                    category: Category::Ssh,
                    status: CheckStatus::Warn,
                    details: "sshd_config_not_found".into(),
                },
            ],
        };
        let host = HostInfo {
            hostname: "web-1".into(),
            os: "Linux <test>".into(),
            uptime: Duration::from_secs(3_660),
            memory_total: 1024,
            memory_used: 512,
            load_average: [0.5, 0.25, 0.75],
        };
        let text = render_status(Some(&summary), Some(&host));
        assert!(text.starts_with("<b>Status: WARN</b>\n<i>2025-03-01 12:00:00 UTC</i>"));
        assert!(text.contains("<code>ok</code> <b>ports</b>: entries=3"));
        assert!(text.contains("host: <code>web-1</code>"));
        assert!(text.contains("os: Linux &lt;test&gt;"));
        assert!(text.contains("load: 0.50 0.25 0.75"));

        assert_eq!(render_status(None, None), "<b>No snapshot yet.</b>");
    }

    #[test]
    fn diff_lists_transitions() {
        let diff = DiffSummary {
            status: DiffStatus::Warn,
            details: "changed=1".into(),
            changes: vec![ChangeSummary {
                category: Category::Firewall,
                before: None,
                after: Some(CheckStatus::Crit),
            }],
        };
        assert_eq!(
            render_diff(Some(&diff)),
            "<b>Diff: changes detected</b>\n<code>changed=1</code>\n<b>firewall</b>: - → crit"
        );
        assert_eq!(render_diff(None), "<b>No diff yet.</b>");
    }

    #[test]
    fn endpoints_are_listed() {
        let endpoints = Endpoints {
            ts: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            sockets: vec![Socket {
                proto: "tcp".into(),
                ip: "::".into(),
                port: 22,
            }],
        };
        let text = render_endpoints(Some(&endpoints));
        assert!(text.contains("<code>[::]:22 tcp</code>"));
        assert!(render_endpoints(None).contains("No port data"));
    }
}
