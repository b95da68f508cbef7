use crate::error::Error;
use async_trait::async_trait;
use config::Telegram;
use orchestrator::notify::{AlertGateway, DeliveryError};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use std::time::Duration;
use tracing::trace;

/// Extra time on top of the long-poll timeout before a request is abandoned.
const REQUEST_SLACK: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IncomingMessage {
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Serialize)]
struct GetUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

/// Minimal Bot API client.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    /// `<api_base>/bot<token>`; never logged.
    endpoint: String,
}

impl TelegramClient {
    pub fn new(telegram: &Telegram) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(telegram.poll_timeout + REQUEST_SLACK)
            .build()?;
        Ok(Self {
            http,
            endpoint: format!(
                "{}/bot{}",
                telegram.api_base.trim_end_matches('/'),
                telegram.token.trim()
            ),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &impl Serialize,
    ) -> Result<T, Error> {
        trace!(method, "telegram request");
        let response: ApiResponse<T> = self
            .http
            .post(format!("{}/{method}", self.endpoint))
            .json(body)
            .send()
            .await?
            .json()
            .await?;
        into_result(response)
    }

    pub async fn get_me(&self) -> Result<User, Error> {
        self.call("getMe", &json!({})).await
    }

    /// Long-poll for messages with `update_id >= offset`.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: Duration,
    ) -> Result<Vec<Update>, Error> {
        let body = GetUpdates {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: ["message"],
        };
        self.call("getUpdates", &body).await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), Error> {
        let body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        let _: serde_json::Value = self.call("sendMessage", &body).await?;
        Ok(())
    }
}

fn into_result<T>(response: ApiResponse<T>) -> Result<T, Error> {
    match response {
        ApiResponse {
            ok: true,
            result: Some(result),
            ..
        } => Ok(result),
        ApiResponse { description, .. } => Err(Error::Api(
            description.unwrap_or_else(|| "response without result".to_string()),
        )),
    }
}

#[async_trait]
impl AlertGateway for TelegramClient {
    async fn send(&self, recipient: i64, text: &str) -> Result<(), DeliveryError> {
        self.send_message(recipient, text)
            .await
            .map_err(|err| match err {
                Error::Api(reason) => DeliveryError::Rejected(reason),
                other => DeliveryError::Transport(other.to_string()),
            })
    }
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_updates() {
        let raw = r#"{
            "ok": true,
            "result": [
                {"update_id": 10, "message": {"message_id": 1, "chat": {"id": 42, "type": "private"},
                 "from": {"id": 42, "is_bot": false, "username": "op"}, "text": "/status"}},
                {"update_id": 11, "edited_message": {}}
            ]
        }"#;
        let response: ApiResponse<Vec<Update>> = serde_json::from_str(raw).unwrap();
        let updates = into_result(response).unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].message.as_ref().unwrap().text.as_deref(), Some("/status"));
        assert!(updates[1].message.is_none());
    }

    #[test]
    fn api_errors_carry_description() {
        let raw = r#"{"ok": false, "error_code": 403, "description": "Forbidden: bot was blocked by the user"}"#;
        let response: ApiResponse<serde_json::Value> = serde_json::from_str(raw).unwrap();
        let err = into_result(response).unwrap_err();
        assert!(matches!(err, Error::Api(reason) if reason.contains("blocked")));
    }

    #[test]
    fn debug_hides_token() {
        let client = TelegramClient::new(&Telegram {
            token: "123:secret".into(),
            ..Default::default()
        })
        .unwrap();
        assert!(!format!("{client:?}").contains("secret"));
    }
}
