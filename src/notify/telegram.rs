use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::MessageTransport;
use crate::config::{Secret, TelegramCredentials};
use crate::error::CallError;

pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

#[derive(Clone)]
pub struct TelegramNotifier {
    bot_token: Secret,
    chat_id: String,
    parse_mode: Option<String>,
    api_base: String,
    client: Client,
    timeout: Duration,
}

impl TelegramNotifier {
    pub fn new(creds: TelegramCredentials) -> Self {
        Self {
            bot_token: creds.bot_token,
            chat_id: creds.chat_id,
            parse_mode: Some("Markdown".into()),
            api_base: "https://api.telegram.org".into(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Empty string disables formatting.
    pub fn with_parse_mode(mut self, mode: &str) -> Self {
        self.parse_mode = Some(mode.to_string()).filter(|m| !m.is_empty());
        self
    }

    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token.expose(), method)
    }

    async fn post_message(&self, text: &str, parse_mode: Option<&str>) -> Result<(), CallError> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode,
        };
        let rsp = self
            .client
            .post(self.method_url("sendMessage"))
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(redact)?;

        let status = rsp.status();
        if !status.is_success() {
            let body = rsp.text().await.unwrap_or_default();
            return Err(CallError::from_status(status.as_u16(), &body));
        }
        Ok(())
    }

    /// `getMe`: returns the bot username.
    pub async fn get_me(&self) -> Result<String, CallError> {
        let rsp = self
            .client
            .get(self.method_url("getMe"))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(redact)?;
        let status = rsp.status();
        if !status.is_success() {
            let body = rsp.text().await.unwrap_or_default();
            return Err(CallError::from_status(status.as_u16(), &body));
        }
        let me: GetMe = rsp.json().await.map_err(redact)?;
        if !me.ok {
            return Err(CallError::Decode("getMe returned ok=false".into()));
        }
        Ok(me
            .result
            .and_then(|u| u.username)
            .unwrap_or_else(|| "unknown".into()))
    }
}

// reqwest errors embed the URL, which carries the bot token.
fn redact(e: reqwest::Error) -> CallError {
    CallError::from(e.without_url())
}

fn is_entity_parse_error(err: &CallError) -> bool {
    matches!(err, CallError::Status { status: 400, body } if body.to_lowercase().contains("can't parse entities"))
}

#[async_trait]
impl MessageTransport for TelegramNotifier {
    async fn send_message(&self, text: &str) -> Result<(), CallError> {
        match self.post_message(text, self.parse_mode.as_deref()).await {
            Err(e) if self.parse_mode.is_some() && is_entity_parse_error(&e) => {
                // a chunk boundary can split a Markdown entity
                tracing::warn!("telegram rejected markup, resending chunk as plain text");
                self.post_message(text, None).await
            }
            other => other,
        }
    }

    fn name(&self) -> &str {
        "telegram"
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

#[derive(Deserialize)]
struct GetMe {
    ok: bool,
    result: Option<BotUser>,
}

#[derive(Deserialize)]
struct BotUser {
    username: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_errors_are_detected() {
        let e = CallError::from_status(
            400,
            r#"{"ok":false,"description":"Bad Request: can't parse entities: Can't find end of the entity"}"#,
        );
        assert!(is_entity_parse_error(&e));
        assert!(!is_entity_parse_error(&CallError::from_status(400, "chat not found")));
        assert!(!is_entity_parse_error(&CallError::from_status(429, "can't parse entities")));
    }

    #[test]
    fn payload_omits_parse_mode_when_plain() {
        let p = SendMessage {
            chat_id: "1",
            text: "hi",
            parse_mode: None,
        };
        let v = serde_json::to_value(&p).unwrap();
        assert!(v.get("parse_mode").is_none());
    }
}
