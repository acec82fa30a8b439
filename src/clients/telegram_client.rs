use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TransportError;
use crate::models::update::UpdateEnvelope;
use crate::service::transport::{Formatting, MessageSender, UpdateSource, POLL_GRACE};

const TELEGRAM_API_URL: &str = "https://api.telegram.org";
const SEND_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    offset: i64,
    timeout: u64,
    allowed_updates: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    #[serde(default)]
    from: Option<User>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
}

// Non-text updates keep their id so the offset still moves past them.
fn into_envelope(update: Update) -> UpdateEnvelope {
    match update.message {
        Some(message) => UpdateEnvelope {
            id: update.update_id,
            sender_id: message.from.map(|u| u.id.to_string()).unwrap_or_default(),
            chat_id: message.chat.id.to_string(),
            text: message.text.unwrap_or_default(),
        },
        None => UpdateEnvelope::new(update.update_id, "", "", ""),
    }
}

/// Telegram Bot API over plain HTTPS long polling.
pub struct TelegramClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
            base_url: TELEGRAM_API_URL.to_string(),
        }
    }

    /// Point the client at another server (tests, self-hosted Bot API).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn call<B, T>(&self, method: &str, body: &B, timeout: Duration) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}/bot{}/{}", self.base_url, self.token, method);
        let response = self
            .http
            .post(url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(e, timeout))?;

        let parsed: ApiResponse<T> = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => return Err(TransportError::Decode(e.to_string())),
            Err(_) => {
                return Err(TransportError::Api {
                    status: status.as_u16(),
                    description: text,
                });
            }
        };

        if !parsed.ok || !status.is_success() {
            return Err(TransportError::Api {
                status: parsed.error_code.unwrap_or(status.as_u16()),
                description: parsed.description.unwrap_or_default(),
            });
        }
        parsed
            .result
            .ok_or_else(|| TransportError::Decode(format!("{method} returned no result")))
    }
}

// The request URL embeds the bot token, so it is stripped from error text.
fn map_reqwest_error(error: reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(timeout)
    } else {
        TransportError::Network(error.without_url().to_string())
    }
}

#[async_trait]
impl UpdateSource for TelegramClient {
    async fn poll_updates(
        &self,
        offset: i64,
        wait: Duration,
    ) -> Result<Vec<UpdateEnvelope>, TransportError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: wait.as_secs(),
            allowed_updates: vec!["message"],
        };
        let updates: Vec<Update> = self.call("getUpdates", &request, wait + POLL_GRACE).await?;
        debug!(offset, count = updates.len(), "polled updates");
        Ok(updates.into_iter().map(into_envelope).collect())
    }
}

#[async_trait]
impl MessageSender for TelegramClient {
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        formatting: Formatting,
    ) -> Result<(), TransportError> {
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode: match formatting {
                Formatting::Plain => None,
                Formatting::Markdown => Some("Markdown"),
            },
            disable_web_page_preview: true,
        };
        let _: serde_json::Value = self.call("sendMessage", &request, SEND_TIMEOUT).await?;
        Ok(())
    }
}
