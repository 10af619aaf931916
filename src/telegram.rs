use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// One entry from `getUpdates`.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

/// An inbound chat message. Non-text messages carry `text: None`.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Deserialize)]
struct Envelope<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

/// Errors raised by Bot API calls.
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("telegram request failed")]
    Http(#[from] reqwest::Error),
    #[error("telegram API returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("telegram API rejected the call: {description}")]
    Rejected { description: String },
}

/// Minimal Bot API client: long polling in, text replies out.
#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    base_url: String,
}

impl TelegramClient {
    /// Create a client for the given bot token against the public API host.
    pub fn new(token: &str) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, token)
    }

    /// Create a client against a custom host. Tests use this to target a
    /// local mock server.
    pub fn with_base_url(base_url: impl AsRef<str>, token: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: format!("{}/bot{}", base_url.as_ref(), token),
        }
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<Option<T>, TelegramError> {
        let resp = self
            .http
            .post(format!("{}/{}", self.base_url, method))
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TelegramError::Api {
                status: status.as_u16(),
                body,
            });
        }
        let envelope: Envelope<T> = resp.json().await?;
        if !envelope.ok {
            return Err(TelegramError::Rejected {
                description: envelope.description.unwrap_or_default(),
            });
        }
        Ok(envelope.result)
    }

    /// Long-poll for updates with ids at or above `offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        let updates: Option<Vec<Update>> = self
            .call(
                "getUpdates",
                json!({ "offset": offset, "timeout": timeout_secs }),
            )
            .await?;
        Ok(updates.unwrap_or_default())
    }

    /// Send one text reply to `chat_id`.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        self.call::<serde_json::Value>("sendMessage", json!({ "chat_id": chat_id, "text": text }))
            .await?;
        Ok(())
    }

    /// Show the "typing…" indicator in the chat.
    pub async fn send_typing(&self, chat_id: i64) -> Result<(), TelegramError> {
        self.call::<serde_json::Value>(
            "sendChatAction",
            json!({ "chat_id": chat_id, "action": "typing" }),
        )
        .await?;
        Ok(())
    }
}
