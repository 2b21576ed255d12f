//! Bot API HTTP client.
//!
//! Every call goes through the standard response envelope
//! (`ok` / `result` / `error_code` / `description`), and failures come back
//! already classified as [`MessengerError`] variants.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use herald_common::messenger::{ChatAdministrator, Messenger, MessengerError};

use crate::types::{ChatMemberInfo, Message, Update};

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// HTTP timeout for plain calls; long polls get a per-request override.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Telegram Bot API client. Cheap to clone; the underlying HTTP client is
/// shared.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

/// Standard Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T, MessengerError> {
        if self.ok {
            self.result
                .ok_or_else(|| MessengerError::Api("ok response with no result".to_string()))
        } else {
            let retry_after = self.parameters.and_then(|p| p.retry_after);
            Err(classify(
                self.error_code.unwrap_or(0),
                self.description.as_deref().unwrap_or(""),
                retry_after,
            ))
        }
    }
}

/// Map a Bot API error onto the messenger failure taxonomy.
fn classify(error_code: i64, description: &str, retry_after: Option<u64>) -> MessengerError {
    let lower = description.to_ascii_lowercase();
    match error_code {
        429 => MessengerError::RateLimited {
            retry_after: retry_after.unwrap_or(1),
        },
        403 if lower.contains("blocked") => MessengerError::Blocked,
        403 if lower.contains("deactivated") => MessengerError::Deactivated,
        400 | 403 if lower.contains("chat not found") || lower.contains("user not found") => {
            MessengerError::ChatNotFound
        }
        _ => MessengerError::Api(format!("{error_code}: {description}")),
    }
}

impl TelegramClient {
    pub fn new(token: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: TELEGRAM_API_URL.to_string(),
            token: token.into(),
        })
    }

    /// Point the client at a different API host (local bot API servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &serde_json::Value,
    ) -> Result<T, MessengerError> {
        self.call_with_timeout(method, payload, None).await
    }

    async fn call_with_timeout<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &serde_json::Value,
        timeout: Option<Duration>,
    ) -> Result<T, MessengerError> {
        let url = format!("{}/bot{}/{}", self.base_url, self.token, method);
        let mut request = self.http.post(&url).json(payload);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MessengerError::Api(e.to_string()))?;
        let body: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| MessengerError::Api(e.to_string()))?;
        body.into_result()
    }

    /// Send a plain text message.
    pub async fn send_text(&self, chat_id: i64, text: &str) -> Result<Message, MessengerError> {
        self.call("sendMessage", &json!({ "chat_id": chat_id, "text": text }))
            .await
    }

    /// Send a text message as a reply to another message in the chat.
    pub async fn reply(
        &self,
        chat_id: i64,
        reply_to: i64,
        text: &str,
    ) -> Result<Message, MessengerError> {
        self.call(
            "sendMessage",
            &json!({
                "chat_id": chat_id,
                "text": text,
                "reply_to_message_id": reply_to,
            }),
        )
        .await
    }

    /// Long-poll for updates. The server holds the request for up to
    /// `timeout_secs`, so the HTTP timeout is stretched accordingly.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, MessengerError> {
        self.call_with_timeout(
            "getUpdates",
            &json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message"],
            }),
            Some(Duration::from_secs(timeout_secs + 10)),
        )
        .await
    }
}

impl Messenger for TelegramClient {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64, MessengerError> {
        let message = self.send_text(chat_id, text).await?;
        Ok(message.message_id)
    }

    async fn chat_administrators(
        &self,
        chat_id: i64,
    ) -> Result<Vec<ChatAdministrator>, MessengerError> {
        let admins: Vec<ChatMemberInfo> = self
            .call("getChatAdministrators", &json!({ "chat_id": chat_id }))
            .await?;
        Ok(admins
            .into_iter()
            .map(ChatMemberInfo::into_administrator)
            .collect())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), MessengerError> {
        let _: bool = self
            .call(
                "deleteMessage",
                &json!({ "chat_id": chat_id, "message_id": message_id }),
            )
            .await?;
        Ok(())
    }
}
