//! Telegram Bot API gateway over plain HTTPS.
//!
//! Only the three methods the relay needs are implemented: `getMe` for the
//! startup check, `getUpdates` for long-poll intake and `sendMessage`.

use super::transport::{ChatId, MessageTransport, SendError, SendOptions};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const SEND_TIMEOUT: Duration = Duration::from_secs(30);
/// Extra time the HTTP request gets on top of the server-side long-poll timeout.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// A Telegram user or bot account.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: ChatId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    /// Absent for stickers, photos, joins and every other non-text message
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: ChatId,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    disable_web_page_preview: bool,
}

#[derive(Serialize)]
struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'static [&'static str],
}

/// Bot API client. Cheap to clone; the token never appears in `Debug` output
/// or in error messages.
#[derive(Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    api_base: String,
    token: SecretString,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_base", &self.api_base)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl TelegramClient {
    pub fn new(client: reqwest::Client, token: SecretString) -> Self {
        Self {
            client,
            api_base: DEFAULT_API_BASE.to_string(),
            token,
        }
    }

    /// Point the client at a different API host (a local Bot API server, or a
    /// mock in tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Identity of the bot the token belongs to. Used as a startup check.
    pub async fn get_me(&self) -> Result<User, SendError> {
        self.call("getMe", &serde_json::json!({}), None, SEND_TIMEOUT)
            .await
    }

    /// Long-poll for updates after `offset`, waiting up to `timeout_secs` on
    /// the server side when none are pending.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, SendError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout_secs,
            allowed_updates: &["message"],
        };
        let http_timeout = Duration::from_secs(timeout_secs) + POLL_GRACE;
        self.call("getUpdates", &request, None, http_timeout).await
    }

    async fn call<P, R>(
        &self,
        method: &str,
        payload: &P,
        recipient: Option<ChatId>,
        timeout: Duration,
    ) -> Result<R, SendError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!(
            "{}/bot{}/{}",
            self.api_base,
            self.token.expose_secret(),
            method
        );

        // reqwest embeds the request URL in its errors, and the URL carries
        // the token.
        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body: ApiResponse<R> = match response.json().await {
            Ok(body) => body,
            Err(e) if status.is_success() => return Err(map_reqwest_error(e)),
            Err(_) => {
                return Err(SendError::Api {
                    code: status.as_u16(),
                    description: status
                        .canonical_reason()
                        .unwrap_or("Unexpected response")
                        .to_string(),
                })
            }
        };

        if body.ok {
            if let Some(result) = body.result {
                return Ok(result);
            }
        }

        let code = body.error_code.unwrap_or_else(|| status.as_u16());
        let description = body
            .description
            .unwrap_or_else(|| "Unknown error".to_string());
        let retry_after = body.parameters.and_then(|p| p.retry_after);

        Err(classify_failure(recipient, code, description, retry_after))
    }
}

#[async_trait]
impl MessageTransport for TelegramClient {
    async fn send(&self, chat_id: ChatId, text: &str, options: SendOptions) -> Result<(), SendError> {
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode: options.parse_mode.map(|m| m.as_str()),
            disable_web_page_preview: !options.link_preview,
        };

        // The sent Message is returned but the relay has no use for it
        let _: serde_json::Value = self
            .call("sendMessage", &request, Some(chat_id), SEND_TIMEOUT)
            .await?;
        Ok(())
    }
}

/// Map an API failure onto [`SendError`].
///
/// Telegram answers 403 for every "this chat won't accept messages from you"
/// case (blocked, kicked, deactivated user, never started) and 400 "chat not
/// found" for deleted chats; those become `RecipientUnreachable` when a
/// recipient was involved.
fn classify_failure(
    recipient: Option<ChatId>,
    code: u16,
    description: String,
    retry_after: Option<u64>,
) -> SendError {
    match (recipient, code) {
        (Some(chat_id), 403) => SendError::RecipientUnreachable {
            chat_id,
            reason: description,
        },
        (Some(chat_id), 400) if description.to_lowercase().contains("chat not found") => {
            SendError::RecipientUnreachable {
                chat_id,
                reason: description,
            }
        }
        (_, 429) => SendError::RateLimited {
            retry_after: retry_after.unwrap_or(1),
        },
        _ => SendError::Api { code, description },
    }
}

fn map_reqwest_error(e: reqwest::Error) -> SendError {
    if e.is_timeout() {
        SendError::Timeout
    } else {
        SendError::Network(e.without_url())
    }
}
