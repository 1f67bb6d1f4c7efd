use async_trait::async_trait;
use thiserror::Error;

/// Chat (or channel) identifier as the messaging gateway issues it.
pub type ChatId = i64;

/// Markup dialect the gateway should interpret message text in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Telegram legacy Markdown: `*bold*`, `_italic_`, `[text](url)`
    Markdown,
}

impl ParseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseMode::Markdown => "Markdown",
        }
    }
}

/// Per-send formatting options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    pub parse_mode: Option<ParseMode>,
    pub link_preview: bool,
}

impl SendOptions {
    /// Markdown with link previews, used for every news reply.
    pub fn markdown() -> Self {
        Self {
            parse_mode: Some(ParseMode::Markdown),
            link_preview: true,
        }
    }

    /// No markup at all.
    pub fn plain() -> Self {
        Self {
            parse_mode: None,
            link_preview: true,
        }
    }
}

/// Failure of a single outbound send.
#[derive(Debug, Error)]
pub enum SendError {
    /// The recipient blocked the bot, deleted the chat, or never started it.
    /// Expected in normal operation and never worth an error log.
    #[error("Recipient {chat_id} is unreachable: {reason}")]
    RecipientUnreachable { chat_id: ChatId, reason: String },

    /// Gateway flood control kicked in
    #[error("Rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    /// Any other error reported by the gateway API
    #[error("API error {code}: {description}")]
    Api { code: u16, description: String },

    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timed out")]
    Timeout,
}

impl SendError {
    pub fn is_recipient_unreachable(&self) -> bool {
        matches!(self, SendError::RecipientUnreachable { .. })
    }
}

/// Outbound half of the messaging gateway.
///
/// Implementations classify "this recipient can't be reached" as
/// [`SendError::RecipientUnreachable`] so callers never inspect error text.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send(&self, chat_id: ChatId, text: &str, options: SendOptions) -> Result<(), SendError>;
}
