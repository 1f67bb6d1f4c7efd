//! Outbound messaging.
//!
//! - [`transport`] - the gateway seam: [`MessageTransport`] and its typed errors
//! - [`telegram`] - Bot API implementation of the seam, plus update polling
//! - [`chunk`] - splitting long replies to fit the per-message limit and
//!   sending them in order

mod chunk;
pub mod telegram;
mod transport;

pub use chunk::{deliver, split_chunks, ChunkOutcome, DeliveryStatus, MESSAGE_LIMIT};
pub use telegram::TelegramClient;
pub use transport::{ChatId, MessageTransport, ParseMode, SendError, SendOptions};
