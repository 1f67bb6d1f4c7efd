//! Inbound message intake.
//!
//! Long-polls the Bot API for updates and hands each text-bearing message to
//! the [`Dispatcher`] in its own task, so a slow search never holds up the
//! next message.

use crate::delivery::telegram::Update;
use crate::delivery::{SendError, TelegramClient};
use crate::dispatch::{DispatchError, Dispatcher, InboundMessage};
use std::time::Duration;
use tokio::sync::watch;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Polling loop feeding the dispatcher.
pub struct Gateway {
    client: TelegramClient,
    dispatcher: Dispatcher,
    poll_timeout_secs: u64,
}

impl Gateway {
    pub fn new(client: TelegramClient, dispatcher: Dispatcher, poll_timeout_secs: u64) -> Self {
        Self {
            client,
            dispatcher,
            poll_timeout_secs,
        }
    }

    /// Poll until `shutdown` turns true or its sender is dropped.
    ///
    /// Polling failures never end the loop: rate limits wait the requested
    /// time, anything else backs off exponentially up to a minute.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(poll_timeout_secs = self.poll_timeout_secs, "Gateway polling started");

        let mut offset: Option<i64> = None;
        let mut backoff = INITIAL_BACKOFF;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let polled = tokio::select! {
                polled = self.client.get_updates(offset, self.poll_timeout_secs) => polled,
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            };

            let pause = match polled {
                Ok(updates) => {
                    backoff = INITIAL_BACKOFF;
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        if let Some(message) = into_inbound(update) {
                            self.spawn_handler(message);
                        }
                    }
                    continue;
                }
                Err(SendError::RateLimited { retry_after }) => {
                    tracing::warn!(retry_after, "Polling rate limited");
                    Duration::from_secs(retry_after)
                }
                Err(e) => {
                    tracing::warn!(error = %e, backoff_secs = backoff.as_secs(), "Polling for updates failed");
                    let pause = backoff;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    pause
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Gateway polling stopped");
    }

    fn spawn_handler(&self, message: InboundMessage) {
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            match dispatcher.handle(&message).await {
                Ok(handled) => tracing::debug!(chat_id = message.chat_id, ?handled, "Message handled"),
                Err(e) => report_failure(message.chat_id, &e),
            }
        });
    }
}

/// Convert an update into a message, dropping updates of other kinds.
pub fn into_inbound(update: Update) -> Option<InboundMessage> {
    let message = update.message?;
    Some(InboundMessage {
        sender_id: message.from.map(|user| user.id),
        chat_id: message.chat.id,
        text: message.text,
    })
}

/// Last-resort sink for handler failures: unreachable recipients are routine
/// and dropped, everything else is an error.
pub fn report_failure(chat_id: i64, error: &DispatchError) {
    if error.is_recipient_unreachable() {
        tracing::debug!(chat_id, error = %error, "Dropping reply to unreachable chat");
    } else {
        tracing::error!(chat_id, error = %error, "Failed to handle message");
    }
}
