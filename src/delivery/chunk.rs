use super::transport::{ChatId, MessageTransport, SendError, SendOptions};

/// Telegram's per-message text limit, in UTF-16 code units.
pub const MESSAGE_LIMIT: usize = 4096;

/// How far back from the limit a line break may sit and still be used as the
/// split point.
const NEWLINE_WINDOW: usize = 100;

/// Result of sending one chunk.
#[derive(Debug)]
pub enum ChunkOutcome {
    Sent,
    /// The recipient blocked the bot or no longer exists
    Unreachable,
    Failed(SendError),
}

/// Rolled-up result of one [`deliver`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// Every chunk was accepted
    Delivered,
    /// At least one chunk bounced because the recipient is unreachable
    Unreachable,
    /// At least one chunk failed for another reason
    Failed,
}

impl DeliveryStatus {
    pub fn from_outcomes(outcomes: &[ChunkOutcome]) -> Self {
        if outcomes.iter().any(|o| matches!(o, ChunkOutcome::Unreachable)) {
            DeliveryStatus::Unreachable
        } else if outcomes.iter().any(|o| matches!(o, ChunkOutcome::Failed(_))) {
            DeliveryStatus::Failed
        } else {
            DeliveryStatus::Delivered
        }
    }
}

/// Split `text` into consecutive slices of at most `limit` UTF-16 units.
///
/// Each slice takes as much as fits; when the text continues past the limit
/// and a line break falls within the last [`NEWLINE_WINDOW`] units of the
/// slice, the slice ends just before that break instead, so entries stay
/// whole where possible. The break itself starts the next slice.
///
/// Concatenating the returned slices always reproduces `text` exactly.
pub fn split_chunks(text: &str, limit: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let mut units = 0usize;
        let mut end = rest.len();
        let mut last_newline: Option<(usize, usize)> = None; // (byte offset, unit offset)

        for (idx, c) in rest.char_indices() {
            let width = c.len_utf16();
            if units + width > limit {
                end = idx;
                break;
            }
            if c == '\n' {
                last_newline = Some((idx, units));
            }
            units += width;
        }

        if end < rest.len() {
            if let Some((byte, unit)) = last_newline {
                if unit > 0 && unit > limit.saturating_sub(NEWLINE_WINDOW) {
                    end = byte;
                }
            }
        }

        // A limit narrower than a single character would otherwise never advance
        if end == 0 {
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }

        let (chunk, tail) = rest.split_at(end);
        chunks.push(chunk);
        rest = tail;
    }

    chunks
}

/// Send `text` to `chat_id` as one or more chunks, strictly in order.
///
/// Never returns an error: every chunk is attempted even after an earlier one
/// failed, and each attempt's outcome is reported. Unreachable recipients are
/// logged at debug level only; other failures are logged as warnings.
pub async fn deliver(
    transport: &dyn MessageTransport,
    chat_id: ChatId,
    text: &str,
    options: SendOptions,
    limit: usize,
) -> Vec<ChunkOutcome> {
    let chunks = split_chunks(text, limit);
    let total = chunks.len();
    let mut outcomes = Vec::with_capacity(total);

    for (index, chunk) in chunks.into_iter().enumerate() {
        let outcome = match transport.send(chat_id, chunk, options).await {
            Ok(()) => ChunkOutcome::Sent,
            Err(e) if e.is_recipient_unreachable() => {
                tracing::debug!(chat_id, chunk = index + 1, total, error = %e, "Recipient unreachable");
                ChunkOutcome::Unreachable
            }
            Err(e) => {
                tracing::warn!(chat_id, chunk = index + 1, total, error = %e, "Failed to send message chunk");
                ChunkOutcome::Failed(e)
            }
        };
        outcomes.push(outcome);
    }

    outcomes
}
