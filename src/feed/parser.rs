use super::types::FeedItem;
use crate::util::plain_text;
use anyhow::Result;
use feed_rs::parser;

/// Parse RSS or Atom bytes into normalised [`FeedItem`]s, in document order.
///
/// - The publish time is the entry's `published` date, falling back to `updated`.
/// - The description is the first non-empty plain-text rendering of the entry
///   content body or its summary (RSS `<description>`).
/// - Entries without a title are kept as "Untitled"; entries without a link
///   keep an empty link.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<FeedItem>> {
    let feed = parser::parse(bytes)?;

    let items = feed
        .entries
        .into_iter()
        .map(|entry| {
            let title = entry
                .title
                .map(|t| plain_text(&t.content))
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Untitled".to_string());
            let link = entry
                .links
                .first()
                .map(|l| l.href.trim().to_string())
                .unwrap_or_default();
            let published_at = entry.published.or(entry.updated);

            let candidates = [
                entry.content.and_then(|c| c.body),
                entry.summary.map(|s| s.content),
            ];
            let description = candidates
                .iter()
                .flatten()
                .map(|raw| plain_text(raw))
                .find(|text| !text.is_empty())
                .unwrap_or_default();

            FeedItem {
                title,
                link,
                published_at,
                description,
            }
        })
        .collect();

    Ok(items)
}
