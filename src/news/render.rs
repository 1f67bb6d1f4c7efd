//! Reply text for every bot response, in Telegram legacy-Markdown.
//!
//! Day headers are bold, descriptions italic, entries `[title](url)` links.
//! Feed-supplied text is passed through [`neutralize_markdown`] first so a
//! stray `_` or `[` in a headline can't break the surrounding markup.

use super::search::SearchHit;
use super::window::GroupedResult;
use crate::feed::FeedItem;
use crate::util::{escape_link_target, neutralize_markdown};
use chrono::TimeDelta;

/// Human phrase for a lookback window: 48h → "last 2 days", 24h → "last 24 hours".
pub fn describe_window(window: TimeDelta) -> String {
    let hours = window.num_hours();
    if hours > 24 && hours % 24 == 0 {
        format!("last {} days", hours / 24)
    } else if hours == 1 {
        "last hour".to_string()
    } else {
        format!("last {} hours", hours)
    }
}

/// Reply to a single-category lookup.
pub fn render_category(category: &str, grouped: &GroupedResult<FeedItem>, window: TimeDelta) -> String {
    let period = describe_window(window);
    let mut reply = format!(
        "📰 News for {} in *{}*:\n",
        period,
        neutralize_markdown(category)
    );
    push_item_days(&mut reply, grouped);
    if grouped.is_empty() {
        reply.push_str(&format!("\nNo news found for the {}!", period));
    }
    reply
}

/// The scheduled digest body, identical for every subscriber.
pub fn render_digest(category: &str, grouped: &GroupedResult<FeedItem>, window: TimeDelta) -> String {
    let mut reply = format!("📰 *Daily {} Digest:*\n", neutralize_markdown(category));
    push_item_days(&mut reply, grouped);
    if grouped.is_empty() {
        reply.push_str(&format!("\nNo headlines in the {}!", describe_window(window)));
    }
    reply
}

/// Reply to a keyword search with at least one hit. Each entry names the
/// category it was found in.
pub fn render_search(query: &str, grouped: &GroupedResult<SearchHit>, window: TimeDelta) -> String {
    let mut reply = format!(
        "🟢 News headlines for \"*{}*\" ({}):\n",
        neutralize_markdown(query.trim()),
        describe_window(window)
    );
    for (day, hits) in grouped.days() {
        reply.push_str(&format!("\n*{}:*\n", day));
        for hit in hits {
            push_entry(&mut reply, &hit.item, Some(&hit.category));
        }
    }
    reply
}

/// Sent instead of [`render_search`] when nothing matched.
pub fn search_no_results(window: TimeDelta) -> String {
    format!(
        "No recent headlines found for this keyword in the {}.",
        describe_window(window)
    )
}

pub fn lookup_ack(category: &str) -> String {
    format!(
        "Getting news for *{}*, please wait...",
        neutralize_markdown(category)
    )
}

pub fn search_ack(query: &str) -> String {
    format!(
        "Looking for recent news containing: *{}*",
        neutralize_markdown(query.trim())
    )
}

pub const FETCH_FAILED: &str = "⚠️ Failed to fetch news.";

/// Greeting sent on subscribe, listing the categories that can be looked up.
pub fn welcome<'a>(categories: impl IntoIterator<Item = &'a str>) -> String {
    let listed: Vec<String> = categories
        .into_iter()
        .map(|c| format!("`{}`", neutralize_markdown(c)))
        .collect();
    format!(
        "👋 Welcome! Type a category like {} or any keyword to see news. \
         You will also receive daily digests if you stay subscribed.",
        listed.join(", ")
    )
}

fn push_item_days(reply: &mut String, grouped: &GroupedResult<FeedItem>) {
    for (day, items) in grouped.days() {
        reply.push_str(&format!("\n*{}:*\n", day));
        for item in items {
            push_entry(reply, item, None);
        }
    }
}

fn push_entry(reply: &mut String, item: &FeedItem, category: Option<&str>) {
    let title = neutralize_markdown(&item.title);
    if item.link.is_empty() {
        reply.push_str(&format!("• {}", title));
    } else {
        reply.push_str(&format!("• [{}]({})", title, escape_link_target(&item.link)));
    }
    if let Some(category) = category {
        reply.push_str(&format!(" _(in {})_", neutralize_markdown(category)));
    }
    reply.push('\n');

    if !item.description.is_empty() {
        reply.push_str(&format!("   _{}_\n", neutralize_markdown(&item.description)));
    }
    reply.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::news::window::DayKey;
    use chrono::{FixedOffset, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn item(title: &str, link: &str, day: u32, description: &str) -> (DayKey, FeedItem) {
        let published = Utc.with_ymd_and_hms(2025, 10, day, 9, 0, 0).unwrap();
        (
            DayKey::of(published, utc()),
            FeedItem {
                title: title.to_string(),
                link: link.to_string(),
                published_at: Some(published),
                description: description.to_string(),
            },
        )
    }

    fn grouped(entries: Vec<(DayKey, FeedItem)>) -> GroupedResult<FeedItem> {
        let mut grouped = GroupedResult::new();
        for (day, item) in entries {
            grouped.push(day, item);
        }
        grouped
    }

    #[test]
    fn test_describe_window() {
        assert_eq!(describe_window(TimeDelta::hours(48)), "last 2 days");
        assert_eq!(describe_window(TimeDelta::hours(24)), "last 24 hours");
        assert_eq!(describe_window(TimeDelta::hours(36)), "last 36 hours");
        assert_eq!(describe_window(TimeDelta::hours(1)), "last hour");
    }

    #[test]
    fn test_render_category_days_descending() {
        let grouped = grouped(vec![
            item("Older", "https://example.com/old", 5, ""),
            item("Newer", "https://example.com/new", 6, "Some context"),
        ]);

        let text = render_category("tech", &grouped, TimeDelta::hours(48));
        assert_eq!(
            text,
            "📰 News for last 2 days in *tech*:\n\
             \n*2025-10-06:*\n\
             • [Newer](https://example.com/new)\n\
             \x20  _Some context_\n\
             \n\
             \n*2025-10-05:*\n\
             • [Older](https://example.com/old)\n\
             \n"
        );
    }

    #[test]
    fn test_render_category_empty() {
        let text = render_category("world", &GroupedResult::new(), TimeDelta::hours(48));
        assert_eq!(
            text,
            "📰 News for last 2 days in *world*:\n\nNo news found for the last 2 days!"
        );
    }

    #[test]
    fn test_render_digest_empty() {
        let text = render_digest("tech", &GroupedResult::new(), TimeDelta::hours(24));
        assert_eq!(
            text,
            "📰 *Daily tech Digest:*\n\nNo headlines in the last 24 hours!"
        );
    }

    #[test]
    fn test_render_search_annotates_category() {
        let (day, it) = item("Apple unveils chip", "https://example.com/a", 6, "");
        let mut grouped = GroupedResult::new();
        grouped.push(
            day,
            SearchHit {
                item: it,
                category: "tech".to_string(),
            },
        );

        let text = render_search(" apple ", &grouped, TimeDelta::hours(48));
        assert_eq!(
            text,
            "🟢 News headlines for \"*apple*\" (last 2 days):\n\
             \n*2025-10-06:*\n\
             • [Apple unveils chip](https://example.com/a) _(in tech)_\n\
             \n"
        );
    }

    #[test]
    fn test_feed_text_cannot_break_markup() {
        let grouped = grouped(vec![item(
            "[Live] snake_case *news*",
            "https://example.com/x_(y)",
            6,
            "under_score",
        )]);

        let text = render_category("tech", &grouped, TimeDelta::hours(48));
        assert!(text.contains("• [(Live) snake case news](https://example.com/x_%28y%29)\n"));
        assert!(text.contains("   _under score_\n"));
    }

    #[test]
    fn test_linkless_item_rendered_as_plain_title() {
        let grouped = grouped(vec![item("No link", "", 6, "")]);
        let text = render_category("tech", &grouped, TimeDelta::hours(48));
        assert!(text.contains("• No link\n"));
    }

    #[test]
    fn test_notices() {
        assert_eq!(
            search_no_results(TimeDelta::hours(48)),
            "No recent headlines found for this keyword in the last 2 days."
        );
        assert_eq!(lookup_ack("tech"), "Getting news for *tech*, please wait...");
        assert_eq!(
            search_ack("  Apple "),
            "Looking for recent news containing: *Apple*"
        );
    }

    #[test]
    fn test_welcome_lists_categories() {
        let text = welcome(["tech", "world"]);
        assert!(text.starts_with("👋 Welcome! Type a category like `tech`, `world` or any keyword"));
    }
}
