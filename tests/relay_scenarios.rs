//! End-to-end scenarios for the on-demand and scheduled pipelines.
//!
//! Feeds and the messaging gateway are replaced by in-memory fakes; every
//! other component is the real one, wired the way the binary wires it.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeDelta, TimeZone, Utc};
use newsdesk::delivery::{ChatId, DeliveryStatus, MessageTransport, ParseMode, SendError, SendOptions};
use newsdesk::digest::{DigestJob, DigestSettings};
use newsdesk::dispatch::{DispatchSettings, Dispatcher, Handled, InboundMessage};
use newsdesk::feed::{FeedFetcher, FeedItem, FeedRegistry, FeedSource, FetchError};
use newsdesk::subscribers::{InMemorySubscribers, SubscriberStore};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
}

fn item(title: &str, published_at: Option<DateTime<Utc>>) -> FeedItem {
    FeedItem {
        title: title.to_string(),
        link: format!("https://news.example.com/{}", title.len()),
        published_at,
        description: String::new(),
    }
}

fn hours_ago(hours: i64) -> Option<DateTime<Utc>> {
    Some(now() - TimeDelta::hours(hours))
}

/// Serves canned items per category; categories without an entry fail.
#[derive(Default)]
struct CannedFeeds {
    feeds: HashMap<String, Vec<FeedItem>>,
    calls: Mutex<Vec<String>>,
}

impl CannedFeeds {
    fn with(mut self, category: &str, items: Vec<FeedItem>) -> Self {
        self.feeds.insert(category.to_string(), items);
        self
    }
}

#[async_trait]
impl FeedFetcher for CannedFeeds {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<FeedItem>, FetchError> {
        self.calls.lock().unwrap().push(source.category.clone());
        self.feeds
            .get(&source.category)
            .cloned()
            .ok_or(FetchError::HttpStatus(500))
    }
}

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<(ChatId, String, SendOptions)>>,
    blocked: Vec<ChatId>,
}

impl Outbox {
    fn blocking(chats: &[ChatId]) -> Self {
        Self {
            blocked: chats.to_vec(),
            ..Self::default()
        }
    }

    fn texts_to(&self, chat_id: ChatId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _, _)| *c == chat_id)
            .map(|(_, text, _)| text.clone())
            .collect()
    }
}

#[async_trait]
impl MessageTransport for Outbox {
    async fn send(&self, chat_id: ChatId, text: &str, options: SendOptions) -> Result<(), SendError> {
        if self.blocked.contains(&chat_id) {
            return Err(SendError::RecipientUnreachable {
                chat_id,
                reason: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        self.sent.lock().unwrap().push((chat_id, text.to_string(), options));
        Ok(())
    }
}

struct Relay {
    dispatcher: Dispatcher,
    digest: DigestJob,
    outbox: Arc<Outbox>,
    feeds: Arc<CannedFeeds>,
    subscribers: Arc<InMemorySubscribers>,
}

fn relay(feeds: CannedFeeds, outbox: Outbox) -> Relay {
    let registry = Arc::new(FeedRegistry::with_default_feeds());
    let feeds = Arc::new(feeds);
    let outbox = Arc::new(outbox);
    let subscribers = Arc::new(InMemorySubscribers::new());
    let zone = FixedOffset::east_opt(0).unwrap();

    let dispatcher = Dispatcher::new(
        Arc::clone(&registry),
        feeds.clone(),
        outbox.clone(),
        subscribers.clone(),
        DispatchSettings {
            window: TimeDelta::hours(48),
            zone,
            chunk_limit: 4096,
        },
    )
    .with_clock(Arc::new(now));

    let digest = DigestJob::new(
        registry.lookup("tech").unwrap().clone(),
        feeds.clone(),
        outbox.clone(),
        subscribers.clone(),
        DigestSettings {
            window: TimeDelta::hours(24),
            zone,
            chunk_limit: 4096,
            fanout_concurrency: 4,
        },
    )
    .with_clock(Arc::new(now));

    Relay {
        dispatcher,
        digest,
        outbox,
        feeds,
        subscribers,
    }
}

fn text(chat_id: ChatId, text: &str) -> InboundMessage {
    InboundMessage {
        sender_id: Some(chat_id),
        chat_id,
        text: Some(text.to_string()),
    }
}

#[tokio::test]
async fn category_lookup_keeps_recent_items_grouped_by_day() {
    let feeds = CannedFeeds::default().with(
        "tech",
        vec![
            item("Chip launch", hours_ago(2)),
            item("Old rumour", hours_ago(72)),
            item("Compiler release", hours_ago(30)),
        ],
    );
    let relay = relay(feeds, Outbox::default());

    let handled = relay.dispatcher.handle(&text(1, "Tech ")).await.unwrap();
    assert_eq!(
        handled,
        Handled::Lookup {
            category: "tech".to_string(),
            items: 2,
            status: DeliveryStatus::Delivered,
        }
    );

    let texts = relay.outbox.texts_to(1);
    assert_eq!(texts.len(), 2);
    assert_eq!(texts[0], "Getting news for *tech*, please wait...");
    assert_eq!(
        texts[1],
        "📰 News for last 2 days in *tech*:\n\
         \n*2025-03-10:*\n\
         • [Chip launch](https://news.example.com/11)\n\n\
         \n*2025-03-09:*\n\
         • [Compiler release](https://news.example.com/16)\n\n"
    );
}

#[tokio::test]
async fn near_miss_category_falls_through_to_search() {
    let feeds = CannedFeeds::default()
        .with("tech", vec![item("TechCrunch launches a technology fund", hours_ago(1))])
        .with("business", vec![item("Technology stocks rally", hours_ago(5))]);
    let relay = relay(feeds, Outbox::default());

    let handled = relay.dispatcher.handle(&text(1, "technology")).await.unwrap();
    assert_eq!(
        handled,
        Handled::Search {
            hits: 2,
            status: DeliveryStatus::Delivered,
        }
    );

    // Every registered feed was tried
    assert_eq!(relay.feeds.calls.lock().unwrap().len(), 10);

    let texts = relay.outbox.texts_to(1);
    assert_eq!(texts[0], "Looking for recent news containing: *technology*");
    assert!(texts[1].starts_with("🟢 News headlines for \"*technology*\" (last 2 days):\n"));
    assert!(texts[1].contains("_(in tech)_"));
    assert!(texts[1].contains("_(in business)_"));
}

#[tokio::test]
async fn search_when_every_feed_fails_sends_no_results_notice() {
    let relay = relay(CannedFeeds::default(), Outbox::default());

    let handled = relay.dispatcher.handle(&text(3, "election")).await.unwrap();
    assert_eq!(handled, Handled::NoResults);

    let sent = relay.outbox.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].1, "No recent headlines found for this keyword in the last 2 days.");
    assert_eq!(sent[1].2.parse_mode, None);
}

#[tokio::test]
async fn search_skips_failed_feeds_and_stale_items() {
    let feeds = CannedFeeds::default().with(
        "world",
        vec![item("Summit opens", hours_ago(3)), item("Summit planned", hours_ago(60))],
    );
    let relay = relay(feeds, Outbox::default());

    let handled = relay.dispatcher.handle(&text(4, "SUMMIT")).await.unwrap();
    assert_eq!(
        handled,
        Handled::Search {
            hits: 1,
            status: DeliveryStatus::Delivered,
        }
    );
    let reply = relay.outbox.texts_to(4).pop().unwrap();
    assert!(reply.contains("Summit opens"));
    assert!(!reply.contains("Summit planned"));
}

#[tokio::test]
async fn failed_category_fetch_sends_apology() {
    let relay = relay(CannedFeeds::default(), Outbox::default());

    let handled = relay.dispatcher.handle(&text(5, "sports")).await.unwrap();
    assert_eq!(
        handled,
        Handled::LookupFailed {
            category: "sports".to_string()
        }
    );
    assert_eq!(relay.outbox.texts_to(5).last().map(String::as_str), Some("⚠️ Failed to fetch news."));
}

#[tokio::test]
async fn long_reply_is_chunked_in_order() {
    let items: Vec<FeedItem> = (0..200)
        .map(|i| item(&format!("Headline number {} with some padding text", i), hours_ago(1)))
        .collect();
    let relay = relay(CannedFeeds::default().with("world", items), Outbox::default());

    relay.dispatcher.handle(&text(6, "world")).await.unwrap();

    let sent = relay.outbox.sent.lock().unwrap();
    let chunks: Vec<&(ChatId, String, SendOptions)> = sent.iter().skip(1).collect();
    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|(_, t, o)| t.encode_utf16().count() <= 4096
        && o.parse_mode == Some(ParseMode::Markdown)));
    let joined: String = chunks.iter().map(|(_, t, _)| t.as_str()).collect();
    assert!(joined.starts_with("📰 News for last 2 days in *world*:"));
    assert!(joined.contains("Headline number 199 with some padding text"));
}

#[tokio::test]
async fn non_text_message_is_ignored_without_reply() {
    let relay = relay(CannedFeeds::default(), Outbox::default());
    let handled = relay
        .dispatcher
        .handle(&InboundMessage {
            sender_id: Some(1),
            chat_id: 1,
            text: None,
        })
        .await
        .unwrap();
    assert_eq!(handled, Handled::Ignored);
    assert!(relay.outbox.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn reply_to_blocked_chat_surfaces_as_unreachable() {
    let relay = relay(CannedFeeds::default(), Outbox::blocking(&[9]));
    let err = relay.dispatcher.handle(&text(9, "/start")).await.unwrap_err();
    assert!(err.is_recipient_unreachable());
    // Membership is recorded before the welcome is attempted
    assert_eq!(relay.subscribers.snapshot(), vec![9]);
}

#[tokio::test]
async fn digest_with_no_subscribers_fetches_and_delivers_nothing() {
    let relay = relay(
        CannedFeeds::default().with("tech", vec![item("Fresh", hours_ago(1))]),
        Outbox::default(),
    );

    let report = relay.digest.run().await.unwrap();
    assert_eq!(report.recipients, 0);
    assert_eq!(report.items, 1);
    assert_eq!(relay.feeds.calls.lock().unwrap().as_slice(), ["tech".to_string()]);
    assert!(relay.outbox.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn subscribers_receive_digest_despite_one_blocked_chat() {
    let relay = relay(
        CannedFeeds::default().with("tech", vec![item("Fresh", hours_ago(1)), item("Stale", hours_ago(25))]),
        Outbox::blocking(&[20]),
    );

    for chat in [10, 20, 30] {
        let _ = relay.dispatcher.handle(&text(chat, "/start")).await;
    }
    assert_eq!(relay.subscribers.len(), 3);

    let report = relay.digest.run().await.unwrap();
    assert_eq!(report.delivered, 2);
    assert_eq!(report.unreachable, 1);

    for chat in [10, 30] {
        let texts = relay.outbox.texts_to(chat);
        assert!(texts[0].starts_with("👋 Welcome!"));
        assert!(texts[1].starts_with("📰 *Daily tech Digest:*"));
        assert!(texts[1].contains("Fresh"));
        assert!(!texts[1].contains("Stale"));
    }
}
