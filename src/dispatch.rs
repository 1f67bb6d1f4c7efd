//! Per-message routing: subscribe, single-category lookup, or keyword search.
//!
//! Each inbound message is handled on its own; the only state shared between
//! messages is the subscriber set.

use crate::delivery::{deliver, ChatId, DeliveryStatus, MessageTransport, SendError, SendOptions};
use crate::feed::{fetch_all, FeedFetcher, FeedRegistry, FeedSource};
use crate::news::{collect_hits, filter_and_group, render, TimeWindow};
use crate::subscribers::SubscriberStore;
use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Message text that subscribes the sending chat to the daily digest.
pub const SUBSCRIBE_TRIGGER: &str = "/start";

/// Source of "now"; injectable so tests can pin the time window.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// A message as delivered by the messaging gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender_id: Option<i64>,
    pub chat_id: ChatId,
    /// `None` for non-text messages (stickers, photos, service messages)
    pub text: Option<String>,
}

/// Knobs for the on-demand pipelines.
#[derive(Debug, Clone, Copy)]
pub struct DispatchSettings {
    /// Lookback for both category lookups and keyword searches
    pub window: TimeDelta,
    /// Reference zone for day grouping
    pub zone: FixedOffset,
    pub chunk_limit: usize,
}

/// Where a message goes.
#[derive(Debug, PartialEq, Eq)]
pub enum Route<'a> {
    Subscribe,
    Category(&'a FeedSource),
    /// Free-text search; holds the trimmed input as the user typed it
    Search(String),
    /// Nothing to act on (non-text or blank message)
    Ignore,
}

/// What handling a message amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handled {
    Ignored,
    Subscribed { newly_added: bool },
    Lookup { category: String, items: usize, status: DeliveryStatus },
    LookupFailed { category: String },
    Search { hits: usize, status: DeliveryStatus },
    NoResults,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// A short reply (welcome, acknowledgement, notice) could not be sent
    #[error("Failed to send reply: {0}")]
    Send(#[from] SendError),
}

impl DispatchError {
    pub fn is_recipient_unreachable(&self) -> bool {
        match self {
            DispatchError::Send(e) => e.is_recipient_unreachable(),
        }
    }
}

/// Routes inbound messages through fetch → filter → render → deliver.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<FeedRegistry>,
    fetcher: Arc<dyn FeedFetcher>,
    transport: Arc<dyn MessageTransport>,
    subscribers: Arc<dyn SubscriberStore>,
    settings: DispatchSettings,
    clock: Clock,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<FeedRegistry>,
        fetcher: Arc<dyn FeedFetcher>,
        transport: Arc<dyn MessageTransport>,
        subscribers: Arc<dyn SubscriberStore>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            registry,
            fetcher,
            transport,
            subscribers,
            settings,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Classify message text.
    ///
    /// The subscribe trigger is matched case-insensitively; category keys
    /// exactly after trimming and case-folding; anything else non-blank is a
    /// keyword search.
    pub fn route<'a>(&'a self, text: Option<&str>) -> Route<'a> {
        let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
            return Route::Ignore;
        };

        if text.eq_ignore_ascii_case(SUBSCRIBE_TRIGGER) {
            return Route::Subscribe;
        }

        match self.registry.lookup(text) {
            Some(source) => Route::Category(source),
            None => Route::Search(text.to_string()),
        }
    }

    /// Handle one inbound message end to end.
    ///
    /// # Errors
    ///
    /// Only failures to send the short replies (welcome, acknowledgement,
    /// notices) are returned. Feed failures are handled here, and chunked
    /// news delivery reports through [`Handled`] instead.
    pub async fn handle(&self, message: &InboundMessage) -> Result<Handled, DispatchError> {
        let chat_id = message.chat_id;

        match self.route(message.text.as_deref()) {
            Route::Ignore => {
                tracing::trace!(chat_id, "Ignoring non-text or blank message");
                Ok(Handled::Ignored)
            }
            Route::Subscribe => self.subscribe(chat_id).await,
            Route::Category(source) => self.lookup(chat_id, source).await,
            Route::Search(query) => self.search(chat_id, &query).await,
        }
    }

    async fn subscribe(&self, chat_id: ChatId) -> Result<Handled, DispatchError> {
        let newly_added = self.subscribers.add(chat_id);
        if newly_added {
            tracing::info!(chat_id, subscribers = self.subscribers.len(), "New digest subscriber");
        }

        let text = render::welcome(self.registry.categories());
        self.transport
            .send(chat_id, &text, SendOptions::markdown())
            .await?;

        Ok(Handled::Subscribed { newly_added })
    }

    async fn lookup(&self, chat_id: ChatId, source: &FeedSource) -> Result<Handled, DispatchError> {
        self.transport
            .send(chat_id, &render::lookup_ack(&source.category), SendOptions::markdown())
            .await?;

        let items = match self.fetcher.fetch(source).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(chat_id, category = %source.category, error = %e, "Category lookup fetch failed");
                self.transport
                    .send(chat_id, render::FETCH_FAILED, SendOptions::plain())
                    .await?;
                return Ok(Handled::LookupFailed {
                    category: source.category.clone(),
                });
            }
        };

        let window = TimeWindow::ending_at((self.clock)(), self.settings.window);
        let grouped = filter_and_group(items, &window, self.settings.zone);
        let reply = render::render_category(&source.category, &grouped, self.settings.window);

        let outcomes = deliver(
            self.transport.as_ref(),
            chat_id,
            &reply,
            SendOptions::markdown(),
            self.settings.chunk_limit,
        )
        .await;

        tracing::debug!(chat_id, category = %source.category, items = grouped.item_count(), "Category lookup answered");

        Ok(Handled::Lookup {
            category: source.category.clone(),
            items: grouped.item_count(),
            status: DeliveryStatus::from_outcomes(&outcomes),
        })
    }

    async fn search(&self, chat_id: ChatId, query: &str) -> Result<Handled, DispatchError> {
        self.transport
            .send(chat_id, &render::search_ack(query), SendOptions::markdown())
            .await?;

        let results = fetch_all(Arc::clone(&self.fetcher), self.registry.sources()).await;
        let failed = results.iter().filter(|r| r.result.is_err()).count();

        let window = TimeWindow::ending_at((self.clock)(), self.settings.window);
        let hits = collect_hits(results, query, &window);

        tracing::debug!(chat_id, hits = hits.len(), failed_feeds = failed, "Keyword search finished");

        if hits.is_empty() {
            self.transport
                .send(chat_id, &render::search_no_results(self.settings.window), SendOptions::plain())
                .await?;
            return Ok(Handled::NoResults);
        }

        let grouped = filter_and_group(hits, &window, self.settings.zone);
        let reply = render::render_search(query, &grouped, self.settings.window);

        let outcomes = deliver(
            self.transport.as_ref(),
            chat_id,
            &reply,
            SendOptions::markdown(),
            self.settings.chunk_limit,
        )
        .await;

        Ok(Handled::Search {
            hits: grouped.item_count(),
            status: DeliveryStatus::from_outcomes(&outcomes),
        })
    }
}
