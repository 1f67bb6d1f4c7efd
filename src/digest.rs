//! Scheduled daily digest.
//!
//! One run fetches the digest category once, renders it once, and pushes the
//! identical text to every chat subscribed when the run started.

use crate::delivery::{deliver, ChatId, DeliveryStatus, MessageTransport, SendOptions};
use crate::dispatch::{system_clock, Clock};
use crate::feed::{FeedFetcher, FeedSource, FetchError};
use crate::news::{filter_and_group, render, TimeWindow};
use crate::subscribers::SubscriberStore;
use chrono::{FixedOffset, TimeDelta};
use futures::stream::{self, StreamExt};
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
pub struct DigestSettings {
    pub window: TimeDelta,
    pub zone: FixedOffset,
    pub chunk_limit: usize,
    /// Recipients delivered to at the same time
    pub fanout_concurrency: usize,
}

/// Summary of one digest run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestReport {
    /// Subscribers in the snapshot taken at trigger time
    pub recipients: usize,
    /// Items that made it into the rendered digest
    pub items: usize,
    pub delivered: usize,
    pub unreachable: usize,
    pub failed: usize,
}

pub struct DigestJob {
    source: FeedSource,
    fetcher: Arc<dyn FeedFetcher>,
    transport: Arc<dyn MessageTransport>,
    subscribers: Arc<dyn SubscriberStore>,
    settings: DigestSettings,
    clock: Clock,
}

impl DigestJob {
    pub fn new(
        source: FeedSource,
        fetcher: Arc<dyn FeedFetcher>,
        transport: Arc<dyn MessageTransport>,
        subscribers: Arc<dyn SubscriberStore>,
        settings: DigestSettings,
    ) -> Self {
        Self {
            source,
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

    /// Run the digest once.
    ///
    /// An empty subscriber set still fetches and renders; it just delivers to
    /// nobody. Per-recipient failures are counted in the report and never
    /// stop delivery to the others.
    ///
    /// # Errors
    ///
    /// A failed fetch aborts the run before any delivery and is returned.
    /// Subscribers are not told.
    pub async fn run(&self) -> Result<DigestReport, FetchError> {
        let recipients = self.subscribers.snapshot();
        let now = (self.clock)();

        let items = self.fetcher.fetch(&self.source).await.inspect_err(|e| {
            tracing::error!(category = %self.source.category, error = %e, "Digest fetch failed, skipping run");
        })?;

        let window = TimeWindow::ending_at(now, self.settings.window);
        let grouped = filter_and_group(items, &window, self.settings.zone);
        let text: Arc<str> = render::render_digest(&self.source.category, &grouped, self.settings.window).into();

        let mut report = DigestReport {
            recipients: recipients.len(),
            items: grouped.item_count(),
            ..DigestReport::default()
        };

        let transport = Arc::clone(&self.transport);
        let chunk_limit = self.settings.chunk_limit;
        let statuses: Vec<DeliveryStatus> = stream::iter(recipients)
            .map(move |chat_id| deliver_to(Arc::clone(&transport), chat_id, Arc::clone(&text), chunk_limit))
            .buffer_unordered(self.settings.fanout_concurrency.max(1))
            .collect()
            .await;

        for status in statuses {
            match status {
                DeliveryStatus::Delivered => report.delivered += 1,
                DeliveryStatus::Unreachable => report.unreachable += 1,
                DeliveryStatus::Failed => report.failed += 1,
            }
        }

        tracing::info!(
            category = %self.source.category,
            items = report.items,
            recipients = report.recipients,
            delivered = report.delivered,
            unreachable = report.unreachable,
            failed = report.failed,
            "Digest run complete"
        );

        Ok(report)
    }
}

async fn deliver_to(
    transport: Arc<dyn MessageTransport>,
    chat_id: ChatId,
    text: Arc<str>,
    chunk_limit: usize,
) -> DeliveryStatus {
    let outcomes = deliver(transport.as_ref(), chat_id, &text, SendOptions::markdown(), chunk_limit).await;
    DeliveryStatus::from_outcomes(&outcomes)
}
