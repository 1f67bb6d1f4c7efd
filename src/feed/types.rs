use chrono::{DateTime, Utc};

/// A single news item normalised out of a feed.
///
/// Items are request-scoped: they are produced by one fetch, flow through the
/// window filter and renderer, and are dropped when the reply has been sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    /// Article URL, empty when the feed entry carried no link
    pub link: String,
    /// Publish (or, failing that, update) time. Items without one never pass
    /// the recency filter.
    pub published_at: Option<DateTime<Utc>>,
    /// Plain-text description, empty when the entry had none
    pub description: String,
}

/// A category registered in the [`FeedRegistry`](super::FeedRegistry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    /// Lower-cased category key, unique within a registry
    pub category: String,
    pub endpoint: String,
}
