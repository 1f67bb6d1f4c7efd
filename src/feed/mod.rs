//! Feed sources and retrieval.
//!
//! - [`registry`] - category name → feed endpoint table
//! - [`parser`] - RSS/Atom bytes → [`FeedItem`]s using the `feed-rs` crate
//! - [`fetcher`] - HTTP retrieval with a per-fetch timeout, plus concurrent
//!   multi-feed fetching with per-feed failure isolation
//!
//! # Example
//!
//! ```ignore
//! use newsdesk::feed::{fetch_all, FeedRegistry, HttpFeedFetcher};
//! use std::sync::Arc;
//!
//! let registry = FeedRegistry::with_default_feeds();
//! let fetcher = Arc::new(HttpFeedFetcher::new(client, DEFAULT_FETCH_TIMEOUT));
//! let results = fetch_all(fetcher, registry.sources()).await;
//! ```

mod fetcher;
mod parser;
mod registry;
mod types;

pub use fetcher::{
    fetch_all, FeedFetcher, FetchError, FetchResult, HttpFeedFetcher, DEFAULT_FETCH_TIMEOUT,
};
pub use parser::parse_feed;
pub use registry::{normalize_key, FeedRegistry, RegistryError};
pub use types::{FeedItem, FeedSource};
