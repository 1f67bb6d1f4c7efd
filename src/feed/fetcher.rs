use super::parser::parse_feed;
use super::types::{FeedItem, FeedSource};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB
const MAX_CONCURRENT_FETCHES: usize = 10;

/// Errors that can occur while fetching and parsing a single feed.
///
/// None of these are retried: the caller decides whether a failed feed aborts
/// the whole operation or is skipped.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request plus body read exceeded the per-fetch timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// Feed XML could not be parsed as RSS or Atom
    #[error("Parse error: {0}")]
    Parse(String),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// Retrieves one feed and returns its items.
///
/// Implementations must turn every failure into a [`FetchError`]; nothing may
/// panic or hang past the implementation's own timeout.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<FeedItem>, FetchError>;
}

/// Outcome of one feed within a [`fetch_all`] batch.
#[derive(Debug)]
pub struct FetchResult {
    /// Category of the feed that was fetched
    pub category: String,
    /// Items in feed order, or the error that occurred
    pub result: Result<Vec<FeedItem>, FetchError>,
}

/// [`FeedFetcher`] over HTTP with `reqwest` and `feed-rs`.
#[derive(Clone)]
pub struct HttpFeedFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_size: usize,
}

impl HttpFeedFetcher {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            max_size: MAX_FEED_SIZE,
        }
    }

    /// Override the response body limit.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, self.max_size).await
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<FeedItem>, FetchError> {
        // Covers the body read as well as the request
        let bytes = tokio::time::timeout(self.timeout, self.fetch_bytes(&source.endpoint))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;

        let items = parse_feed(&bytes).map_err(|e| FetchError::Parse(e.to_string()))?;

        tracing::debug!(
            category = %source.category,
            items = items.len(),
            bytes = bytes.len(),
            "Fetched feed"
        );

        Ok(items)
    }
}

/// Fetch every source concurrently.
///
/// Each fetch succeeds or fails on its own; a failure never cancels its
/// siblings. Results come back in the order of `sources`, regardless of which
/// fetch finished first.
///
/// The per-feed futures own their fetcher handle and source, so the returned
/// future is `Send` and can run inside a spawned task.
pub async fn fetch_all(fetcher: Arc<dyn FeedFetcher>, sources: &[FeedSource]) -> Vec<FetchResult> {
    let batch: Vec<FeedSource> = sources.to_vec();

    stream::iter(batch)
        .map(move |source| {
            let fetcher = Arc::clone(&fetcher);
            async move {
                let result = fetcher.fetch(&source).await;
                if let Err(e) = &result {
                    tracing::warn!(
                        category = %source.category,
                        endpoint = %source.endpoint,
                        error = %e,
                        "Feed fetch failed, skipping"
                    );
                }
                FetchResult {
                    category: source.category,
                    result,
                }
            }
        })
        .buffered(MAX_CONCURRENT_FETCHES)
        .collect()
        .await
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
