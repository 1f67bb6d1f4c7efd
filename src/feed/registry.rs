use super::types::FeedSource;
use crate::util::{validate_url, UrlValidationError};
use thiserror::Error;

/// Feeds served when the configuration does not provide its own table.
const DEFAULT_FEEDS: &[(&str, &str)] = &[
    ("tech", "https://feeds.feedburner.com/TechCrunch/"),
    ("world", "http://feeds.bbci.co.uk/news/world/rss.xml"),
    ("india", "https://timesofindia.indiatimes.com/rssfeeds/-2128936835.cms"),
    ("sports", "http://feeds.bbci.co.uk/sport/rss.xml"),
    ("business", "http://feeds.bbci.co.uk/news/business/rss.xml"),
    ("health", "http://feeds.bbci.co.uk/news/health/rss.xml"),
    ("science", "http://feeds.bbci.co.uk/news/science_and_environment/rss.xml"),
    ("entertainment", "http://feeds.bbci.co.uk/news/entertainment_and_arts/rss.xml"),
    ("finance", "https://www.livemint.com/rss/markets"),
    ("environment", "https://www.theguardian.com/environment/rss"),
];

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Category name is empty")]
    EmptyCategory,

    #[error("Duplicate category: {0}")]
    DuplicateCategory(String),

    #[error("Invalid endpoint for category '{category}': {source}")]
    InvalidEndpoint {
        category: String,
        #[source]
        source: UrlValidationError,
    },
}

/// Static mapping from category name to feed endpoint.
///
/// Keys are stored lower-cased and looked up after trimming and case-folding,
/// so `"Tech "` finds `tech` while `"technology"` finds nothing. Registration
/// order is preserved; it is the order cross-category search merges results in.
#[derive(Debug, Clone)]
pub struct FeedRegistry {
    sources: Vec<FeedSource>,
}

impl FeedRegistry {
    /// Build a registry from `(category, endpoint)` pairs.
    ///
    /// # Errors
    ///
    /// Fails on an empty category name, a category registered twice (after
    /// case-folding), or an endpoint that is not an http(s) URL.
    pub fn new<I, K, V>(entries: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut sources: Vec<FeedSource> = Vec::new();

        for (category, endpoint) in entries {
            let category = normalize_key(category.as_ref());
            if category.is_empty() {
                return Err(RegistryError::EmptyCategory);
            }
            if sources.iter().any(|s| s.category == category) {
                return Err(RegistryError::DuplicateCategory(category));
            }

            let endpoint = validate_url(endpoint.as_ref())
                .map_err(|source| RegistryError::InvalidEndpoint {
                    category: category.clone(),
                    source,
                })?
                .to_string();

            sources.push(FeedSource { category, endpoint });
        }

        Ok(Self { sources })
    }

    /// The built-in ten-category table.
    pub fn with_default_feeds() -> Self {
        let sources = DEFAULT_FEEDS
            .iter()
            .map(|(category, endpoint)| FeedSource {
                category: (*category).to_string(),
                endpoint: (*endpoint).to_string(),
            })
            .collect();
        Self { sources }
    }

    /// Exact, case-insensitive, whitespace-trimmed lookup.
    pub fn lookup(&self, input: &str) -> Option<&FeedSource> {
        let key = normalize_key(input);
        self.sources.iter().find(|s| s.category == key)
    }

    pub fn sources(&self) -> &[FeedSource] {
        &self.sources
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.category.as_str())
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Default for FeedRegistry {
    fn default() -> Self {
        Self::with_default_feeds()
    }
}

/// Trim and case-fold user input into registry key form.
pub fn normalize_key(input: &str) -> String {
    input.trim().to_lowercase()
}
