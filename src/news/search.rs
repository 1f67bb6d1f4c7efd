use super::window::{Dated, TimeWindow};
use crate::feed::{normalize_key, FeedItem, FetchResult};
use chrono::{DateTime, Utc};

/// A feed item matched by a cross-category keyword search, tagged with the
/// category it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub item: FeedItem,
    pub category: String,
}

impl Dated for SearchHit {
    fn published_at(&self) -> Option<DateTime<Utc>> {
        self.item.published_at
    }
}

/// Case-insensitive substring match of an already-normalised keyword.
pub fn title_matches(title: &str, keyword: &str) -> bool {
    title.to_lowercase().contains(keyword)
}

/// Merge the successful results of a multi-feed fetch into search hits.
///
/// Failed feeds are skipped. An item is a hit when its title contains the
/// trimmed, case-folded `keyword` and it was published inside `window`.
/// Hits keep the order of `results`, then feed order.
pub fn collect_hits(results: Vec<FetchResult>, keyword: &str, window: &TimeWindow) -> Vec<SearchHit> {
    let keyword = normalize_key(keyword);
    if keyword.is_empty() {
        return Vec::new();
    }

    let mut hits = Vec::new();
    for FetchResult { category, result } in results {
        let Ok(items) = result else {
            continue;
        };

        hits.extend(
            items
                .into_iter()
                .filter(|item| item.published_at.is_some_and(|p| window.contains(p)))
                .filter(|item| title_matches(&item.title, &keyword))
                .map(|item| SearchHit {
                    item,
                    category: category.clone(),
                }),
        );
    }

    hits
}
