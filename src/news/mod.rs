//! Turning fetched items into replies.
//!
//! - [`window`] - recency filtering and day grouping
//! - [`search`] - cross-category keyword matching
//! - [`render`] - Markdown reply text

pub mod render;
mod search;
mod window;

pub use search::{collect_hits, title_matches, SearchHit};
pub use window::{filter_and_group, DayKey, Dated, GroupedResult, TimeWindow};
