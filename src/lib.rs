//! Telegram news relay.
//!
//! Answers category lookups and keyword searches from a fixed set of RSS feeds
//! and pushes a daily digest of one category to every subscribed chat.
//!
//! Message flow: [`gateway`] → [`dispatch`] → [`feed`] → [`news`] →
//! [`delivery`]. The scheduled flow runs [`digest`] from [`schedule`].

pub mod config;
pub mod delivery;
pub mod digest;
pub mod dispatch;
pub mod feed;
pub mod gateway;
pub mod news;
pub mod schedule;
pub mod subscribers;
pub mod util;
