use crate::feed::FeedItem;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeDelta, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Closed time interval `[start, end]` that items must be published within.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// The window of length `duration` ending at `now`.
    ///
    /// A duration reaching past the earliest representable instant starts the
    /// window there instead.
    pub fn ending_at(now: DateTime<Utc>, duration: TimeDelta) -> Self {
        Self {
            start: now
                .checked_sub_signed(duration)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            end: now,
        }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// Calendar day an item was published on, in the configured reference zone.
///
/// Displays as zero-padded `YYYY-MM-DD`, so the string order of keys matches
/// their chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn of(instant: DateTime<Utc>, zone: FixedOffset) -> Self {
        Self(instant.with_timezone(&zone).date_naive())
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Anything that carries a publish timestamp and can be bucketed by day.
pub trait Dated {
    fn published_at(&self) -> Option<DateTime<Utc>>;
}

impl Dated for FeedItem {
    fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }
}

/// Items bucketed by [`DayKey`].
///
/// Days iterate most recent first; within a day, items keep the order they
/// were pushed in (feed order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedResult<T> {
    days: BTreeMap<DayKey, Vec<T>>,
}

impl<T> GroupedResult<T> {
    pub fn new() -> Self {
        Self {
            days: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, day: DayKey, item: T) {
        self.days.entry(day).or_default().push(item);
    }

    /// Day groups, most recent day first.
    pub fn days(&self) -> impl Iterator<Item = (&DayKey, &[T])> {
        self.days.iter().rev().map(|(day, items)| (day, items.as_slice()))
    }

    /// Total number of items across all days.
    pub fn item_count(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

impl<T> Default for GroupedResult<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep items published inside `window` and group them by day in `zone`.
///
/// Items without a publish time are dropped: recency can't be verified.
pub fn filter_and_group<T, I>(items: I, window: &TimeWindow, zone: FixedOffset) -> GroupedResult<T>
where
    T: Dated,
    I: IntoIterator<Item = T>,
{
    let mut grouped = GroupedResult::new();
    let mut dropped_undated = 0usize;

    for item in items {
        match item.published_at() {
            Some(published) if window.contains(published) => {
                grouped.push(DayKey::of(published, zone), item);
            }
            Some(_) => {}
            None => dropped_undated += 1,
        }
    }

    if dropped_undated > 0 {
        tracing::trace!(dropped = dropped_undated, "Dropped items without a publish date");
    }

    grouped
}
