//! In-process daily trigger for the digest.
//!
//! Accepts the subset of cron syntax a once-a-day job needs: `M H * * *`.

use chrono::{DateTime, FixedOffset, NaiveTime, TimeDelta, TimeZone, Utc};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Expected 5 cron fields (\"M H * * *\"), found {0}")]
    FieldCount(usize),

    #[error("Invalid {field} in schedule: '{value}'")]
    InvalidField { field: &'static str, value: String },

    #[error("Only daily schedules are supported; {field} must be '*', got '{value}'")]
    NotDaily { field: &'static str, value: String },
}

/// A fixed time of day in a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    time: NaiveTime,
    zone: FixedOffset,
}

impl DailySchedule {
    /// Parse a cron expression of the form `M H * * *`.
    ///
    /// # Errors
    ///
    /// Anything other than five fields, a minute outside 0-59, an hour outside
    /// 0-23, or a non-`*` day/month/weekday field.
    pub fn parse(expr: &str, zone: FixedOffset) -> Result<Self, ScheduleError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        let &[minute, hour, day, month, weekday] = fields.as_slice() else {
            return Err(ScheduleError::FieldCount(fields.len()));
        };

        for (field, value) in [("day of month", day), ("month", month), ("day of week", weekday)] {
            if value != "*" {
                return Err(ScheduleError::NotDaily {
                    field,
                    value: value.to_string(),
                });
            }
        }

        let minute = parse_field("minute", minute, 59)?;
        let hour = parse_field("hour", hour, 23)?;
        let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| ScheduleError::InvalidField {
            field: "time",
            value: expr.to_string(),
        })?;

        Ok(Self { time, zone })
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    /// The first firing instant strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local = now.with_timezone(&self.zone).naive_local();
        let mut candidate = local.date().and_time(self.time);
        if candidate <= local {
            candidate += TimeDelta::days(1);
        }

        let utc = candidate - TimeDelta::seconds(i64::from(self.zone.local_minus_utc()));
        Utc.from_utc_datetime(&utc)
    }
}

fn parse_field(field: &'static str, value: &str, max: u32) -> Result<u32, ScheduleError> {
    value
        .parse::<u32>()
        .ok()
        .filter(|v| *v <= max)
        .ok_or_else(|| ScheduleError::InvalidField {
            field,
            value: value.to_string(),
        })
}

/// Invoke `job` at every firing instant of `schedule` until `shutdown` turns
/// true (or its sender is dropped).
///
/// A run in progress is awaited before the next instant is computed, so runs
/// never overlap. Shutdown is only observed between runs.
pub async fn run_daily<F, Fut>(schedule: DailySchedule, mut shutdown: watch::Receiver<bool>, mut job: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        if *shutdown.borrow() {
            break;
        }

        let now = Utc::now();
        let next = schedule.next_after(now);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        tracing::info!(next = %next, "Next digest scheduled");

        tokio::select! {
            _ = tokio::time::sleep(wait) => job().await,
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    tracing::debug!("Daily trigger stopped");
}
