//! Next-check interval selection.
//!
//! A check is placed somewhere inside the next calendar hour, at least `min`
//! and at most `max` minutes from now. When those two constraints cannot both
//! hold, a fixed fallback delay is used instead.

use chrono::{DateTime, Duration, TimeZone, Timelike};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Delay used when no instant satisfies both the hour window and the bounds.
pub const FALLBACK_DELAY_MINUTES: i64 = 60;

/// Largest accepted bound (one day).
pub const MAX_INTERVAL_MINUTES: u32 = 24 * 60;

pub fn fallback_delay() -> Duration {
    Duration::minutes(FALLBACK_DELAY_MINUTES)
}

/// Validated `[min, max]` minute bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalBounds {
    min_minutes: u32,
    max_minutes: u32,
}

impl IntervalBounds {
    pub fn new(min_minutes: u32, max_minutes: u32) -> Result<Self, ValidationError> {
        if min_minutes == 0 || min_minutes > max_minutes || max_minutes > MAX_INTERVAL_MINUTES {
            return Err(ValidationError::InvalidInterval {
                min: min_minutes,
                max: max_minutes,
            });
        }
        Ok(Self {
            min_minutes,
            max_minutes,
        })
    }

    pub fn min(&self) -> Duration {
        Duration::minutes(i64::from(self.min_minutes))
    }

    pub fn max(&self) -> Duration {
        Duration::minutes(i64::from(self.max_minutes))
    }
}

/// `[start, end)` of the calendar hour after the one containing `now`.
pub fn next_hour_window<Tz: TimeZone>(now: &DateTime<Tz>) -> (DateTime<Tz>, DateTime<Tz>) {
    let into_hour = Duration::minutes(i64::from(now.minute()))
        + Duration::seconds(i64::from(now.second()))
        + Duration::nanoseconds(i64::from(now.nanosecond() % 1_000_000_000));
    let start = now.clone() - into_hour + Duration::hours(1);
    let end = start.clone() + Duration::hours(1);
    (start, end)
}

fn ceil_millis(d: Duration) -> i64 {
    (d + Duration::nanoseconds(999_999)).num_milliseconds()
}

/// Inclusive range of delays, in milliseconds, whose target instant lies in
/// the next hour window and within the bounds. `None` when empty.
pub fn candidate_range<Tz: TimeZone>(
    now: &DateTime<Tz>,
    bounds: IntervalBounds,
) -> Option<(i64, i64)> {
    let (start, end) = next_hour_window(now);
    let to_start = ceil_millis(start - now.clone());
    // Last whole millisecond strictly before the window closes.
    let to_end = ceil_millis(end - now.clone()) - 1;

    let lo = bounds.min().num_milliseconds().max(to_start);
    let hi = bounds.max().num_milliseconds().min(to_end);
    (lo <= hi).then_some((lo, hi))
}

/// Picks the delay until the next check, uniformly at random among valid
/// delays, or [`fallback_delay`] when there are none.
pub fn next_check_delay<Tz: TimeZone, R: Rng>(
    now: &DateTime<Tz>,
    bounds: IntervalBounds,
    rng: &mut R,
) -> Duration {
    match candidate_range(now, bounds) {
        Some((lo, hi)) => {
            let delay = Duration::milliseconds(rng.gen_range(lo..=hi));
            log::debug!(
                "Next check in {}s (valid range {}s..={}s)",
                delay.num_seconds(),
                lo / 1000,
                hi / 1000
            );
            delay
        }
        None => {
            log::debug!(
                "No instant in the next hour fits {}..{} min, using fallback",
                bounds.min().num_minutes(),
                bounds.max().num_minutes()
            );
            fallback_delay()
        }
    }
}
