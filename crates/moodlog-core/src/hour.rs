//! Calendar-hour buckets.
//!
//! A bucket names one local wall-clock hour and is the primary key of a
//! mood entry. The numeric id is `YYYYMMDDHH`, so ids sort chronologically.

use std::fmt;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike,
};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct HourBucket {
    /// Local start of the hour (minutes and seconds are always zero).
    start: NaiveDateTime,
}

impl HourBucket {
    /// Bucket containing `instant`, using the instant's own local fields.
    pub fn of<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self {
        Self::containing(instant.naive_local())
    }

    /// Bucket containing a naive local timestamp.
    pub fn containing(local: NaiveDateTime) -> Self {
        let start = local
            .date()
            .and_hms_opt(local.hour(), 0, 0)
            .unwrap_or(local);
        Self { start }
    }

    pub fn from_ymdh(year: i32, month: u32, day: u32, hour: u32) -> Result<Self, ValidationError> {
        let id = i64::from(year) * 1_000_000
            + i64::from(month) * 10_000
            + i64::from(day) * 100
            + i64::from(hour);
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .map(|start| Self { start })
            .ok_or(ValidationError::InvalidHour(id))
    }

    /// Parse a `YYYYMMDDHH` id.
    pub fn from_id(id: i64) -> Result<Self, ValidationError> {
        if !(1_000_000..=9_999_999_999).contains(&id) {
            return Err(ValidationError::InvalidHour(id));
        }
        let hour = (id % 100) as u32;
        let day = (id / 100 % 100) as u32;
        let month = (id / 10_000 % 100) as u32;
        let year = (id / 1_000_000) as i32;
        Self::from_ymdh(year, month, day, hour).map_err(|_| ValidationError::InvalidHour(id))
    }

    pub fn id(&self) -> i64 {
        i64::from(self.start.year()) * 1_000_000
            + i64::from(self.start.month()) * 10_000
            + i64::from(self.start.day()) * 100
            + i64::from(self.start.hour())
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn hour(&self) -> u32 {
        self.start.hour()
    }

    pub fn previous(&self) -> Self {
        Self {
            start: self.start - Duration::hours(1),
        }
    }

    pub fn next(&self) -> Self {
        Self {
            start: self.start + Duration::hours(1),
        }
    }

    /// Start of the hour as an instant in the given offset.
    pub fn start_at(&self, offset: FixedOffset) -> DateTime<FixedOffset> {
        // A fixed offset never produces gaps or folds.
        offset
            .from_local_datetime(&self.start)
            .earliest()
            .unwrap_or_else(|| offset.from_utc_datetime(&self.start))
    }
}

impl fmt::Display for HourBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start.format("%Y-%m-%d %H:00"))
    }
}

impl From<HourBucket> for i64 {
    fn from(bucket: HourBucket) -> Self {
        bucket.id()
    }
}

impl TryFrom<i64> for HourBucket {
    type Error = ValidationError;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        Self::from_id(id)
    }
}
