//! Read models for dashboards and timelines.

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::hour::HourBucket;
use crate::mood::{MoodCatalog, MoodTag};
use crate::scheduler::queue::{ScheduledWork, WorkQueue, MOOD_CHECK_WORK};
use crate::storage::{Database, MoodEntry};
use crate::tracking::{assess, TrackingDrift, TrackingState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStatus {
    pub tracking: bool,
    pub drift: TrackingDrift,
    pub last_check: Option<DateTime<FixedOffset>>,
    pub next_check: Option<DateTime<FixedOffset>>,
    pub queued: Option<ScheduledWork>,
    /// Hour of the latest prompt, if it still has no answer.
    pub awaiting_answer: Option<HourBucket>,
    pub latest_entry: Option<MoodEntry>,
    pub today_entries: usize,
    pub total_entries: u64,
}

/// Longest span, in days, that timelines and ranges accept.
pub const MAX_TIMELINE_DAYS: u32 = 3660;

fn day_bounds(date: NaiveDate) -> Result<(HourBucket, HourBucket)> {
    let first = HourBucket::from_ymdh(date.year(), date.month(), date.day(), 0)?;
    Ok((first, HourBucket::from_ymdh(date.year(), date.month(), date.day(), 23)?))
}

pub fn dashboard<Q: WorkQueue + ?Sized>(
    db: &Database,
    queue: &Q,
    now: DateTime<FixedOffset>,
) -> Result<DashboardStatus> {
    let state = TrackingState::load(db)?;
    let queued = queue.pending(MOOD_CHECK_WORK)?;
    let awaiting_answer = match state.current_bucket {
        Some(bucket) if !db.has_entry(bucket)? => Some(bucket),
        _ => None,
    };
    let (first, last) = day_bounds(now.date_naive())?;

    Ok(DashboardStatus {
        tracking: state.enabled,
        drift: assess(&state, queued.as_ref()),
        last_check: state.last_check,
        next_check: state.next_check,
        queued,
        awaiting_answer,
        latest_entry: db.latest_entry()?,
        today_entries: db.entries_between(first, last)?.len(),
        total_entries: db.entry_count()?,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineDay {
    pub date: NaiveDate,
    /// Mood per hour 0..24, `None` where nothing was recorded.
    pub hours: Vec<Option<String>>,
}

impl TimelineDay {
    pub fn recorded(&self) -> usize {
        self.hours.iter().filter(|h| h.is_some()).count()
    }
}

/// First and last hour of the `days` days ending at `today`.
///
/// # Errors
/// Returns a validation error unless `1 <= days <= MAX_TIMELINE_DAYS` and
/// the span stays within the calendar.
pub fn day_range(today: NaiveDate, days: u32) -> Result<(HourBucket, HourBucket)> {
    let invalid = |message: String| ValidationError::InvalidValue {
        field: "days".into(),
        message,
    };
    if !(1..=MAX_TIMELINE_DAYS).contains(&days) {
        return Err(invalid(format!("must be between 1 and {MAX_TIMELINE_DAYS}")).into());
    }
    let oldest = today
        .checked_sub_days(Days::new(u64::from(days - 1)))
        .ok_or_else(|| invalid(format!("{days} days before {today} is out of range")))?;
    let (from, _) = day_bounds(oldest)?;
    let (_, to) = day_bounds(today)?;
    Ok((from, to))
}

/// The last `days` days ending at `today`, most recent first.
pub fn timeline(db: &Database, today: NaiveDate, days: u32) -> Result<Vec<TimelineDay>> {
    let (from, to) = day_range(today, days)?;
    let entries = db.entries_between(from, to)?;

    let mut out: Vec<TimelineDay> = (0..days)
        .map_while(|offset| today.checked_sub_days(Days::new(u64::from(offset))))
        .map(|date| TimelineDay {
            date,
            hours: vec![None; 24],
        })
        .collect();
    for entry in entries {
        let age = (today - entry.bucket.date()).num_days();
        if let Some(day) = usize::try_from(age).ok().and_then(|i| out.get_mut(i)) {
            day.hours[entry.bucket.hour() as usize] = Some(entry.mood);
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodCount {
    pub mood: String,
    pub count: usize,
    /// Fraction of counted entries, 0.0..=1.0.
    pub share: f64,
    /// Tags from the current catalog; empty for moods no longer in it.
    pub tags: Vec<MoodTag>,
}

/// Counts per mood between two hours (inclusive), most frequent first.
pub fn mood_distribution(
    db: &Database,
    catalog: &MoodCatalog,
    from: HourBucket,
    to: HourBucket,
    include_sentinel: bool,
) -> Result<Vec<MoodCount>> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut total = 0usize;
    for entry in db.entries_between(from, to)? {
        let canonical = catalog.find(&entry.mood);
        if !include_sentinel && canonical.is_some_and(|m| m.is_sentinel()) {
            continue;
        }
        let name = canonical.map(|m| m.name.clone()).unwrap_or(entry.mood);
        total += 1;
        match counts.iter_mut().find(|(n, _)| *n == name) {
            Some((_, c)) => *c += 1,
            None => counts.push((name, 1)),
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(counts
        .into_iter()
        .map(|(mood, count)| MoodCount {
            tags: catalog.find(&mood).map(|m| m.tags.clone()).unwrap_or_default(),
            share: count as f64 / total as f64,
            mood,
            count,
        })
        .collect())
}
