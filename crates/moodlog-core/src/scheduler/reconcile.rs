//! Missed-entry reconciliation.
//!
//! When a check fires, the hour before it is final, and so is the hour of
//! the previous prompt. Each of those hours the user never answered gets
//! the `Asleep` sentinel.

use chrono::{DateTime, FixedOffset};

use crate::error::Result;
use crate::hour::HourBucket;
use crate::mood::ASLEEP;
use crate::storage::{Database, MoodEntry};
use crate::tracking::TrackingState;

/// Hours that a firing at `now` finalizes, oldest first.
///
/// Always the calendar hour before `now`, plus the hour of the last prompt
/// when that is older still. The hour containing `now` is never included.
pub fn finalized_buckets(state: &TrackingState, now: DateTime<FixedOffset>) -> Vec<HourBucket> {
    let previous = HourBucket::of(&now).previous();
    match state.current_bucket {
        Some(prompted) if prompted < previous => vec![prompted, previous],
        _ => vec![previous],
    }
}

/// Write the sentinel for every finalized hour that has no entry.
///
/// The prompted hour's sentinel is stamped with the last check time; other
/// hours are stamped with their own start. Returns the written entries.
/// Running it again is harmless: the second run finds the entries and
/// writes nothing.
pub fn reconcile_missed(
    db: &Database,
    state: &TrackingState,
    now: DateTime<FixedOffset>,
) -> Result<Vec<MoodEntry>> {
    let mut written = Vec::new();
    for bucket in finalized_buckets(state, now) {
        if db.has_entry(bucket)? {
            continue;
        }
        let recorded_at = match state.last_check {
            Some(last) if state.current_bucket == Some(bucket) => last,
            _ => bucket.start_at(*now.offset()),
        };
        let entry = MoodEntry::new(bucket, recorded_at, ASLEEP);
        db.upsert_entry(&entry)?;
        log::info!("No answer for {bucket}, recorded {ASLEEP}");
        written.push(entry);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn prompted(bucket: i64, last_check: &str) -> TrackingState {
        TrackingState {
            enabled: true,
            last_check: Some(at(last_check)),
            next_check: None,
            current_bucket: Some(HourBucket::from_id(bucket).unwrap()),
        }
    }

    #[test]
    fn unanswered_hour_gets_exactly_one_sentinel() {
        let db = Database::open_memory().unwrap();
        let state = prompted(2026101810, "2026-10-18T10:42:00+00:00");
        let now = at("2026-10-18T11:17:00+00:00");

        let written = reconcile_missed(&db, &state, now).unwrap();
        assert_eq!(written.len(), 1);
        let written = &written[0];
        assert_eq!(written.bucket.id(), 2026101810);
        assert_eq!(written.mood, ASLEEP);
        assert_eq!(written.recorded_at, at("2026-10-18T10:42:00+00:00"));

        assert!(reconcile_missed(&db, &state, now).unwrap().is_empty());
        assert_eq!(db.entry_count().unwrap(), 1);
    }

    #[test]
    fn answered_hour_is_left_alone() {
        let db = Database::open_memory().unwrap();
        let bucket = HourBucket::from_id(2026101810).unwrap();
        db.upsert_entry(&MoodEntry::new(bucket, at("2026-10-18T10:45:00+00:00"), "Happy"))
            .unwrap();
        let state = prompted(2026101810, "2026-10-18T10:42:00+00:00");

        assert!(reconcile_missed(&db, &state, at("2026-10-18T11:17:00+00:00"))
            .unwrap()
            .is_empty());
        assert_eq!(db.entry(bucket).unwrap().unwrap().mood, "Happy");
    }

    #[test]
    fn prompt_in_current_hour_is_still_open() {
        let db = Database::open_memory().unwrap();
        let state = prompted(2026101811, "2026-10-18T11:02:00+00:00");
        let written = reconcile_missed(&db, &state, at("2026-10-18T11:40:00+00:00")).unwrap();
        // Only the hour before is final.
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].bucket.id(), 2026101810);
        assert!(db
            .entry(HourBucket::from_id(2026101811).unwrap())
            .unwrap()
            .is_none());
    }

    #[test]
    fn gap_after_answered_prompt_still_finalizes_preceding_hour() {
        let db = Database::open_memory().unwrap();
        let prompted_hour = HourBucket::from_id(2026101810).unwrap();
        db.upsert_entry(&MoodEntry::new(
            prompted_hour,
            at("2026-10-18T10:25:00+00:00"),
            "Happy",
        ))
        .unwrap();
        let state = prompted(2026101810, "2026-10-18T10:20:00+00:00");

        let written = reconcile_missed(&db, &state, at("2026-10-18T13:10:00+00:00")).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].bucket.id(), 2026101812);
        assert_eq!(written[0].mood, ASLEEP);
        assert_eq!(written[0].recorded_at, at("2026-10-18T12:00:00+00:00"));
        assert_eq!(db.entry(prompted_hour).unwrap().unwrap().mood, "Happy");
    }

    #[test]
    fn gap_after_unanswered_prompt_finalizes_both_hours() {
        let db = Database::open_memory().unwrap();
        let state = prompted(2026101810, "2026-10-18T10:20:00+00:00");

        let written = reconcile_missed(&db, &state, at("2026-10-18T13:10:00+00:00")).unwrap();
        let ids: Vec<i64> = written.iter().map(|e| e.bucket.id()).collect();
        assert_eq!(ids, vec![2026101810, 2026101812]);
        assert_eq!(written[0].recorded_at, at("2026-10-18T10:20:00+00:00"));
        // Hours in between were never prompted and stay empty.
        assert!(db
            .entry(HourBucket::from_id(2026101811).unwrap())
            .unwrap()
            .is_none());
    }

    #[test]
    fn without_prompt_history_previous_calendar_hour_is_used() {
        let db = Database::open_memory().unwrap();
        let state = TrackingState {
            enabled: true,
            ..TrackingState::default()
        };
        let written = reconcile_missed(&db, &state, at("2026-10-18T00:20:00+02:00")).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].bucket.id(), 2026101723);
        assert_eq!(written[0].recorded_at, at("2026-10-17T23:00:00+02:00"));
    }
}
