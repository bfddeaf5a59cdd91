//! Tracking state and its consistency with the work queue.
//!
//! Tracking is either off, or on with exactly one `mood-check` item queued.
//! The persisted flag can disagree with the queue after the process is
//! killed or the queue is wiped; [`assess`] detects that without side
//! effects and [`repair`] applies the correction.
//!
//! ```text
//! off --start_tracking--> on (check queued) --fire--> on (next check queued)
//!  ^                          |
//!  +-------stop_tracking------+
//! ```

use chrono::{DateTime, FixedOffset};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{DatabaseError, Result};
use crate::hour::HourBucket;
use crate::scheduler::interval::{next_check_delay, IntervalBounds};
use crate::scheduler::queue::{ScheduledWork, WorkQueue, MOOD_CHECK_WORK};
use crate::storage::Database;

const KEY_ENABLED: &str = "tracking.enabled";
const KEY_LAST_CHECK: &str = "tracking.last_check";
const KEY_NEXT_CHECK: &str = "tracking.next_check";
const KEY_CURRENT_BUCKET: &str = "tracking.current_bucket";

/// Persisted flags describing the recorder loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingState {
    pub enabled: bool,
    /// When the loop last fired.
    pub last_check: Option<DateTime<FixedOffset>>,
    /// When the loop expects to fire next.
    pub next_check: Option<DateTime<FixedOffset>>,
    /// Hour the most recent prompt was issued for.
    pub current_bucket: Option<HourBucket>,
}

fn parse_time(db: &Database, key: &str) -> Result<Option<DateTime<FixedOffset>>> {
    let Some(raw) = db.kv_get(key)? else {
        return Ok(None);
    };
    let parsed = DateTime::parse_from_rfc3339(&raw).map_err(|_| DatabaseError::CorruptValue {
        column: key.to_string(),
        value: raw.clone(),
    })?;
    Ok(Some(parsed))
}

fn put_or_delete(db: &Database, key: &str, value: Option<String>) -> Result<()> {
    match value {
        Some(v) => db.kv_set(key, &v),
        None => db.kv_delete(key),
    }
}

impl TrackingState {
    /// Read the flags; missing keys mean "off / never".
    pub fn load(db: &Database) -> Result<Self> {
        let enabled = db.kv_get(KEY_ENABLED)?.is_some_and(|v| v == "true");
        let current_bucket = match db.kv_get(KEY_CURRENT_BUCKET)? {
            Some(raw) => {
                let corrupt = || DatabaseError::CorruptValue {
                    column: KEY_CURRENT_BUCKET.to_string(),
                    value: raw.clone(),
                };
                let id: i64 = raw.parse().map_err(|_| corrupt())?;
                Some(HourBucket::from_id(id).map_err(|_| corrupt())?)
            }
            None => None,
        };
        Ok(Self {
            enabled,
            last_check: parse_time(db, KEY_LAST_CHECK)?,
            next_check: parse_time(db, KEY_NEXT_CHECK)?,
            current_bucket,
        })
    }

    pub fn save(&self, db: &Database) -> Result<()> {
        db.kv_set(KEY_ENABLED, if self.enabled { "true" } else { "false" })?;
        put_or_delete(db, KEY_LAST_CHECK, self.last_check.map(|t| t.to_rfc3339()))?;
        put_or_delete(db, KEY_NEXT_CHECK, self.next_check.map(|t| t.to_rfc3339()))?;
        put_or_delete(
            db,
            KEY_CURRENT_BUCKET,
            self.current_bucket.map(|b| b.id().to_string()),
        )
    }
}

/// Disagreement between the tracking flag and the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingDrift {
    Consistent,
    /// Tracking is on but nothing is queued.
    MissingWork,
    /// Tracking is off but a check is still queued.
    OrphanedWork,
}

/// Compare the flag against the queue. Pure.
pub fn assess(state: &TrackingState, pending: Option<&ScheduledWork>) -> TrackingDrift {
    match (state.enabled, pending.is_some()) {
        (true, false) => TrackingDrift::MissingWork,
        (false, true) => TrackingDrift::OrphanedWork,
        _ => TrackingDrift::Consistent,
    }
}

/// Read the current drift from storage without changing anything.
pub fn check_consistency<Q: WorkQueue + ?Sized>(db: &Database, queue: &Q) -> Result<TrackingDrift> {
    let state = TrackingState::load(db)?;
    let pending = queue.pending(MOOD_CHECK_WORK)?;
    Ok(assess(&state, pending.as_ref()))
}

/// Pick the next check time after `from`, enqueue it and record it.
pub fn schedule_next_check<Q: WorkQueue + ?Sized, R: Rng>(
    db: &Database,
    queue: &Q,
    bounds: IntervalBounds,
    from: DateTime<FixedOffset>,
    rng: &mut R,
) -> Result<ScheduledWork> {
    let run_at = from + next_check_delay(&from, bounds, rng);
    let work = queue.enqueue_unique(MOOD_CHECK_WORK, run_at, from)?;

    let mut state = TrackingState::load(db)?;
    state.next_check = Some(run_at);
    state.save(db)?;

    log::info!("Next mood check at {}", run_at.to_rfc3339());
    Ok(work)
}

/// Turn tracking on and queue the first check.
pub fn start_tracking<Q: WorkQueue + ?Sized, R: Rng>(
    db: &Database,
    queue: &Q,
    bounds: IntervalBounds,
    now: DateTime<FixedOffset>,
    rng: &mut R,
) -> Result<ScheduledWork> {
    let mut state = TrackingState::load(db)?;
    state.enabled = true;
    state.save(db)?;
    log::info!("Tracking started");
    schedule_next_check(db, queue, bounds, now, rng)
}

/// Turn tracking off and drop any queued check.
pub fn stop_tracking<Q: WorkQueue + ?Sized>(db: &Database, queue: &Q) -> Result<()> {
    let state = TrackingState {
        enabled: false,
        last_check: TrackingState::load(db)?.last_check,
        next_check: None,
        current_bucket: None,
    };
    state.save(db)?;
    if queue.cancel(MOOD_CHECK_WORK)? {
        log::info!("Cancelled queued mood check");
    }
    log::info!("Tracking stopped");
    Ok(())
}

/// Apply the correction for a previously assessed drift.
///
/// Returns the newly queued check when the loop had to be restarted.
pub fn repair<Q: WorkQueue + ?Sized, R: Rng>(
    drift: TrackingDrift,
    db: &Database,
    queue: &Q,
    bounds: IntervalBounds,
    now: DateTime<FixedOffset>,
    rng: &mut R,
) -> Result<Option<ScheduledWork>> {
    match drift {
        TrackingDrift::Consistent => Ok(None),
        TrackingDrift::MissingWork => {
            log::warn!("Tracking enabled but no check queued, restarting loop");
            schedule_next_check(db, queue, bounds, now, rng).map(Some)
        }
        TrackingDrift::OrphanedWork => {
            log::warn!("Tracking disabled but a check is queued, cancelling");
            queue.cancel(MOOD_CHECK_WORK)?;
            let mut state = TrackingState::load(db)?;
            state.next_check = None;
            state.save(db)?;
            Ok(None)
        }
    }
}
