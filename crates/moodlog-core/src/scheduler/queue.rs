//! Deferred unique-work queue.
//!
//! Each work item is identified by a unique name; enqueueing under an
//! existing name replaces the previous item (and gives it a fresh id). The
//! recorder loop keeps exactly one `mood-check` item alive while tracking.

use std::cell::RefCell;
use std::collections::HashMap;

use chrono::{DateTime, Duration, FixedOffset};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::storage::Database;

/// Unique name of the recurring mood check.
pub const MOOD_CHECK_WORK: &str = "mood-check";

/// First retry delay after a failed run.
pub const INITIAL_BACKOFF_SECS: i64 = 30;

/// Retry delays never exceed this.
pub const MAX_BACKOFF_SECS: i64 = 5 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledWork {
    pub id: Uuid,
    pub name: String,
    pub run_at: DateTime<FixedOffset>,
    /// Number of failed runs so far.
    pub attempt: u32,
    pub enqueued_at: DateTime<FixedOffset>,
}

impl ScheduledWork {
    pub fn is_due(&self, now: DateTime<FixedOffset>) -> bool {
        self.run_at <= now
    }
}

/// Exponential backoff for the given (1-based) failed attempt.
pub fn backoff_delay(attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(20);
    let secs = INITIAL_BACKOFF_SECS.saturating_mul(1_i64 << exp);
    Duration::seconds(secs.min(MAX_BACKOFF_SECS))
}

/// Storage for deferred work.
pub trait WorkQueue {
    /// Enqueue `name` to run at `run_at`, replacing any existing item.
    fn enqueue_unique(
        &self,
        name: &str,
        run_at: DateTime<FixedOffset>,
        now: DateTime<FixedOffset>,
    ) -> Result<ScheduledWork>;

    /// The outstanding item for `name`, if any.
    fn pending(&self, name: &str) -> Result<Option<ScheduledWork>>;

    /// Remove the item for `name`. Returns whether one existed.
    fn cancel(&self, name: &str) -> Result<bool>;

    /// All items with `run_at <= now`, earliest first.
    fn due(&self, now: DateTime<FixedOffset>) -> Result<Vec<ScheduledWork>>;

    /// Earliest outstanding item.
    fn next_run(&self) -> Result<Option<ScheduledWork>>;

    /// Drop `work` after a successful run, unless it was already replaced.
    fn complete(&self, work: &ScheduledWork) -> Result<()>;

    /// Reschedule `work` after a failed run using [`backoff_delay`].
    ///
    /// If the run already replaced the item, the replacement is kept. If the
    /// item was cancelled meanwhile, nothing is requeued and `None` is returned.
    fn retry(
        &self,
        work: &ScheduledWork,
        now: DateTime<FixedOffset>,
    ) -> Result<Option<ScheduledWork>>;
}

type WorkRow = (String, String, String, i64, String);

fn decode_work((name, id, run_at, attempt, enqueued_at): WorkRow) -> Result<ScheduledWork> {
    let corrupt = |column: &str, value: &str| DatabaseError::CorruptValue {
        column: column.to_string(),
        value: value.to_string(),
    };
    Ok(ScheduledWork {
        id: Uuid::parse_str(&id).map_err(|_| corrupt("id", &id))?,
        run_at: DateTime::parse_from_rfc3339(&run_at).map_err(|_| corrupt("run_at", &run_at))?,
        attempt: u32::try_from(attempt).map_err(|_| corrupt("attempt", &attempt.to_string()))?,
        enqueued_at: DateTime::parse_from_rfc3339(&enqueued_at)
            .map_err(|_| corrupt("enqueued_at", &enqueued_at))?,
        name,
    })
}

fn work_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<WorkRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

const WORK_COLUMNS: &str = "name, id, run_at, attempt, enqueued_at";

impl Database {
    fn put_work(&self, work: &ScheduledWork) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO work_queue (name, id, run_at, run_at_ms, attempt, enqueued_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                work.name,
                work.id.to_string(),
                work.run_at.to_rfc3339(),
                work.run_at.timestamp_millis(),
                work.attempt,
                work.enqueued_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

impl WorkQueue for Database {
    fn enqueue_unique(
        &self,
        name: &str,
        run_at: DateTime<FixedOffset>,
        now: DateTime<FixedOffset>,
    ) -> Result<ScheduledWork> {
        let work = ScheduledWork {
            id: Uuid::new_v4(),
            name: name.to_string(),
            run_at,
            attempt: 0,
            enqueued_at: now,
        };
        self.put_work(&work)?;
        log::debug!("Enqueued {} for {}", name, run_at.to_rfc3339());
        Ok(work)
    }

    fn pending(&self, name: &str) -> Result<Option<ScheduledWork>> {
        let row = self
            .conn()
            .query_row(
                &format!("SELECT {WORK_COLUMNS} FROM work_queue WHERE name = ?1"),
                params![name],
                work_from_row,
            )
            .optional()?;
        row.map(decode_work).transpose()
    }

    fn cancel(&self, name: &str) -> Result<bool> {
        let removed = self
            .conn()
            .execute("DELETE FROM work_queue WHERE name = ?1", params![name])?;
        Ok(removed > 0)
    }

    fn due(&self, now: DateTime<FixedOffset>) -> Result<Vec<ScheduledWork>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {WORK_COLUMNS} FROM work_queue WHERE run_at_ms <= ?1 ORDER BY run_at_ms"
        ))?;
        let rows = stmt.query_map(params![now.timestamp_millis()], work_from_row)?;
        rows.map(|row| decode_work(row?)).collect()
    }

    fn next_run(&self) -> Result<Option<ScheduledWork>> {
        let row = self
            .conn()
            .query_row(
                &format!("SELECT {WORK_COLUMNS} FROM work_queue ORDER BY run_at_ms LIMIT 1"),
                [],
                work_from_row,
            )
            .optional()?;
        row.map(decode_work).transpose()
    }

    fn complete(&self, work: &ScheduledWork) -> Result<()> {
        self.conn().execute(
            "DELETE FROM work_queue WHERE name = ?1 AND id = ?2",
            params![work.name, work.id.to_string()],
        )?;
        Ok(())
    }

    fn retry(
        &self,
        work: &ScheduledWork,
        now: DateTime<FixedOffset>,
    ) -> Result<Option<ScheduledWork>> {
        match self.pending(&work.name)? {
            None => {
                log::info!("Not retrying {}: it was cancelled", work.name);
                return Ok(None);
            }
            Some(current) if current.id != work.id => return Ok(Some(current)),
            Some(_) => {}
        }
        let attempt = work.attempt + 1;
        let retried = ScheduledWork {
            run_at: now + backoff_delay(attempt),
            attempt,
            ..work.clone()
        };
        self.put_work(&retried)?;
        log::warn!(
            "Retrying {} (attempt {}) at {}",
            work.name,
            attempt,
            retried.run_at.to_rfc3339()
        );
        Ok(Some(retried))
    }
}

/// In-process queue, for tests and embedders without persistence.
#[derive(Debug, Default)]
pub struct MemoryWorkQueue {
    items: RefCell<HashMap<String, ScheduledWork>>,
}

impl MemoryWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl WorkQueue for MemoryWorkQueue {
    fn enqueue_unique(
        &self,
        name: &str,
        run_at: DateTime<FixedOffset>,
        now: DateTime<FixedOffset>,
    ) -> Result<ScheduledWork> {
        let work = ScheduledWork {
            id: Uuid::new_v4(),
            name: name.to_string(),
            run_at,
            attempt: 0,
            enqueued_at: now,
        };
        self.items
            .borrow_mut()
            .insert(name.to_string(), work.clone());
        Ok(work)
    }

    fn pending(&self, name: &str) -> Result<Option<ScheduledWork>> {
        Ok(self.items.borrow().get(name).cloned())
    }

    fn cancel(&self, name: &str) -> Result<bool> {
        Ok(self.items.borrow_mut().remove(name).is_some())
    }

    fn due(&self, now: DateTime<FixedOffset>) -> Result<Vec<ScheduledWork>> {
        let mut due: Vec<_> = self
            .items
            .borrow()
            .values()
            .filter(|w| w.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|w| w.run_at);
        Ok(due)
    }

    fn next_run(&self) -> Result<Option<ScheduledWork>> {
        Ok(self.items.borrow().values().min_by_key(|w| w.run_at).cloned())
    }

    fn complete(&self, work: &ScheduledWork) -> Result<()> {
        let mut items = self.items.borrow_mut();
        if items.get(&work.name).is_some_and(|w| w.id == work.id) {
            items.remove(&work.name);
        }
        Ok(())
    }

    fn retry(
        &self,
        work: &ScheduledWork,
        now: DateTime<FixedOffset>,
    ) -> Result<Option<ScheduledWork>> {
        let mut items = self.items.borrow_mut();
        match items.get(&work.name) {
            None => return Ok(None),
            Some(current) if current.id != work.id => return Ok(Some(current.clone())),
            Some(_) => {}
        }
        let attempt = work.attempt + 1;
        let retried = ScheduledWork {
            run_at: now + backoff_delay(attempt),
            attempt,
            ..work.clone()
        };
        items.insert(work.name.clone(), retried.clone());
        Ok(Some(retried))
    }
}
