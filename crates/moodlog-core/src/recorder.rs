//! The recurring mood check.
//!
//! Each firing finalizes the hour before it (and an older unanswered prompt),
//! asks for the current mood and queues the next firing. Answers can also arrive later through
//! [`Recorder::respond`] when the prompt only left a notice.

use std::time::Duration as StdDuration;

use chrono::{DateTime, FixedOffset};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::hour::HourBucket;
use crate::mood::{Mood, MoodCatalog};
use crate::scheduler::queue::{ScheduledWork, WorkQueue, MOOD_CHECK_WORK};
use crate::scheduler::reconcile::reconcile_missed;
use crate::storage::{Config, Database, MoodEntry};
use crate::tracking::{schedule_next_check, TrackingState};

/// What a prompt surface is asked to show.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub bucket: HourBucket,
    pub choices: Vec<Mood>,
    /// Auto-dismiss after this long.
    pub timeout: StdDuration,
    pub issued_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptResponse {
    Answered(String),
    TimedOut,
    /// A notice was left; the answer comes later via [`Recorder::respond`].
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptOutcome {
    pub response: PromptResponse,
    /// When the prompt closed.
    pub at: DateTime<FixedOffset>,
}

/// A surface that can ask the user for their mood.
pub trait Prompter {
    fn prompt(&mut self, request: &PromptRequest) -> Result<PromptOutcome>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FireReport {
    /// Tracking was off; nothing was prompted or queued.
    Skipped,
    Fired {
        bucket: HourBucket,
        /// `Asleep` entries written for finalized hours.
        sentinels: Vec<MoodEntry>,
        answer: Option<MoodEntry>,
        /// `None` when tracking was switched off while the prompt was open.
        next: Option<ScheduledWork>,
    },
}

/// Runs the check loop against one database and queue.
pub struct Recorder<'a, Q: WorkQueue + ?Sized> {
    db: &'a Database,
    queue: &'a Q,
    config: &'a Config,
}

impl<'a, Q: WorkQueue + ?Sized> Recorder<'a, Q> {
    pub fn new(db: &'a Database, queue: &'a Q, config: &'a Config) -> Self {
        Self { db, queue, config }
    }

    fn catalog(&self) -> MoodCatalog {
        self.config.catalog()
    }

    /// One firing of the loop.
    ///
    /// # Errors
    /// Storage failures propagate so the caller can retry the firing; every
    /// step is an idempotent upsert.
    pub fn fire<P: Prompter + ?Sized, R: Rng>(
        &self,
        now: DateTime<FixedOffset>,
        prompter: &mut P,
        rng: &mut R,
    ) -> Result<FireReport> {
        let mut state = TrackingState::load(self.db)?;
        if !state.enabled {
            if self.queue.cancel(MOOD_CHECK_WORK)? {
                log::info!("Tracking is off, dropped stale mood check");
            }
            return Ok(FireReport::Skipped);
        }

        let sentinels = reconcile_missed(self.db, &state, now)?;

        let bucket = HourBucket::of(&now);
        state.current_bucket = Some(bucket);
        state.last_check = Some(now);
        state.save(self.db)?;

        let catalog = self.catalog();
        let request = PromptRequest {
            bucket,
            choices: catalog.choices().cloned().collect(),
            timeout: StdDuration::from_secs(self.config.scheduling.prompt_timeout_seconds),
            issued_at: now,
        };
        log::info!("Mood check for {bucket}");
        let outcome = prompter.prompt(&request)?;

        let answer = match outcome.response {
            PromptResponse::Answered(ref name) => match catalog.resolve(name) {
                Ok(mood) => {
                    let entry = MoodEntry::new(bucket, outcome.at, &mood.name);
                    self.db.upsert_entry(&entry)?;
                    log::info!("Recorded {} for {bucket}", entry.mood);
                    Some(entry)
                }
                Err(e) => {
                    log::warn!("Ignoring answer: {e}");
                    None
                }
            },
            PromptResponse::TimedOut => {
                log::info!("Prompt for {bucket} dismissed without answer");
                None
            }
            PromptResponse::Deferred => None,
        };

        // The prompt may have been open for a while; honour a stop issued meanwhile.
        let next = if TrackingState::load(self.db)?.enabled {
            let bounds = self.config.interval_bounds()?;
            Some(schedule_next_check(self.db, self.queue, bounds, outcome.at, rng)?)
        } else {
            None
        };

        Ok(FireReport::Fired {
            bucket,
            sentinels,
            answer,
            next,
        })
    }

    /// Record an answer that arrives outside a blocking prompt.
    ///
    /// The answer goes to the pending prompt's hour while that hour is
    /// unanswered and no older than the previous hour; otherwise to the
    /// hour containing `now`.
    ///
    /// # Errors
    /// Returns an error for moods outside the catalog or on storage failure.
    pub fn respond(&self, mood: &str, now: DateTime<FixedOffset>) -> Result<MoodEntry> {
        let catalog = self.catalog();
        let mood = catalog.resolve(mood)?;
        let state = TrackingState::load(self.db)?;
        let current = HourBucket::of(&now);

        let bucket = match state.current_bucket {
            Some(pending)
                if (pending == current || pending == current.previous())
                    && !self.db.has_entry(pending)? =>
            {
                pending
            }
            _ => current,
        };

        let entry = MoodEntry::new(bucket, now, &mood.name);
        self.db.upsert_entry(&entry)?;
        log::info!("Recorded {} for {bucket}", entry.mood);
        Ok(entry)
    }

    /// Record a mood for an explicit hour (manual backfill or correction).
    ///
    /// # Errors
    /// Returns an error for moods outside the catalog or on storage failure.
    pub fn record_at(
        &self,
        bucket: HourBucket,
        mood: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<MoodEntry> {
        let catalog = self.catalog();
        let mood = catalog.resolve(mood)?;
        let entry = MoodEntry::new(bucket, now, &mood.name);
        self.db.upsert_entry(&entry)?;
        log::info!("Recorded {} for {bucket}", entry.mood);
        Ok(entry)
    }
}

/// Prompter that never waits: it leaves the prompt for a later `respond`.
#[derive(Debug, Default)]
pub struct DeferredPrompter;

impl Prompter for DeferredPrompter {
    fn prompt(&mut self, request: &PromptRequest) -> Result<PromptOutcome> {
        Ok(PromptOutcome {
            response: PromptResponse::Deferred,
            at: request.issued_at,
        })
    }
}
