//! # Moodlog Core Library
//!
//! This library provides the core logic for Moodlog, an hourly mood logger.
//! At semi-random moments the user is asked how they feel; the answer is
//! stored against the calendar hour it belongs to, and hours nobody answered
//! are backfilled with the `Asleep` sentinel.
//!
//! ## Architecture
//!
//! - **Storage**: SQLite entry store keyed by hour-bucket, plus a JSON
//!   configuration document
//! - **Scheduler**: next-check interval selection, a persisted unique-work
//!   queue, and missed-entry reconciliation
//! - **Tracking**: the on/off flag and its consistency with the queue
//! - **Recorder**: one firing of the check loop and out-of-band answers
//!
//! ## Key Components
//!
//! - [`Recorder`]: runs a check and re-enqueues the next one
//! - [`Database`]: entry, flag and work persistence
//! - [`Config`]: interval bounds, mood catalog, display preferences
//! - [`WorkQueue`]: trait for deferred work storage

pub mod error;
pub mod hour;
pub mod mood;
pub mod recorder;
pub mod scheduler;
pub mod storage;
pub mod summary;
pub mod tracking;
pub mod transfer;

pub use error::{ConfigError, CoreError, DatabaseError, TransferError, ValidationError};
pub use hour::HourBucket;
pub use mood::{Mood, MoodCatalog, MoodTag, ASLEEP};
pub use recorder::{
    DeferredPrompter, FireReport, PromptOutcome, PromptRequest, PromptResponse, Prompter, Recorder,
};
pub use scheduler::{
    next_check_delay, IntervalBounds, MemoryWorkQueue, ScheduledWork, WorkQueue, MOOD_CHECK_WORK,
};
pub use storage::{Config, Database, MoodEntry};
pub use summary::{DashboardStatus, MoodCount, TimelineDay};
pub use tracking::{TrackingDrift, TrackingState};
pub use transfer::ImportSummary;
