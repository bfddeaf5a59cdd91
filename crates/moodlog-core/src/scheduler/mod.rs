//! Check scheduling: when the next mood check runs, how it is queued, and
//! how an unanswered hour is finalized.

pub mod interval;
pub mod queue;
pub mod reconcile;

pub use interval::{fallback_delay, next_check_delay, IntervalBounds, FALLBACK_DELAY_MINUTES};
pub use queue::{backoff_delay, MemoryWorkQueue, ScheduledWork, WorkQueue, MOOD_CHECK_WORK};
pub use reconcile::reconcile_missed;
