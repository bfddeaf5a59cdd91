use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration as StdDuration;

use chrono::{DateTime, FixedOffset};
use moodlog_core::error::Result as CoreResult;
use moodlog_core::{Prompter, Recorder, WorkQueue, MOOD_CHECK_WORK};

use super::{now, App};
use crate::prompt::{NoticePrompter, TerminalPrompter};

/// Upper bound on a single sleep, so clock changes and queue edits made by
/// other invocations are picked up.
const POLL_INTERVAL: StdDuration = StdDuration::from_secs(30);

type SharedPrompter = Arc<Mutex<Box<dyn Prompter + Send>>>;

pub fn run(interactive: bool) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(interactive))
}

async fn serve(interactive: bool) -> Result<(), Box<dyn std::error::Error>> {
    let drift = App::open_raw()?.sync_tracking()?;
    log::info!("Daemon started (startup check: {drift:?})");

    let prompter: Box<dyn Prompter + Send> = if interactive {
        Box::new(TerminalPrompter::new())
    } else {
        Box::new(NoticePrompter)
    };
    let prompter: SharedPrompter = Arc::new(Mutex::new(prompter));

    loop {
        let shared = Arc::clone(&prompter);
        let next = match tokio::task::spawn_blocking(move || tick(&shared)).await? {
            Ok(next) => next,
            Err(e) => {
                log::error!("Tick failed: {e}");
                None
            }
        };

        let wait = wait_for(next, now());
        log::debug!("Sleeping {}s", wait.as_secs());
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, shutting down");
                break;
            }
        }
    }
    Ok(())
}

/// Run every due item once. Returns the next wake-up time.
fn tick(prompter: &Mutex<Box<dyn Prompter + Send>>) -> CoreResult<Option<DateTime<FixedOffset>>> {
    let app = App::open()?;
    let recorder = Recorder::new(&app.db, &app.db, &app.config);
    let mut rng = rand::thread_rng();

    for work in app.db.due(now())? {
        if work.name != MOOD_CHECK_WORK {
            log::warn!("Dropping unknown work item '{}'", work.name);
            app.db.cancel(&work.name)?;
            continue;
        }

        let mut guard = prompter.lock().unwrap_or_else(PoisonError::into_inner);
        match recorder.fire(now(), guard.as_mut(), &mut rng) {
            Ok(report) => {
                log::debug!("Fired: {report:?}");
                app.db.complete(&work)?;
            }
            Err(e) => match app.db.retry(&work, now())? {
                Some(retry) => log::error!(
                    "Mood check failed: {e}; retry {} at {}",
                    retry.attempt,
                    retry.run_at.to_rfc3339()
                ),
                None => log::error!("Mood check failed: {e}; tracking was stopped"),
            },
        }
    }

    Ok(app.db.next_run()?.map(|work| work.run_at))
}

fn wait_for(next: Option<DateTime<FixedOffset>>, now: DateTime<FixedOffset>) -> StdDuration {
    match next {
        Some(at) => (at - now)
            .to_std()
            .unwrap_or(StdDuration::ZERO)
            .min(POLL_INTERVAL),
        None => POLL_INTERVAL,
    }
}
