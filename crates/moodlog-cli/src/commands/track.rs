use clap::Subcommand;
use moodlog_core::summary::dashboard;
use moodlog_core::tracking::{check_consistency, start_tracking, stop_tracking};
use moodlog_core::TrackingDrift;

use super::{now, App};

#[derive(Subcommand)]
pub enum TrackAction {
    /// Enable tracking and queue the first check
    Start,
    /// Disable tracking and drop the queued check
    Stop,
    /// Show tracking state, queue and today's progress
    Status,
    /// Compare the tracking flag with the queue
    Check {
        /// Fix any mismatch found
        #[arg(long)]
        repair: bool,
    },
}

pub fn run(action: TrackAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TrackAction::Start => {
            let app = App::open()?;
            let bounds = app.config.interval_bounds()?;
            let work = start_tracking(&app.db, &app.db, bounds, now(), &mut rand::thread_rng())?;
            println!("{}", serde_json::to_string_pretty(&work)?);
        }
        TrackAction::Stop => {
            let app = App::open()?;
            stop_tracking(&app.db, &app.db)?;
            println!("tracking stopped");
        }
        TrackAction::Status => {
            let app = App::open()?;
            let status = dashboard(&app.db, &app.db, now())?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        TrackAction::Check { repair } => {
            let app = App::open_raw()?;
            let drift = if repair {
                app.sync_tracking()?
            } else {
                check_consistency(&app.db, &app.db)?
            };
            println!("{}", serde_json::to_string_pretty(&drift)?);
            if repair && drift != TrackingDrift::Consistent {
                println!("repaired");
            }
        }
    }
    Ok(())
}
