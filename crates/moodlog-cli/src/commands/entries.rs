use chrono::NaiveTime;
use clap::Subcommand;
use moodlog_core::summary::{day_range, mood_distribution, timeline, TimelineDay};
use moodlog_core::storage::TimeFormat;

use super::{now, App};

#[derive(Subcommand)]
pub enum EntriesAction {
    /// List entries, oldest first
    List {
        /// Number of days back from today (defaults to display.timeline_days)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Hour-by-hour grid per day, most recent first
    Timeline {
        #[arg(long)]
        days: Option<u32>,
        /// Print a text grid instead of JSON
        #[arg(long)]
        plain: bool,
    },
    /// Counts per mood
    Stats {
        #[arg(long)]
        days: Option<u32>,
        /// Count sentinel entries too
        #[arg(long)]
        include_asleep: bool,
    },
}

fn render_plain(days: &[TimelineDay], format: TimeFormat) -> String {
    let mut out = String::new();
    for day in days {
        out.push_str(&format!("{} ({} recorded)\n", day.date, day.recorded()));
        for (hour, mood) in day.hours.iter().enumerate() {
            let Some(mood) = mood else { continue };
            let label = NaiveTime::from_hms_opt(hour as u32, 0, 0)
                .map(|t| t.format(format.hour_pattern()).to_string())
                .unwrap_or_default();
            out.push_str(&format!("  {:>5}  {mood}\n", label.trim()));
        }
    }
    out
}

pub fn run(action: EntriesAction) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::open()?;
    let today = now().date_naive();
    let default_days = app.config.display.timeline_days;

    match action {
        EntriesAction::List { days } => {
            let (from, to) = day_range(today, days.unwrap_or(default_days))?;
            let entries = app.db.entries_between(from, to)?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        EntriesAction::Timeline { days, plain } => {
            let days = timeline(&app.db, today, days.unwrap_or(default_days))?;
            if plain {
                print!("{}", render_plain(&days, app.config.display.time_format));
            } else {
                println!("{}", serde_json::to_string_pretty(&days)?);
            }
        }
        EntriesAction::Stats {
            days,
            include_asleep,
        } => {
            let (from, to) = day_range(today, days.unwrap_or(default_days))?;
            let counts = mood_distribution(
                &app.db,
                &app.config.catalog(),
                from,
                to,
                include_asleep,
            )?;
            println!("{}", serde_json::to_string_pretty(&counts)?);
        }
    }
    Ok(())
}
