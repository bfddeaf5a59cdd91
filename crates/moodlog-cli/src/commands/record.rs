use moodlog_core::{HourBucket, Recorder};

use super::{now, App};

/// Answer the pending prompt, or overwrite an explicit hour.
pub fn run(mood: &str, hour: Option<i64>) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::open()?;
    let recorder = Recorder::new(&app.db, &app.db, &app.config);
    let entry = match hour {
        Some(id) => recorder.record_at(HourBucket::from_id(id)?, mood, now())?,
        None => recorder.respond(mood, now())?,
    };
    println!("{}", serde_json::to_string_pretty(&entry)?);
    Ok(())
}
