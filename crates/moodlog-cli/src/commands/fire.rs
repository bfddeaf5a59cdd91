use moodlog_core::{Prompter, Recorder};

use super::{now, App};
use crate::prompt::{NoticePrompter, TerminalPrompter};

/// Run one check immediately. The queued check is replaced by the next one.
pub fn run(interactive: bool) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::open()?;
    let mut prompter: Box<dyn Prompter> = if interactive {
        Box::new(TerminalPrompter::new())
    } else {
        Box::new(NoticePrompter)
    };

    let recorder = Recorder::new(&app.db, &app.db, &app.config);
    let report = recorder.fire(now(), prompter.as_mut(), &mut rand::thread_rng())?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
