use std::path::PathBuf;

use clap::Subcommand;
use moodlog_core::transfer::{export_entries_to, import_entries_from};
use moodlog_core::Config;

use super::App;

#[derive(Subcommand)]
pub enum DataAction {
    /// Export every entry as CSV
    Export {
        /// Destination file
        file: PathBuf,
    },
    /// Import entries from CSV, overwriting hours already recorded
    Import {
        /// Source file
        file: PathBuf,
    },
    /// Delete all entries, tracking state and queued checks, and reset config
    Reset {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

pub fn run(action: DataAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        DataAction::Export { file } => {
            let app = App::open()?;
            let written = export_entries_to(&app.db, &file)?;
            println!("exported {written} entries to {}", file.display());
        }
        DataAction::Import { file } => {
            let app = App::open()?;
            let summary = import_entries_from(&app.db, &file)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        DataAction::Reset { yes } => {
            if !yes {
                return Err("refusing to delete data without --yes".into());
            }
            let app = App::open_raw()?;
            app.db.reset_all()?;
            Config::default().save_to(&app.config_path)?;
            println!("all data deleted");
        }
    }
    Ok(())
}
