use std::path::PathBuf;

use clap::Subcommand;
use moodlog_core::Config;

use super::App;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Dot-separated key (e.g. "scheduling.min_interval_minutes", "moods.0.color")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value (JSON for objects and arrays)
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
    /// Replace the config with a document from a file
    Import {
        /// Source file; unversioned documents are upgraded
        file: PathBuf,
    },
    /// Write the current config to a file
    Export {
        /// Destination file
        file: PathBuf,
    },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::open_raw()?;
    match action {
        ConfigAction::Get { key } => match app.config.get(&key) {
            Some(value) => println!("{value}"),
            None => {
                eprintln!("unknown key: {key}");
                std::process::exit(1);
            }
        },
        ConfigAction::Set { key, value } => {
            let mut config = app.config;
            config.set(&key, &value)?;
            config.save_to(&app.config_path)?;
            println!("ok");
        }
        ConfigAction::List => {
            println!("{}", serde_json::to_string_pretty(&app.config)?);
        }
        ConfigAction::Reset => {
            Config::default().save_to(&app.config_path)?;
            println!("config reset to defaults");
        }
        ConfigAction::Import { file } => {
            let config = Config::import_from(&file)?;
            config.save_to(&app.config_path)?;
            println!("config imported from {}", file.display());
        }
        ConfigAction::Export { file } => {
            app.config.save_to(&file)?;
            println!("config exported to {}", file.display());
        }
    }
    Ok(())
}
