mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, DisplayConfig, SchedulingConfig, Theme, TimeFormat, CONFIG_VERSION};
pub use database::{Database, MoodEntry};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/moodlog[-dev]/` based on MOODLOG_ENV.
///
/// Set MOODLOG_ENV=dev to use the development data directory, or
/// MOODLOG_DATA_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("MOODLOG_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("MOODLOG_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("moodlog-dev")
            } else {
                base_dir.join("moodlog")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
