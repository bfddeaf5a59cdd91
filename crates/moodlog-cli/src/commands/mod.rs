//! Subcommand handlers and the state they share.

pub mod config;
pub mod daemon;
pub mod data;
pub mod entries;
pub mod fire;
pub mod moods;
pub mod record;
pub mod track;

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, Local};
use moodlog_core::error::Result;
use moodlog_core::storage::data_dir;
use moodlog_core::tracking::{check_consistency, repair};
use moodlog_core::{Config, Database, TrackingDrift};

pub fn now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

/// Open storage and configuration.
pub struct App {
    pub db: Database,
    pub config: Config,
    pub config_path: PathBuf,
}

impl App {
    /// Open without touching tracking state.
    pub fn open_raw() -> Result<Self> {
        let dir = data_dir()?;
        let config_path = dir.join("config.json");
        let config = Config::load_or_default_from(&config_path);
        let db = Database::open_at(&dir.join("moodlog.db"))?;
        Ok(Self {
            db,
            config,
            config_path,
        })
    }

    /// Open and bring the queue back in line with the tracking flag, as
    /// every launch does.
    pub fn open() -> Result<Self> {
        let app = Self::open_raw()?;
        app.sync_tracking()?;
        Ok(app)
    }

    pub fn sync_tracking(&self) -> Result<TrackingDrift> {
        let drift = check_consistency(&self.db, &self.db)?;
        if drift != TrackingDrift::Consistent {
            let bounds = self.config.interval_bounds()?;
            repair(
                drift,
                &self.db,
                &self.db,
                bounds,
                now(),
                &mut rand::thread_rng(),
            )?;
        }
        Ok(drift)
    }
}
