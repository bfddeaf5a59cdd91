//! JSON application configuration.
//!
//! Stores:
//! - Check scheduling bounds and the prompt auto-dismiss timeout
//! - The mood catalog
//! - Display preferences (theme, clock format, timeline length)
//!
//! Configuration is stored at `~/.config/moodlog/config.json` and is always
//! read and written as a whole document. Documents written before the
//! `version` marker existed are recognised by their `mood_groups` field and
//! rewritten into the current schema.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;
use crate::mood::{default_moods, validate_moods, Mood, MoodCatalog};
use crate::scheduler::IntervalBounds;
use crate::summary::MAX_TIMELINE_DAYS;

/// Current schema version.
pub const CONFIG_VERSION: u32 = 2;

/// Field that only appears in unversioned documents.
const LEGACY_SIGNATURE: &str = "mood_groups";

/// Check scheduling configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulingConfig {
    #[serde(default = "default_min_interval")]
    pub min_interval_minutes: u32,
    #[serde(default = "default_max_interval")]
    pub max_interval_minutes: u32,
    /// How long an interactive prompt waits before dismissing itself.
    #[serde(default = "default_prompt_timeout")]
    pub prompt_timeout_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TimeFormat {
    #[default]
    #[serde(rename = "24h")]
    TwentyFourHour,
    #[serde(rename = "12h")]
    TwelveHour,
}

impl TimeFormat {
    /// strftime pattern for an hour label.
    pub fn hour_pattern(&self) -> &'static str {
        match self {
            TimeFormat::TwentyFourHour => "%H:00",
            TimeFormat::TwelveHour => "%l %p",
        }
    }
}

/// Display configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub time_format: TimeFormat,
    #[serde(default = "default_timeline_days")]
    pub timeline_days: u32,
}

/// Application configuration.
///
/// Serialized to/from JSON at `~/.config/moodlog/config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    #[serde(default = "default_moods")]
    pub moods: Vec<Mood>,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Unversioned document layout.
#[derive(Debug, Deserialize)]
struct LegacyConfig {
    #[serde(default = "default_min_interval")]
    min_interval: u32,
    #[serde(default = "default_max_interval")]
    max_interval: u32,
    #[serde(default)]
    dark_mode: Option<bool>,
}

impl From<LegacyConfig> for Config {
    fn from(legacy: LegacyConfig) -> Self {
        let theme = match legacy.dark_mode {
            Some(true) => Theme::Dark,
            Some(false) => Theme::Light,
            None => Theme::System,
        };
        Self {
            scheduling: SchedulingConfig {
                min_interval_minutes: legacy.min_interval,
                max_interval_minutes: legacy.max_interval,
                ..SchedulingConfig::default()
            },
            // The old grouping has no equivalent in the tagged catalog.
            moods: default_moods(),
            display: DisplayConfig {
                theme,
                ..DisplayConfig::default()
            },
            ..Config::default()
        }
    }
}

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_min_interval() -> u32 {
    30
}
fn default_max_interval() -> u32 {
    90
}
fn default_prompt_timeout() -> u64 {
    300
}
fn default_timeline_days() -> u32 {
    7
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            min_interval_minutes: default_min_interval(),
            max_interval_minutes: default_max_interval(),
            prompt_timeout_seconds: default_prompt_timeout(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            time_format: TimeFormat::default(),
            timeline_days: default_timeline_days(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            scheduling: SchedulingConfig::default(),
            moods: default_moods(),
            display: DisplayConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = match current {
                serde_json::Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                other => other.get(part)?,
            };
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = match current {
                serde_json::Value::Array(items) => part
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.get_mut(i))
                    .ok_or_else(unknown)?,
                other => other.get_mut(part).ok_or_else(unknown)?,
            };
        }

        Err(unknown())
    }

    /// Default location of the document.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.json"))
    }

    /// Parse a document, upgrading unversioned layouts.
    ///
    /// Returns the config and whether it was rewritten from the legacy layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config document or the
    /// resulting values fail validation.
    pub fn parse(content: &str) -> Result<(Self, bool), ConfigError> {
        let value: serde_json::Value =
            serde_json::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        let obj = value
            .as_object()
            .ok_or_else(|| ConfigError::ParseFailed("top level is not an object".into()))?;

        let is_legacy = !obj.contains_key("version") && obj.contains_key(LEGACY_SIGNATURE);
        let cfg: Config = if is_legacy {
            let legacy: LegacyConfig = serde_json::from_value(value)
                .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
            legacy.into()
        } else {
            let mut cfg: Config = serde_json::from_value(value)
                .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
            if cfg.version > CONFIG_VERSION {
                return Err(ConfigError::ParseFailed(format!(
                    "unsupported config version {}",
                    cfg.version
                )));
            }
            cfg.version = CONFIG_VERSION;
            cfg
        };

        cfg.validate()?;
        Ok((cfg, is_legacy))
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.interval_bounds().map_err(|e| ConfigError::InvalidValue {
            key: "scheduling".into(),
            message: e.to_string(),
        })?;
        if self.scheduling.prompt_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "scheduling.prompt_timeout_seconds".into(),
                message: "must be at least 1".into(),
            });
        }
        if !(1..=MAX_TIMELINE_DAYS).contains(&self.display.timeline_days) {
            return Err(ConfigError::InvalidValue {
                key: "display.timeline_days".into(),
                message: format!("must be between 1 and {MAX_TIMELINE_DAYS}"),
            });
        }
        validate_moods(&self.moods).map_err(|e| ConfigError::InvalidValue {
            key: "moods".into(),
            message: e.to_string(),
        })
    }

    /// Load from `path`, creating it with defaults when missing.
    ///
    /// A legacy document is rewritten in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed,
    /// or if the default/migrated document cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let (cfg, migrated) = Self::parse(&content)?;
                if migrated {
                    log::info!("Rewriting legacy config at {}", path.display());
                    cfg.save_to(path)?;
                }
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Load from the default location.
    ///
    /// # Errors
    ///
    /// See [`Config::load_from`].
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, returning defaults on any error.
    pub fn load_or_default_from(path: &Path) -> Self {
        Self::load_from(path).unwrap_or_else(|e| {
            log::warn!("Using default config: {e}");
            Self::default()
        })
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        match Self::path() {
            Ok(path) => Self::load_or_default_from(&path),
            Err(e) => {
                log::warn!("Using default config: {e}");
                Self::default()
            }
        }
    }

    /// Persist the whole document to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = serde_json::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// See [`Config::save_to`].
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Read a config document from an arbitrary file (legacy accepted).
    ///
    /// # Errors
    ///
    /// Unlike loading, a malformed import is reported instead of replaced.
    pub fn import_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let (cfg, migrated) = Self::parse(&content)?;
        if migrated {
            log::info!("Imported legacy config from {}", path.display());
        }
        Ok(cfg)
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key. The change is validated but not saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the resulting config is invalid. On error `self` is unchanged.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Validated interval bounds.
    ///
    /// # Errors
    ///
    /// Returns an error when min/max are out of order or range.
    pub fn interval_bounds(&self) -> Result<IntervalBounds, crate::error::ValidationError> {
        IntervalBounds::new(
            self.scheduling.min_interval_minutes,
            self.scheduling.max_interval_minutes,
        )
    }

    pub fn catalog(&self) -> MoodCatalog {
        MoodCatalog::new(&self.moods)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let (parsed, migrated) = Config::parse(&json).unwrap();
        assert!(!migrated);
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("display.theme").as_deref(), Some("system"));
        assert_eq!(
            cfg.get("scheduling.min_interval_minutes").as_deref(),
            Some("30")
        );
        assert_eq!(cfg.get("moods.1.name").as_deref(), Some("Happy"));
        assert!(cfg.get("display.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_number() {
        let mut cfg = Config::default();
        cfg.set("scheduling.max_interval_minutes", "120").unwrap();
        assert_eq!(cfg.scheduling.max_interval_minutes, 120);
    }

    #[test]
    fn set_updates_enum_string() {
        let mut cfg = Config::default();
        cfg.set("display.time_format", "12h").unwrap();
        assert_eq!(cfg.display.time_format, TimeFormat::TwelveHour);
        assert!(cfg.set("display.theme", "neon").is_err());
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        let result = cfg.set("display.nonexistent_key", "value");
        assert!(matches!(result, Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        let result =
            Config::set_json_value_by_path(&mut json, "scheduling.min_interval_minutes", "soon");
        assert!(result.is_err());
    }

    #[test]
    fn set_rejects_inverted_bounds_and_leaves_config_unchanged() {
        let mut cfg = Config::default();
        let result = cfg.set("scheduling.min_interval_minutes", "200");
        assert!(result.is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn set_caps_timeline_days() {
        let mut cfg = Config::default();
        assert!(cfg.set("display.timeline_days", "200000000").is_err());
        assert_eq!(cfg, Config::default());
        cfg.set("display.timeline_days", "365").unwrap();
        assert_eq!(cfg.display.timeline_days, 365);
    }

    #[test]
    fn set_replaces_mood_list_wholesale() {
        let mut cfg = Config::default();
        cfg.set(
            "moods",
            r##"[{"name":"Fine","color":"#00ff00","tags":["positive"]}]"##,
        )
        .unwrap();
        assert_eq!(cfg.moods.len(), 1);
        assert_eq!(cfg.catalog().moods().len(), 2);
    }

    #[test]
    fn legacy_document_is_migrated() {
        let legacy = r#"{
            "min_interval": 20,
            "max_interval": 80,
            "mood_groups": { "good": ["Chuffed"], "bad": ["Grumpy"] },
            "dark_mode": true
        }"#;
        let (cfg, migrated) = Config::parse(legacy).unwrap();
        assert!(migrated);
        assert_eq!(cfg.version, CONFIG_VERSION);
        assert_eq!(cfg.scheduling.min_interval_minutes, 20);
        assert_eq!(cfg.scheduling.max_interval_minutes, 80);
        assert_eq!(cfg.display.theme, Theme::Dark);
        assert_eq!(cfg.moods, default_moods());
        assert!(cfg.catalog().find("Chuffed").is_none());
    }

    #[test]
    fn future_version_is_rejected() {
        assert!(Config::parse(r#"{"version": 99}"#).is_err());
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let (cfg, migrated) = Config::parse(r#"{"version": 2}"#).unwrap();
        assert!(!migrated);
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn load_from_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn load_from_rewrites_legacy_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"min_interval": 45, "max_interval": 75, "mood_groups": {}}"#,
        )
        .unwrap();

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.scheduling.min_interval_minutes, 45);

        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["version"], CONFIG_VERSION);
        assert!(on_disk.get("mood_groups").is_none());
    }

    #[test]
    fn malformed_file_degrades_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(Config::load_from(&path).is_err());
        assert_eq!(Config::load_or_default_from(&path), Config::default());
    }

    #[test]
    fn import_reports_malformed_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("import.json");
        std::fs::write(&path, r#"{"version": 2, "scheduling": {"min_interval_minutes": 0}}"#)
            .unwrap();
        assert!(Config::import_from(&path).is_err());
    }
}
