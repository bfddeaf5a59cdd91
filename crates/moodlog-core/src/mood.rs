//! Mood catalog.
//!
//! Moods are immutable reference data: a display name, a color and a set of
//! classification tags. The catalog comes from bundled defaults or from the
//! user's configuration; the `Asleep` sentinel is always part of it.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Label written for hours the user never answered.
pub const ASLEEP: &str = "Asleep";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodTag {
    Positive,
    Negative,
    Neutral,
    Energetic,
    Calm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mood {
    pub name: String,
    /// `#rrggbb`
    pub color: String,
    #[serde(default)]
    pub tags: Vec<MoodTag>,
}

impl Mood {
    pub fn new(name: &str, color: &str, tags: &[MoodTag]) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
            tags: tags.to_vec(),
        }
    }

    pub fn has_tag(&self, tag: MoodTag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn is_sentinel(&self) -> bool {
        self.name.eq_ignore_ascii_case(ASLEEP)
    }
}

fn asleep() -> Mood {
    Mood::new(ASLEEP, "#4b5563", &[MoodTag::Neutral, MoodTag::Calm])
}

/// Bundled default catalog.
pub fn default_moods() -> Vec<Mood> {
    use MoodTag::*;
    vec![
        Mood::new("Excited", "#f97316", &[Positive, Energetic]),
        Mood::new("Happy", "#facc15", &[Positive, Energetic]),
        Mood::new("Content", "#84cc16", &[Positive, Calm]),
        Mood::new("Relaxed", "#22c55e", &[Positive, Calm]),
        Mood::new("Neutral", "#94a3b8", &[Neutral]),
        Mood::new("Bored", "#a8a29e", &[Negative, Calm]),
        Mood::new("Tired", "#6366f1", &[Negative, Calm]),
        Mood::new("Sad", "#3b82f6", &[Negative, Calm]),
        Mood::new("Anxious", "#a855f7", &[Negative, Energetic]),
        Mood::new("Angry", "#ef4444", &[Negative, Energetic]),
        asleep(),
    ]
}

/// Checks a `#rrggbb` color string.
pub fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Effective catalog built from a configured mood list.
#[derive(Debug, Clone)]
pub struct MoodCatalog {
    moods: Vec<Mood>,
}

impl MoodCatalog {
    /// Builds the catalog, appending the sentinel if the list lacks it.
    pub fn new(moods: &[Mood]) -> Self {
        let mut moods = moods.to_vec();
        if !moods.iter().any(Mood::is_sentinel) {
            moods.push(asleep());
        }
        Self { moods }
    }

    pub fn moods(&self) -> &[Mood] {
        &self.moods
    }

    /// Moods offered in a prompt (everything except the sentinel).
    pub fn choices(&self) -> impl Iterator<Item = &Mood> {
        self.moods.iter().filter(|m| !m.is_sentinel())
    }

    /// Case-insensitive lookup.
    pub fn find(&self, name: &str) -> Option<&Mood> {
        let name = name.trim();
        self.moods.iter().find(|m| m.name.eq_ignore_ascii_case(name))
    }

    /// Resolves a user-supplied name to the catalog's canonical spelling.
    pub fn resolve(&self, name: &str) -> Result<&Mood, ValidationError> {
        self.find(name)
            .ok_or_else(|| ValidationError::UnknownMood(name.trim().to_string()))
    }
}

impl Default for MoodCatalog {
    fn default() -> Self {
        Self::new(&default_moods())
    }
}

/// Checks a mood list: non-empty unique names and valid colors.
pub fn validate_moods(moods: &[Mood]) -> Result<(), ValidationError> {
    let mut seen: Vec<String> = Vec::with_capacity(moods.len());
    for mood in moods {
        let key = mood.name.trim().to_lowercase();
        if key.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "moods.name".into(),
                message: "mood name must not be empty".into(),
            });
        }
        if mood.name.chars().any(char::is_control) {
            return Err(ValidationError::InvalidValue {
                field: "moods.name".into(),
                message: format!("mood name {:?} contains control characters", mood.name),
            });
        }
        if seen.contains(&key) {
            return Err(ValidationError::InvalidValue {
                field: "moods.name".into(),
                message: format!("duplicate mood '{}'", mood.name),
            });
        }
        if !is_hex_color(&mood.color) {
            return Err(ValidationError::InvalidValue {
                field: "moods.color".into(),
                message: format!("'{}' is not a #rrggbb color", mood.color),
            });
        }
        seen.push(key);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_include_sentinel() {
        let moods = default_moods();
        validate_moods(&moods).unwrap();
        assert!(moods.iter().any(Mood::is_sentinel));
    }

    #[test]
    fn catalog_appends_missing_sentinel() {
        let catalog = MoodCatalog::new(&[Mood::new("Fine", "#ffffff", &[MoodTag::Neutral])]);
        assert_eq!(catalog.moods().len(), 2);
        assert!(catalog.find("asleep").is_some());
        assert_eq!(catalog.choices().count(), 1);
    }

    #[test]
    fn resolve_is_case_insensitive() {
        let catalog = MoodCatalog::default();
        assert_eq!(catalog.resolve("  happy ").unwrap().name, "Happy");
        assert!(matches!(
            catalog.resolve("Ecstatic"),
            Err(ValidationError::UnknownMood(_))
        ));
    }

    #[test]
    fn validate_rejects_duplicates_and_bad_colors() {
        let dup = vec![
            Mood::new("Ok", "#000000", &[]),
            Mood::new("OK", "#111111", &[]),
        ];
        assert!(validate_moods(&dup).is_err());
        assert!(validate_moods(&[Mood::new("Ok", "red", &[])]).is_err());
        assert!(validate_moods(&[Mood::new(" ", "#000000", &[])]).is_err());
    }

    #[test]
    fn validate_rejects_line_breaks_in_names() {
        assert!(validate_moods(&[Mood::new("Fine\nish", "#000000", &[])]).is_err());
        assert!(validate_moods(&[Mood::new("Tab\there", "#000000", &[])]).is_err());
        assert!(validate_moods(&[Mood::new("Meh, \"fine\"", "#000000", &[])]).is_ok());
    }
}
