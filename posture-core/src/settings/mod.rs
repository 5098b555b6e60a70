//! settings — JSON-backed display settings and link table
//!
//! The launcher reads both files at startup. Display settings are rewritten
//! in full on every theme change; an unknown theme value is a configuration
//! error, not a default. Callers go through this service and never hold a
//! file handle themselves.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Default location of the display settings file.
pub const DISPLAY_SETTINGS_PATH: &str = "config/display_settings.json";
/// Default location of the URL table.
pub const URLS_PATH: &str = "config/urls.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// The persisted view-layer settings: a flat JSON object whose one
/// meaningful key is `theme`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DisplaySettings {
    pub theme: Theme,
}

impl DisplaySettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("could not read display settings: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("display settings file is corrupt: {}", path.display()))
    }

    /// Rewrite the whole settings file. Concurrent writers are not
    /// considered.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let raw =
            serde_json::to_string_pretty(self).context("could not serialize display settings")?;
        fs::write(path, raw)
            .with_context(|| format!("could not write display settings: {}", path.display()))
    }
}

/// Logical link names → URLs shown by the launcher. Absent keys simply
/// yield no link.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrlMap(HashMap<String, String>);

impl UrlMap {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("could not read URL table: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("URL table is corrupt: {}", path.display()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_round_trips_through_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("display_settings.json");

        DisplaySettings { theme: Theme::Dark }
            .save(&path)
            .expect("save");
        let reloaded = DisplaySettings::load(&path).expect("load");
        assert_eq!(reloaded.theme, Theme::Dark);
    }

    #[test]
    fn unknown_theme_value_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("display_settings.json");
        fs::write(&path, r#"{"theme": "sepia"}"#).expect("write");

        assert!(DisplaySettings::load(&path).is_err());
    }

    #[test]
    fn missing_settings_file_is_an_error() {
        assert!(DisplaySettings::load("does/not/exist.json").is_err());
    }

    #[test]
    fn absent_url_key_yields_no_link() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("urls.json");
        fs::write(&path, r#"{"readme": "https://example.invalid/readme"}"#).expect("write");

        let urls = UrlMap::load(&path).expect("load");
        assert_eq!(urls.get("readme"), Some("https://example.invalid/readme"));
        assert_eq!(urls.get("changelog"), None);
    }
}
