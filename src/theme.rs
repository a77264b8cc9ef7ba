//! Persisted light/dark theme preference
//!
//! The only local state besides the session token. Stored in a small JSON
//! key-value file under the fixed key [`THEME_KEY`].

use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Storage key for the theme preference
pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON file of string preferences
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut prefs = self.load()?;
        prefs.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&prefs)
            .map_err(|e| ClientError::Preferences(e.to_string()))?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|e| {
            ClientError::Preferences(format!("{}: {}", self.path.display(), e))
        })
    }
}

/// Theme preference, read at startup and written on toggle
#[derive(Debug)]
pub struct ThemePreference {
    store: PreferenceStore,
    current: Theme,
}

impl ThemePreference {
    /// Load the stored theme; with nothing stored, follow the system setting
    pub fn load(store: PreferenceStore, system_prefers_dark: bool) -> Result<Self> {
        let stored = store.get(THEME_KEY)?.as_deref().and_then(Theme::parse);
        let current = match stored {
            Some(theme) => theme,
            None if system_prefers_dark => Theme::Dark,
            None => Theme::Light,
        };
        Ok(Self { store, current })
    }

    pub fn current(&self) -> Theme {
        self.current
    }

    /// Flip the theme and persist it
    pub fn toggle(&mut self) -> Result<Theme> {
        let next = self.current.toggled();
        self.store.set(THEME_KEY, next.as_str())?;
        tracing::debug!(theme = %next, "Theme toggled");
        self.current = next;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_system_preference() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("prefs.json"));

        let light = ThemePreference::load(store.clone(), false).unwrap();
        assert_eq!(light.current(), Theme::Light);

        let dark = ThemePreference::load(store, true).unwrap();
        assert_eq!(dark.current(), Theme::Dark);
    }

    #[test]
    fn test_toggle_persists_under_fixed_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");
        let store = PreferenceStore::new(&path);

        let mut pref = ThemePreference::load(store.clone(), false).unwrap();
        assert_eq!(pref.toggle().unwrap(), Theme::Dark);
        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some("dark"));

        // stored value wins over the system preference on next startup
        let reloaded = ThemePreference::load(store, false).unwrap();
        assert_eq!(reloaded.current(), Theme::Dark);
    }

    #[test]
    fn test_unknown_stored_value_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::new(dir.path().join("prefs.json"));
        store.set(THEME_KEY, "sepia").unwrap();

        let pref = ThemePreference::load(store, true).unwrap();
        assert_eq!(pref.current(), Theme::Dark);
    }

    #[test]
    fn test_corrupt_file_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{not json").unwrap();

        let result = PreferenceStore::new(path).get(THEME_KEY);
        assert!(matches!(result, Err(ClientError::Preferences(_))));
    }
}
