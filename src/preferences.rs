//! UI preferences persisted in the key-value store.
//!
//! Unknown or unreadable stored values fall back to the default.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{KennzeichenError, Result};
use crate::storage::{KeyValueStore, keys};
use crate::types::ViewMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    De,
    En,
}

enum_display_fromstr!(
    Language,
    KennzeichenError::InvalidLanguage,
    {
        De => "de",
        En => "en",
    }
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

enum_display_fromstr!(
    Theme,
    KennzeichenError::InvalidTheme,
    {
        System => "system",
        Light => "light",
        Dark => "dark",
    }
);

impl Language {
    pub fn toggled(self) -> Self {
        match self {
            Language::De => Language::En,
            Language::En => Language::De,
        }
    }
}

impl Theme {
    /// system → light → dark → system
    pub fn next(self) -> Self {
        match self {
            Theme::System => Theme::Light,
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::System,
        }
    }
}

pub struct Preferences {
    storage: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    pub fn view_mode(&self) -> ViewMode {
        self.read(keys::VIEW_MODE)
    }

    pub fn set_view_mode(&self, view_mode: ViewMode) -> Result<()> {
        self.storage.set(keys::VIEW_MODE, view_mode.as_str())
    }

    pub fn language(&self) -> Language {
        self.read(keys::LANGUAGE)
    }

    pub fn set_language(&self, language: Language) -> Result<()> {
        self.storage.set(keys::LANGUAGE, language.as_str())
    }

    pub fn theme(&self) -> Theme {
        self.read(keys::THEME)
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        self.storage.set(keys::THEME, theme.as_str())
    }

    /// Advance to the next theme and persist it.
    pub fn toggle_language(&self) -> Result<Language> {
        let next = self.language().toggled();
        self.set_language(next)?;
        Ok(next)
    }

    pub fn cycle_theme(&self) -> Result<Theme> {
        let next = self.theme().next();
        self.set_theme(next)?;
        Ok(next)
    }

    fn read<T>(&self, key: &str) -> T
    where
        T: FromStr + Default,
    {
        match self.storage.get(key) {
            Ok(Some(raw)) => raw.parse().unwrap_or_else(|_| {
                tracing::debug!("ignoring unknown stored value for {key}: {raw:?}");
                T::default()
            }),
            Ok(None) => T::default(),
            Err(e) => {
                tracing::warn!("failed to read preference {key}: {e}");
                T::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn prefs() -> (Arc<MemoryStore>, Preferences) {
        let store = Arc::new(MemoryStore::new());
        let prefs = Preferences::new(store.clone());
        (store, prefs)
    }

    #[test]
    fn test_defaults() {
        let (_, prefs) = prefs();
        assert_eq!(prefs.view_mode(), ViewMode::Alphabetical);
        assert_eq!(prefs.language(), Language::De);
        assert_eq!(prefs.theme(), Theme::System);
    }

    #[test]
    fn test_theme_cycles_and_persists() {
        let (store, prefs) = prefs();
        assert_eq!(prefs.cycle_theme().unwrap(), Theme::Light);
        assert_eq!(prefs.cycle_theme().unwrap(), Theme::Dark);
        assert_eq!(prefs.cycle_theme().unwrap(), Theme::System);
        assert_eq!(store.get(keys::THEME).unwrap().as_deref(), Some("system"));
    }

    #[test]
    fn test_language_toggles() {
        let (store, prefs) = prefs();
        assert_eq!(prefs.toggle_language().unwrap(), Language::En);
        assert_eq!(store.get(keys::LANGUAGE).unwrap().as_deref(), Some("en"));
        assert_eq!(prefs.toggle_language().unwrap(), Language::De);
    }

    #[test]
    fn test_round_trip() {
        let (_, prefs) = prefs();
        prefs.set_view_mode(ViewMode::Grouped).unwrap();
        prefs.set_language(Language::En).unwrap();
        assert_eq!(prefs.view_mode(), ViewMode::Grouped);
        assert_eq!(prefs.language(), Language::En);
    }

    #[test]
    fn test_garbage_falls_back_to_default() {
        let (store, prefs) = prefs();
        store.set(keys::LANGUAGE, "fr").unwrap();
        store.set(keys::VIEW_MODE, "{}").unwrap();
        assert_eq!(prefs.language(), Language::De);
        assert_eq!(prefs.view_mode(), ViewMode::Alphabetical);
    }
}
