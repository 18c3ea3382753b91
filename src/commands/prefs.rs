//! `prefs` subcommands: view mode, language and theme.

use owo_colors::OwoColorize;
use serde_json::json;

use super::{AppContext, CommandOutput, OutputOptions};
use crate::error::{KennzeichenError, Result};
use crate::preferences::{Language, Theme};
use crate::types::ViewMode;

pub fn cmd_prefs_show(output: OutputOptions) -> Result<()> {
    let prefs = AppContext::load()?.preferences();
    let (view_mode, language, theme) = (prefs.view_mode(), prefs.language(), prefs.theme());

    CommandOutput::new(json!({
        "view_mode": view_mode.as_str(),
        "language": language.as_str(),
        "theme": theme.as_str(),
    }))
    .with_text(format!(
        "{}: {view_mode}\n{}: {language}\n{}: {theme}",
        "view_mode".cyan(),
        "language".cyan(),
        "theme".cyan()
    ))
    .print(output)
}

pub fn cmd_prefs_set(key: &str, value: &str, output: OutputOptions) -> Result<()> {
    let prefs = AppContext::load()?.preferences();
    let stored = match key {
        "view_mode" => {
            let view_mode: ViewMode = value.parse()?;
            prefs.set_view_mode(view_mode)?;
            view_mode.to_string()
        }
        "language" => {
            let language: Language = value.parse()?;
            prefs.set_language(language)?;
            language.to_string()
        }
        "theme" => {
            let theme: Theme = value.parse()?;
            prefs.set_theme(theme)?;
            theme.to_string()
        }
        _ => {
            return Err(KennzeichenError::Config(format!(
                "unknown preference '{key}', expected one of: view_mode, language, theme"
            )));
        }
    };

    CommandOutput::new(json!({
        "action": "prefs_set",
        "key": key,
        "value": stored,
    }))
    .with_text(format!("Set {} to {}", key.cyan(), stored))
    .print(output)
}

pub fn cmd_prefs_toggle_language(output: OutputOptions) -> Result<()> {
    let language = AppContext::load()?.preferences().toggle_language()?;
    CommandOutput::new(json!({ "language": language.as_str() }))
        .with_text(format!("Language: {}", language.as_str().cyan()))
        .print(output)
}

/// system → light → dark → system
pub fn cmd_prefs_cycle_theme(output: OutputOptions) -> Result<()> {
    let theme = AppContext::load()?.preferences().cycle_theme()?;
    CommandOutput::new(json!({ "theme": theme.as_str() }))
        .with_text(format!("Theme: {}", theme.as_str().cyan()))
        .print(output)
}
