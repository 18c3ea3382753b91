//! CLI command implementations. Each `cmd_*` function backs one subcommand.

mod config;
mod lookup;
mod prefs;
mod seen;
mod sync;

pub use config::{cmd_config_set, cmd_config_show};
pub use lookup::{SearchOptions, cmd_search, cmd_show, cmd_states, cmd_suggest};
pub use prefs::{
    cmd_prefs_cycle_theme, cmd_prefs_set, cmd_prefs_show, cmd_prefs_toggle_language,
};
pub use seen::{
    cmd_seen_clear, cmd_seen_export, cmd_seen_import, cmd_seen_list, cmd_seen_mark,
    cmd_seen_toggle, cmd_seen_unsee,
};
pub use sync::{cmd_sync_link, cmd_sync_push, cmd_sync_status, cmd_sync_unlink};

use std::sync::Arc;

use serde_json::Value;

use crate::config::Config;
use crate::dataset::Dataset;
use crate::error::{KennzeichenError, Result};
use crate::paths::storage_dir;
use crate::preferences::Preferences;
use crate::remote::{HttpRemote, RemoteStore};
use crate::seen::SeenStore;
use crate::storage::{FileStore, KeyValueStore};
use crate::sync::SyncEngine;

/// Output flags shared by every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub json: bool,
}

/// A command result with a JSON form and an optional human-readable form.
pub struct CommandOutput {
    json: Value,
    text: Option<String>,
}

impl CommandOutput {
    pub fn new(json: Value) -> Self {
        Self { json, text: None }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn print(self, output: OutputOptions) -> Result<()> {
        match (output.json, self.text) {
            (false, Some(text)) => println!("{text}"),
            _ => print_json(&self.json)?,
        }
        Ok(())
    }
}

pub fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Everything a command needs from the data root.
pub struct AppContext {
    pub config: Config,
    pub storage: Arc<dyn KeyValueStore>,
}

impl AppContext {
    pub fn load() -> Result<Self> {
        Ok(Self {
            config: Config::load()?,
            storage: Arc::new(FileStore::new(storage_dir())),
        })
    }

    /// Load the dataset. A missing or broken file is reported and yields an
    /// empty dataset, so every command still runs.
    pub fn dataset(&self) -> Dataset {
        let path = self.config.dataset_path();
        match Dataset::try_load(&path) {
            Ok(dataset) => {
                tracing::debug!(
                    "loaded {} license plates from {}",
                    dataset.len(),
                    path.display()
                );
                dataset
            }
            Err(e) => {
                tracing::error!("Error loading license plate data: {e}");
                eprintln!("Warning: {e}");
                Dataset::default()
            }
        }
    }

    pub fn seen(&self) -> Arc<SeenStore> {
        Arc::new(SeenStore::open(Arc::clone(&self.storage)))
    }

    pub fn preferences(&self) -> Preferences {
        Preferences::new(Arc::clone(&self.storage))
    }

    pub fn remote(&self) -> Result<Option<Arc<dyn RemoteStore>>> {
        match &self.config.remote {
            Some(remote) if self.config.is_remote_configured() => {
                Ok(Some(Arc::new(HttpRemote::from_config(remote)?)))
            }
            _ => Ok(None),
        }
    }

    pub fn sync_engine(&self, seen: Arc<SeenStore>) -> Result<Arc<SyncEngine>> {
        Ok(SyncEngine::new(seen, Arc::clone(&self.storage), self.remote()?))
    }

    /// Resolve user input to the dataset's spelling of a code.
    ///
    /// With no dataset loaded any non-empty input is accepted (uppercased).
    pub fn canonical_code(&self, dataset: &Dataset, input: &str) -> Result<String> {
        let input = input.trim();
        if input.is_empty() {
            return Err(KennzeichenError::InvalidCode(input.to_string()));
        }
        if dataset.is_empty() {
            return Ok(input.to_uppercase());
        }
        dataset
            .find(input)
            .map(|r| r.code.clone())
            .ok_or_else(|| KennzeichenError::CodeNotFound(input.to_string()))
    }
}
