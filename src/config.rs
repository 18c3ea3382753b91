//! Application configuration.
//!
//! Stored in `<root>/config.yaml`. Every field is optional; a missing file
//! is the default configuration, and a missing `remote` section means sync
//! runs in offline mode.

use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::{KennzeichenError, Result};
use crate::paths::{default_dataset_path, default_geocache_path, kennzeichen_root};

/// Keys accepted by `config set`.
pub const SETTABLE_KEYS: &[&str] = &[
    "dataset_path",
    "geocache_path",
    "remote.base_url",
    "remote.api_key",
    "remote.timeout_secs",
    "remote.poll_interval_secs",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geocache_path: Option<PathBuf>,

    /// Remote document service. Absent means offline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Interval between remote polls in seconds (default: 15)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_secs() -> u64 {
    15
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .finish()
    }
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }

    /// API key from `KENNZEICHEN_API_KEY`, falling back to the config file.
    pub fn api_key(&self) -> Option<SecretString> {
        if let Ok(key) = env::var("KENNZEICHEN_API_KEY")
            && !key.is_empty()
        {
            return Some(SecretString::from(key));
        }
        self.api_key.clone().map(SecretString::from)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

impl Config {
    pub fn config_path() -> PathBuf {
        kennzeichen_root().join("config.yaml")
    }

    /// Load configuration from file, or return default if not found
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            KennzeichenError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config at {}: {}", path.display(), e),
            ))
        })?;
        let config: Config = serde_yaml_ng::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                KennzeichenError::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create directory for config at {}: {}",
                        parent.display(),
                        e
                    ),
                ))
            })?;
        }

        let content = serde_yaml_ng::to_string(self)?;
        fs::write(&path, content).map_err(|e| {
            KennzeichenError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write config at {}: {}", path.display(), e),
            ))
        })?;

        // The file may hold an API key: owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&path, permissions)?;
        }

        Ok(())
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.dataset_path.clone().unwrap_or_else(default_dataset_path)
    }

    pub fn geocache_path(&self) -> PathBuf {
        self.geocache_path
            .clone()
            .unwrap_or_else(default_geocache_path)
    }

    pub fn is_remote_configured(&self) -> bool {
        self.remote
            .as_ref()
            .is_some_and(|r| !r.base_url.trim().is_empty())
    }

    /// Set a single value by dotted key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "dataset_path" => self.dataset_path = Some(PathBuf::from(value)),
            "geocache_path" => self.geocache_path = Some(PathBuf::from(value)),
            "remote.base_url" => {
                url::Url::parse(value)?;
                match self.remote.as_mut() {
                    Some(remote) => remote.base_url = value.to_string(),
                    None => self.remote = Some(RemoteConfig::new(value)),
                }
            }
            "remote.api_key" => self.remote_mut(key)?.api_key = Some(value.to_string()),
            "remote.timeout_secs" => {
                let secs = parse_secs(key, value)?;
                self.remote_mut(key)?.timeout_secs = secs;
            }
            "remote.poll_interval_secs" => {
                let secs = parse_secs(key, value)?;
                self.remote_mut(key)?.poll_interval_secs = secs;
            }
            _ => {
                return Err(KennzeichenError::Config(format!(
                    "unknown config key '{}', expected one of: {}",
                    key,
                    SETTABLE_KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }

    fn remote_mut(&mut self, key: &str) -> Result<&mut RemoteConfig> {
        self.remote.as_mut().ok_or_else(|| {
            KennzeichenError::Config(format!("set remote.base_url before setting {key}"))
        })
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    value.trim().parse().map_err(|_| {
        KennzeichenError::Config(format!("{key} must be a whole number of seconds, got '{value}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_config_default_is_offline() {
        let config = Config::default();
        assert!(!config.is_remote_configured());
        assert!(config.remote.is_none());
    }

    #[test]
    fn test_remote_defaults_apply() {
        let yaml = r#"
remote:
  base_url: https://sync.example.com
"#;
        let config: Config = serde_yaml_ng::from_str(yaml).unwrap();
        let remote = config.remote.as_ref().unwrap();
        assert_eq!(remote.timeout_secs, 30);
        assert_eq!(remote.poll_interval_secs, 15);
        assert!(config.is_remote_configured());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut remote = RemoteConfig::new("https://sync.example.com");
        remote.api_key = Some("hunter2".to_string());
        let debug = format!("{remote:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_set_keys() {
        let mut config = Config::default();
        assert!(config.set("remote.api_key", "k").is_err());
        assert!(config.set("remote.base_url", "not a url").is_err());

        config.set("remote.base_url", "https://sync.example.com").unwrap();
        config.set("remote.timeout_secs", "5").unwrap();
        config.set("dataset_path", "/data/plates.json").unwrap();
        assert_eq!(config.remote.as_ref().unwrap().timeout_secs, 5);
        assert_eq!(config.dataset_path(), PathBuf::from("/data/plates.json"));

        assert!(config.set("remote.timeout_secs", "soon").is_err());
        assert!(config.set("colour", "blue").is_err());
    }

    #[test]
    #[serial]
    fn test_save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        // SAFETY: We use #[serial] to ensure single-threaded access
        unsafe { std::env::set_var("KENNZEICHEN_ROOT", dir.path()) };

        let mut config = Config::default();
        config.set("remote.base_url", "https://sync.example.com").unwrap();
        config.save().unwrap();
        let loaded = Config::load().unwrap();
        assert_eq!(
            loaded.remote.unwrap().base_url,
            "https://sync.example.com"
        );

        unsafe { std::env::remove_var("KENNZEICHEN_ROOT") };
    }
}
