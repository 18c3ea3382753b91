//! Configuration commands.
//!
//! - `config show`: Display current configuration
//! - `config set`: Set a configuration value

use owo_colors::OwoColorize;
use serde_json::json;

use super::{CommandOutput, OutputOptions};
use crate::config::Config;
use crate::error::Result;
use crate::paths::platform_data_dir;

/// Mask a sensitive value by showing only the first 2 and last 2 characters
fn mask_sensitive_value(value: &str) -> String {
    let char_count = value.chars().count();
    if char_count > 4 {
        let first: String = value.chars().take(2).collect();
        let last: String = value.chars().skip(char_count - 2).collect();
        format!("{first}...{last}")
    } else {
        "****".to_string()
    }
}

pub fn cmd_config_show(output: OutputOptions) -> Result<()> {
    let config = Config::load()?;

    let remote_json = config.remote.as_ref().map(|r| {
        json!({
            "base_url": r.base_url,
            "api_key_configured": r.api_key().is_some(),
            "timeout_secs": r.timeout_secs,
            "poll_interval_secs": r.poll_interval_secs,
        })
    });
    let json_output = json!({
        "dataset_path": config.dataset_path().to_string_lossy(),
        "geocache_path": config.geocache_path().to_string_lossy(),
        "remote": remote_json,
        "config_file": Config::config_path().to_string_lossy(),
    });

    let mut text = format!("{}\n\n", "Configuration:".cyan().bold());
    text.push_str(&format!(
        "{}: {}\n",
        "dataset_path".cyan(),
        config.dataset_path().display()
    ));
    text.push_str(&format!(
        "{}: {}\n\n",
        "geocache_path".cyan(),
        config.geocache_path().display()
    ));

    match &config.remote {
        Some(remote) => {
            text.push_str(&format!("{}:\n", "remote".cyan()));
            text.push_str(&format!("  base_url: {}\n", remote.base_url));
            let key = match &remote.api_key {
                Some(key) => mask_sensitive_value(key),
                None if remote.api_key().is_some() => "from KENNZEICHEN_API_KEY".to_string(),
                None => "not configured".dimmed().to_string(),
            };
            text.push_str(&format!("  api_key: {key}\n"));
            text.push_str(&format!("  timeout_secs: {}\n", remote.timeout_secs));
            text.push_str(&format!(
                "  poll_interval_secs: {}\n",
                remote.poll_interval_secs
            ));
        }
        None => {
            text.push_str(&format!(
                "{}: {}\n",
                "remote".cyan(),
                "not configured (sync offline)".dimmed()
            ));
        }
    }

    text.push('\n');
    text.push_str(
        &format!("Config file: {}", Config::config_path().display())
            .dimmed()
            .to_string(),
    );
    if let Some(dir) = platform_data_dir() {
        text.push_str(
            &format!("\nShared data directory: {}", dir.display())
                .dimmed()
                .to_string(),
        );
    }

    CommandOutput::new(json_output).with_text(text).print(output)
}

pub fn cmd_config_set(key: &str, value: &str, output: OutputOptions) -> Result<()> {
    let mut config = Config::load()?;
    config.set(key, value)?;
    config.save()?;

    let shown = if key == "remote.api_key" {
        mask_sensitive_value(value)
    } else {
        value.to_string()
    };
    CommandOutput::new(json!({
        "action": "config_set",
        "key": key,
        "success": true,
    }))
    .with_text(format!("Set {} to {}", key.cyan(), shown))
    .print(output)
}
