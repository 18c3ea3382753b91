use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::io;
use std::path::PathBuf;

use crate::commands::OutputOptions;
use crate::dataset::DEFAULT_SUGGESTION_LIMIT;
use crate::types::ViewMode;

#[derive(Parser)]
#[command(name = "kennzeichen")]
#[command(about = "Look up German license plate codes and track the ones you have seen")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search codes by prefix, or places by name
    #[command(visible_alias = "s")]
    Search {
        /// Search text; prefix with == for an exact code match
        query: Option<String>,

        /// Only codes from this federal state (name or abbreviation)
        #[arg(long)]
        state: Option<String>,

        /// Only codes marked as seen
        #[arg(long)]
        seen: bool,

        /// Match the query as one full code
        #[arg(long)]
        exact: bool,

        /// Group by letter (alphabetical) or by state (grouped); remembered
        #[arg(long, value_parser = parse_view_mode)]
        view: Option<ViewMode>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one code with its origin and seen state
    Show {
        /// License plate code (case-insensitive)
        #[arg(value_parser = parse_code)]
        code: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Complete a partial code
    Suggest {
        /// Start of a code
        input: String,

        /// Maximum number of suggestions
        #[arg(short, long, default_value_t = DEFAULT_SUGGESTION_LIMIT)]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the federal states with code counts
    States {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the list of seen codes
    Seen {
        #[command(subcommand)]
        action: SeenAction,
    },

    /// Sync the seen list across devices
    Sync {
        #[command(subcommand)]
        action: SyncAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Manage preferences
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for [possible values: bash, zsh, fish, powershell, elvish]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum SeenAction {
    /// Mark codes as seen
    Mark {
        #[arg(required = true, value_parser = parse_code)]
        codes: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove codes from the seen list
    Unsee {
        #[arg(required = true, value_parser = parse_code)]
        codes: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Flip the seen state of a code
    Toggle {
        #[arg(value_parser = parse_code)]
        code: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List seen codes, most recent first
    #[command(visible_alias = "ls")]
    List {
        /// Only the N most recent (10 when N is omitted)
        #[arg(long, value_name = "N", num_args = 0..=1)]
        recent: Option<Option<usize>>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the seen list to a JSON file
    Export {
        /// Output file (default: kennzeichen-seen-<date>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Merge a previously exported file; existing entries are kept
    Import {
        path: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Forget every seen code
    Clear {
        /// Confirm clearing
        #[arg(long)]
        yes: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum SyncAction {
    /// Show sync status, sync code and link
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Merge with the remote list now
    Push {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Share another device's list by its sync code (ABC123) or identity
    Link {
        code: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Stop sharing and sync this device's own list
    Unlink {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set a configuration value
    Set {
        /// Configuration key (dataset_path, geocache_path, remote.base_url, remote.api_key,
        /// remote.timeout_secs, remote.poll_interval_secs)
        key: String,
        /// Value to set
        value: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum PrefsAction {
    /// Show preferences
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set a preference (view_mode, language, theme)
    Set {
        key: String,
        value: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Switch between German and English
    ToggleLanguage {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Switch to the next theme (system, light, dark)
    CycleTheme {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    /// Execute the command, dispatching to the appropriate handler.
    pub async fn run(self) -> crate::error::Result<()> {
        use crate::commands::{
            SearchOptions, cmd_config_set, cmd_config_show, cmd_prefs_cycle_theme,
            cmd_prefs_set, cmd_prefs_show, cmd_prefs_toggle_language, cmd_search,
            cmd_seen_clear, cmd_seen_export, cmd_seen_import, cmd_seen_list, cmd_seen_mark,
            cmd_seen_toggle, cmd_seen_unsee, cmd_show, cmd_states, cmd_suggest, cmd_sync_link,
            cmd_sync_push, cmd_sync_status, cmd_sync_unlink,
        };

        let out = |json: bool| OutputOptions { json };

        match self {
            Commands::Search {
                query,
                state,
                seen,
                exact,
                view,
                json,
            } => cmd_search(
                SearchOptions {
                    query: query.as_deref(),
                    state: state.as_deref(),
                    seen_only: seen,
                    exact,
                    view,
                },
                out(json),
            ),

            Commands::Show { code, json } => cmd_show(&code, out(json)),

            Commands::Suggest { input, limit, json } => cmd_suggest(&input, limit, out(json)),

            Commands::States { json } => cmd_states(out(json)),

            Commands::Seen { action } => match action {
                SeenAction::Mark { codes, json } => cmd_seen_mark(&codes, out(json)).await,
                SeenAction::Unsee { codes, json } => cmd_seen_unsee(&codes, out(json)).await,
                SeenAction::Toggle { code, json } => cmd_seen_toggle(&code, out(json)).await,
                SeenAction::List { recent, json } => cmd_seen_list(recent, out(json)),
                SeenAction::Export { output, json } => {
                    cmd_seen_export(output.as_deref(), out(json))
                }
                SeenAction::Import { path, json } => cmd_seen_import(&path, out(json)).await,
                SeenAction::Clear { yes, json } => cmd_seen_clear(yes, out(json)),
            },

            Commands::Sync { action } => match action {
                SyncAction::Status { json } => cmd_sync_status(out(json)).await,
                SyncAction::Push { json } => cmd_sync_push(out(json)).await,
                SyncAction::Link { code, json } => cmd_sync_link(&code, out(json)).await,
                SyncAction::Unlink { json } => cmd_sync_unlink(out(json)).await,
            },

            Commands::Config { action } => match action {
                ConfigAction::Show { json } => cmd_config_show(out(json)),
                ConfigAction::Set { key, value, json } => {
                    cmd_config_set(&key, &value, out(json))
                }
            },

            Commands::Prefs { action } => match action {
                PrefsAction::Show { json } => cmd_prefs_show(out(json)),
                PrefsAction::Set { key, value, json } => cmd_prefs_set(&key, &value, out(json)),
                PrefsAction::ToggleLanguage { json } => cmd_prefs_toggle_language(out(json)),
                PrefsAction::CycleTheme { json } => cmd_prefs_cycle_theme(out(json)),
            },

            Commands::Completions { shell } => {
                generate_completions(shell);
                Ok(())
            }
        }
    }
}

fn parse_view_mode(s: &str) -> Result<ViewMode, String> {
    s.parse()
        .map_err(|_| "Invalid view. Must be one of: alphabetical, grouped".to_string())
}

fn parse_code(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err("code cannot be empty".to_string());
    }
    if !trimmed.chars().all(char::is_alphanumeric) {
        return Err("code must contain only letters and digits".to_string());
    }
    Ok(trimmed.to_string())
}

pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "kennzeichen", &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_code() {
        assert_eq!(parse_code(" hh ").unwrap(), "hh");
        assert_eq!(parse_code("LÖ").unwrap(), "LÖ");
        assert!(parse_code("").is_err());
        assert!(parse_code("H-1").is_err());
    }

    #[test]
    fn test_search_args() {
        let cli = Cli::try_parse_from(["kennzeichen", "search", "==B", "--view", "grouped"])
            .unwrap();
        match cli.command {
            Commands::Search { query, view, .. } => {
                assert_eq!(query.as_deref(), Some("==B"));
                assert_eq!(view, Some(ViewMode::Grouped));
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_seen_mark_requires_codes() {
        assert!(Cli::try_parse_from(["kennzeichen", "seen", "mark"]).is_err());
    }
}
