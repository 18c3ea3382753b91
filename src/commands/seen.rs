//! `seen` subcommands: mark, unsee, toggle, list, export, import, clear.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use owo_colors::OwoColorize;
use serde_json::json;

use super::{AppContext, CommandOutput, OutputOptions};
use crate::display::{format_code, format_timestamp};
use crate::error::{KennzeichenError, Result};
use crate::seen::{DEFAULT_RECENT_LIMIT, SeenStore, export_file_name};

/// Push local changes when a remote is configured. Failures are reported but
/// never fail the command: the local change is already saved.
async fn sync_after_change(ctx: &AppContext, seen: Arc<SeenStore>) {
    let engine = match ctx.sync_engine(seen) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Warning: sync unavailable: {e}");
            return;
        }
    };
    if !engine.is_configured() {
        return;
    }
    if engine.start().await {
        tracing::debug!("sync after change finished with status {}", engine.status());
    } else {
        eprintln!("Warning: could not reach the sync service, changes kept locally");
    }
    engine.stop();
}

pub async fn cmd_seen_mark(codes: &[String], output: OutputOptions) -> Result<()> {
    let ctx = AppContext::load()?;
    let dataset = ctx.dataset();
    let resolved = codes
        .iter()
        .map(|c| ctx.canonical_code(&dataset, c))
        .collect::<Result<Vec<_>>>()?;

    let seen = ctx.seen();
    for code in &resolved {
        seen.mark_seen(code);
    }
    sync_after_change(&ctx, Arc::clone(&seen)).await;

    let text = resolved
        .iter()
        .map(|c| format!("Marked {} as seen", format_code(c)))
        .collect::<Vec<_>>()
        .join("\n");
    CommandOutput::new(json!({
        "action": "mark",
        "codes": resolved,
        "seen_count": seen.count(),
    }))
    .with_text(text)
    .print(output)
}

pub async fn cmd_seen_unsee(codes: &[String], output: OutputOptions) -> Result<()> {
    let ctx = AppContext::load()?;
    let dataset = ctx.dataset();
    let resolved = codes
        .iter()
        .map(|c| ctx.canonical_code(&dataset, c))
        .collect::<Result<Vec<_>>>()?;

    let seen = ctx.seen();
    for code in &resolved {
        seen.unsee(code);
    }
    sync_after_change(&ctx, Arc::clone(&seen)).await;

    let text = resolved
        .iter()
        .map(|c| format!("Removed {} from seen", format_code(c)))
        .collect::<Vec<_>>()
        .join("\n");
    CommandOutput::new(json!({
        "action": "unsee",
        "codes": resolved,
        "seen_count": seen.count(),
    }))
    .with_text(text)
    .print(output)
}

pub async fn cmd_seen_toggle(code: &str, output: OutputOptions) -> Result<()> {
    let ctx = AppContext::load()?;
    let dataset = ctx.dataset();
    let code = ctx.canonical_code(&dataset, code)?;

    let seen = ctx.seen();
    let now_seen = seen.toggle(&code);
    sync_after_change(&ctx, Arc::clone(&seen)).await;

    let text = if now_seen {
        format!("Marked {} as seen", format_code(&code))
    } else {
        format!("Removed {} from seen", format_code(&code))
    };
    CommandOutput::new(json!({
        "action": "toggle",
        "code": code,
        "seen": now_seen,
    }))
    .with_text(text)
    .print(output)
}

/// List seen codes, most recent first.
pub fn cmd_seen_list(recent: Option<Option<usize>>, output: OutputOptions) -> Result<()> {
    let ctx = AppContext::load()?;
    let dataset = ctx.dataset();
    let seen = ctx.seen();
    let entries = match recent {
        Some(limit) => seen.recently_seen(limit.unwrap_or(DEFAULT_RECENT_LIMIT)),
        None => seen.list_seen_details(),
    };

    let json_output = json!({
        "count": seen.count(),
        "entries": entries,
    });

    let text = if entries.is_empty() {
        "No codes marked as seen yet.".dimmed().to_string()
    } else {
        let mut lines: Vec<String> = entries
            .iter()
            .map(|entry| {
                let district = dataset
                    .find(&entry.code)
                    .map(|r| r.city_district.as_str())
                    .unwrap_or("");
                format!(
                    "{} {} {}",
                    format_code(&entry.code),
                    format_timestamp(entry.seen_at).dimmed(),
                    district
                )
            })
            .collect();
        lines.push(format!("\n{} of {} seen", seen.count(), dataset.len()));
        lines.join("\n")
    };

    CommandOutput::new(json_output).with_text(text).print(output)
}

/// Write the seen list to `path`, or to `kennzeichen-seen-<today>.json`.
pub fn cmd_seen_export(path: Option<&Path>, output: OutputOptions) -> Result<()> {
    let ctx = AppContext::load()?;
    let seen = ctx.seen();
    let path: PathBuf = match path {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(export_file_name(jiff::Zoned::now().date())),
    };

    let content = seen.export_json()?;
    std::fs::write(&path, content).map_err(|e| {
        KennzeichenError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to write export at {}: {}", path.display(), e),
        ))
    })?;

    CommandOutput::new(json!({
        "action": "export",
        "path": path.display().to_string(),
        "count": seen.count(),
    }))
    .with_text(format!(
        "Exported {} codes to {}",
        seen.count(),
        path.display().to_string().cyan()
    ))
    .print(output)
}

/// Merge an exported file into the local list. Local entries always win.
pub async fn cmd_seen_import(path: &Path, output: OutputOptions) -> Result<()> {
    let ctx = AppContext::load()?;
    let content = std::fs::read_to_string(path).map_err(|e| {
        KennzeichenError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read import file at {}: {}", path.display(), e),
        ))
    })?;

    let seen = ctx.seen();
    let result = seen.import_json(&content)?;
    if result.imported > 0 {
        sync_after_change(&ctx, Arc::clone(&seen)).await;
    }

    let mut text = format!("Imported {} codes", result.imported.to_string().green());
    if result.skipped > 0 {
        text.push_str(&format!(", skipped {}", result.skipped.to_string().yellow()));
    }
    CommandOutput::new(json!({
        "action": "import",
        "imported": result.imported,
        "skipped": result.skipped,
    }))
    .with_text(text)
    .print(output)
}

pub fn cmd_seen_clear(yes: bool, output: OutputOptions) -> Result<()> {
    if !yes {
        return Err(KennzeichenError::Other(
            "refusing to clear the seen list without --yes".to_string(),
        ));
    }
    let ctx = AppContext::load()?;
    let seen = ctx.seen();
    let removed = seen.count();
    seen.clear();

    CommandOutput::new(json!({
        "action": "clear",
        "removed": removed,
    }))
    .with_text(format!("Cleared {removed} seen codes"))
    .print(output)
}
