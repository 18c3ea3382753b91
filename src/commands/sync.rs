//! `sync` subcommands.

use std::sync::Arc;

use owo_colors::OwoColorize;
use serde_json::json;

use super::{AppContext, CommandOutput, OutputOptions};
use crate::display::{format_status_colored, format_timestamp};
use crate::error::{KennzeichenError, Result};
use crate::sync::SyncEngine;

/// Start an engine against the configured remote, or explain why not.
async fn started_engine(ctx: &AppContext) -> Result<Arc<SyncEngine>> {
    let engine = ctx.sync_engine(ctx.seen())?;
    if !engine.is_configured() {
        return Err(KennzeichenError::SyncUnavailable(
            "no remote configured, set one with: kennzeichen config set remote.base_url <url>"
                .to_string(),
        ));
    }
    if !engine.start().await {
        return Err(KennzeichenError::SyncUnavailable(
            "could not sign in to the sync service".to_string(),
        ));
    }
    Ok(engine)
}

fn status_output(engine: &SyncEngine) -> CommandOutput {
    let status = engine.status();
    let identity = engine.export_identity();
    let target = engine.target_id();
    let linked = target.is_some() && target != identity;
    let last_sync = engine.last_sync();

    let json_output = json!({
        "status": status.as_str(),
        "identity": identity,
        "alias": engine.alias(),
        "target": target,
        "linked": linked,
        "last_sync": last_sync.map(|ts| ts.to_string()),
    });

    let mut text = format!("{} {}\n", "Sync:".cyan().bold(), format_status_colored(status));
    match engine.alias() {
        Some(alias) => text.push_str(&format!("  sync code: {}\n", alias.bold())),
        None => text.push_str(&format!("  sync code: {}\n", "none".dimmed())),
    }
    if let Some(identity) = &identity {
        text.push_str(&format!("  identity:  {identity}\n"));
    }
    if linked && let Some(target) = &target {
        text.push_str(&format!("  linked to: {target}\n"));
    }
    match last_sync {
        Some(ts) => text.push_str(&format!("  last sync: {}", format_timestamp(ts))),
        None => text.push_str(&format!("  last sync: {}", "never".dimmed())),
    }

    CommandOutput::new(json_output).with_text(text)
}

pub async fn cmd_sync_status(output: OutputOptions) -> Result<()> {
    let ctx = AppContext::load()?;
    let engine = ctx.sync_engine(ctx.seen())?;
    if engine.is_configured() {
        engine.start().await;
    }
    let result = status_output(&engine).print(output);
    engine.stop();
    result
}

/// Manual sync: merge with the remote document and write the union back.
pub async fn cmd_sync_push(output: OutputOptions) -> Result<()> {
    let ctx = AppContext::load()?;
    let engine = started_engine(&ctx).await?;
    let result = status_output(&engine).print(output);
    engine.stop();
    result
}

/// Link to another device by its sync code or identity.
pub async fn cmd_sync_link(code: &str, output: OutputOptions) -> Result<()> {
    let ctx = AppContext::load()?;
    let engine = started_engine(&ctx).await?;
    let target = engine.link_peer(code).await;
    let result = target.and_then(|target| {
        CommandOutput::new(json!({
            "action": "link",
            "target": target,
            "status": engine.status().as_str(),
        }))
        .with_text(format!("Linked to {}", target.cyan()))
        .print(output)
    });
    engine.stop();
    result
}

pub async fn cmd_sync_unlink(output: OutputOptions) -> Result<()> {
    let ctx = AppContext::load()?;
    let engine = started_engine(&ctx).await?;
    let result = engine.unlink_peer().await.and_then(|()| {
        CommandOutput::new(json!({
            "action": "unlink",
            "target": engine.target_id(),
        }))
        .with_text("Unlinked, syncing this device's own list")
        .print(output)
    });
    engine.stop();
    result
}
