// src/commands/history.rs
//! Saved state listing, change reports and rollback

use super::{find_state, open_installation};
use crate::cli::InstallationArgs;
use anyhow::{Context, Result};
use tracing::info;

/// List saved states
pub fn cmd_history(args: &InstallationArgs, limit: Option<usize>, json: bool) -> Result<()> {
    let metadata = open_installation(args)?;
    let mut states = metadata
        .history()
        .context("Failed to read revision history")?;
    let total = states.len();
    if let Some(limit) = limit {
        states.truncate(limit);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&states)?);
        return Ok(());
    }

    if states.is_empty() {
        println!("No saved states recorded.");
        return Ok(());
    }

    println!(
        "{:>6}  {:8}  {:19}  {:12}  SUMMARY",
        "STATE", "KIND", "CREATED", "AUTHOR"
    );
    println!("{}", "-".repeat(78));

    for state in &states {
        println!(
            "{:>6}  {:8}  {:19}  {:12}  {}",
            state.number,
            state.kind,
            state.created_at.format("%Y-%m-%d %H:%M:%S"),
            state.author,
            state.summary
        );
    }

    println!();
    println!("Total: {} state(s)", total);
    Ok(())
}

/// Show what changed in the manifest since a saved state
pub fn cmd_changes(args: &InstallationArgs, state_number: i64, patch: bool) -> Result<()> {
    let metadata = open_installation(args)?;
    let from = find_state(&metadata, state_number)?;

    if patch {
        let diff = metadata
            .manifest_diff(&from)
            .context("Failed to diff manifest")?;
        if diff.is_unchanged() {
            println!("Manifest unchanged since state {}.", state_number);
        } else {
            print!("{}", diff.unified());
        }
        return Ok(());
    }

    let changes = metadata
        .changes_since(&from)
        .context("Failed to compute artifact changes")?;

    if changes.is_empty() {
        println!("No artifact changes since state {}.", state_number);
        return Ok(());
    }

    println!("Changes since state {}:", state_number);
    for change in &changes {
        println!("  {}", change);
    }
    println!();
    println!("Total: {} change(s)", changes.len());
    Ok(())
}

/// Roll the installation metadata back to a saved state
pub fn cmd_rollback(args: &InstallationArgs, state_number: i64) -> Result<()> {
    let metadata = open_installation(args)?;
    let target = find_state(&metadata, state_number)?;

    info!("Rolling back to state {}", state_number);
    let metadata = metadata
        .rollback(&target)
        .with_context(|| format!("Failed to roll back to state {}", state_number))?;

    let head = metadata
        .history()
        .context("Failed to read revision history")?
        .into_iter()
        .next();

    println!("Rolled back to state {}.", state_number);
    if let Some(head) = head {
        println!("Recorded as state {}.", head.number);
    }
    println!("  Artifacts:    {}", metadata.manifest().len());
    println!("  Channels:     {}", metadata.channels().len());
    println!("  Repositories: {}", metadata.repositories().len());
    Ok(())
}
