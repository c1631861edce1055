// src/commands/mod.rs
//! Command handlers for the stowage CLI

mod bundle;
mod history;
mod repo;

pub use bundle::{cmd_export, cmd_inspect};
pub use history::{cmd_changes, cmd_history, cmd_rollback};
pub use repo::cmd_repo_check;

use crate::cli::InstallationArgs;
use anyhow::{Context, Result};
use stowage::{InstallationMetadata, SavedState, StoreOptions};

/// Open the installation selected on the command line
fn open_installation(args: &InstallationArgs) -> Result<InstallationMetadata> {
    let mut options = StoreOptions::from_env();
    if let Some(author) = &args.author {
        options = options.with_author(author.clone());
    }

    InstallationMetadata::open_with_options(&args.dir, &options).with_context(|| {
        format!(
            "Failed to open installation metadata in {}",
            args.dir.display()
        )
    })
}

/// Find a saved state by its number
fn find_state(metadata: &InstallationMetadata, number: i64) -> Result<SavedState> {
    metadata
        .history()
        .context("Failed to read revision history")?
        .into_iter()
        .find(|s| s.number == number)
        .ok_or_else(|| anyhow::anyhow!("State {} not found", number))
}
