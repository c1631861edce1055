// src/commands/repo.rs
//! Repository definition checks

use anyhow::{Context, Result};

/// Parse repository definitions and print the resulting descriptors
pub fn cmd_repo_check(definitions: &[String]) -> Result<()> {
    let repositories = stowage::parse_definitions(definitions)
        .context("Repository definitions rejected")?;

    println!("Repositories:");
    for repo in &repositories {
        let kind = if repo.is_remote() { "remote" } else { "local" };
        println!("  {} ({})", repo.id, kind);
        println!("      {}", repo.url);
    }
    Ok(())
}
