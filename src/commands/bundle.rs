// src/commands/bundle.rs
//! Bundle export and inspection

use super::open_installation;
use crate::cli::InstallationArgs;
use anyhow::{Context, Result};
use std::path::Path;
use stowage::InstallationMetadata;

/// Export the installation metadata into a bundle
pub fn cmd_export(args: &InstallationArgs, output: &Path) -> Result<()> {
    let metadata = open_installation(args)?;
    let path = metadata
        .export_bundle(output)
        .with_context(|| format!("Failed to export bundle to {}", output.display()))?;

    println!("Exported metadata bundle: {}", path.display());
    Ok(())
}

/// Import a bundle and print what it contains
pub fn cmd_inspect(bundle: &Path) -> Result<()> {
    let metadata = InstallationMetadata::from_bundle(bundle)
        .with_context(|| format!("Failed to import bundle {}", bundle.display()))?;

    println!("Bundle: {}", bundle.display());
    println!("{}", "=".repeat(40));

    println!("\nArtifacts ({}):", metadata.manifest().len());
    for artifact in metadata.manifest().artifacts() {
        println!("  {}", artifact);
    }

    println!("\nChannels ({}):", metadata.channels().len());
    for channel in metadata.channels() {
        println!("  {}", channel);
    }

    println!("\nRepositories ({}):", metadata.repositories().len());
    for repo in metadata.repositories() {
        println!("  {}  {}", repo.id, repo.url);
    }

    let provisioning = metadata.provisioning_config();
    println!("\nFeature packs ({}):", provisioning.feature_packs().len());
    for location in provisioning.feature_packs() {
        println!("  {}", location);
    }

    Ok(())
}
