// src/cli.rs
//! CLI definitions for stowage
//!
//! The command implementations are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stowage")]
#[command(version)]
#[command(about = "Inspect, roll back and move installation metadata", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Installation selection shared by commands that work on a live installation
#[derive(Args, Debug, Clone)]
pub struct InstallationArgs {
    /// Installation base directory
    #[arg(short, long, env = "STOWAGE_DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Author recorded on saved states
    #[arg(long, env = "STOWAGE_AUTHOR")]
    pub author: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List saved states, most recent first
    History {
        #[command(flatten)]
        installation: InstallationArgs,

        /// Limit number of states shown
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print saved states as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show artifact changes since a saved state
    Changes {
        /// Saved state number
        state: i64,

        #[command(flatten)]
        installation: InstallationArgs,

        /// Print the manifest diff instead of artifact changes
        #[arg(long)]
        patch: bool,
    },

    /// Restore the metadata to a saved state
    Rollback {
        /// Saved state number
        state: i64,

        #[command(flatten)]
        installation: InstallationArgs,
    },

    /// Write the metadata into a bundle
    Export {
        /// Bundle file to create
        output: PathBuf,

        #[command(flatten)]
        installation: InstallationArgs,
    },

    /// Import a bundle and summarize its documents
    Inspect {
        /// Bundle file to read
        bundle: PathBuf,
    },

    /// Validate repository definitions (`id::location` or `location`)
    RepoCheck {
        /// Repository definitions, in order
        #[arg(required = true)]
        definitions: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_changes() {
        let cli = Cli::try_parse_from(["stowage", "changes", "3", "--dir", "/srv/app", "--patch"])
            .unwrap();
        match cli.command {
            Commands::Changes {
                state,
                installation,
                patch,
            } => {
                assert_eq!(state, 3);
                assert_eq!(installation.dir, PathBuf::from("/srv/app"));
                assert!(patch);
            }
            _ => panic!("expected changes command"),
        }
    }

    #[test]
    fn test_repo_check_needs_definitions() {
        assert!(Cli::try_parse_from(["stowage", "repo-check"]).is_err());
    }
}
