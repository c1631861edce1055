// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::History {
            installation,
            limit,
            json,
        } => commands::cmd_history(&installation, limit, json),
        Commands::Changes {
            state,
            installation,
            patch,
        } => commands::cmd_changes(&installation, state, patch),
        Commands::Rollback {
            state,
            installation,
        } => commands::cmd_rollback(&installation, state),
        Commands::Export {
            output,
            installation,
        } => commands::cmd_export(&installation, &output),
        Commands::Inspect { bundle } => commands::cmd_inspect(&bundle),
        Commands::RepoCheck { definitions } => commands::cmd_repo_check(&definitions),
    }
}
