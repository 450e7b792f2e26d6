//! IdeaVault CLI - encrypted idea lists protected by a portable key file
//!
//! This is the command-line interface for IdeaVault. It provides a
//! user-friendly interface to the core library functionality.

mod app;
mod cli;
mod commands;
mod config;
mod constants;
mod errors;
mod ui;

use clap::Parser;

use crate::app::AppContext;
use crate::cli::{Cli, Commands};
use crate::constants::LOG_ENV;

fn main() {
    init_tracing();

    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        tracing::debug!(error = ?err, "command failed");
        errors::classify(&err).exit();
    }
}

/// Log to stderr, filtered by `IDEAVAULT_LOG` (default: warnings only).
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let ctx = AppContext::new(cli);
    match &cli.command {
        Commands::Init(args) => commands::handle_init(&ctx, args),
        Commands::Key(command) => commands::handle_key(&ctx, command),
        Commands::List(command) => commands::handle_list(&ctx, command),
        Commands::Completions { shell } => commands::handle_completions(*shell),
    }
}
