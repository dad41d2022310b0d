//! Cadence CLI - Recurring-payment detector
//!
//! Usage:
//!   cadence init                  Initialize database
//!   cadence ingest --file JSON    Ingest a transaction batch
//!   cadence recurring             List recurring payments
//!   cadence serve --port 3000     Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Ingest { file } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_ingest(&db, &file)
        }
        Commands::Recurring => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_recurring(&db)
        }
        Commands::Serve { port, host } => commands::cmd_serve(&cli.db, &host, port).await,
    }
}
