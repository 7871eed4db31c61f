//! Scratch CLI Entry Point
//!
//! Configuration is loaded from environment variables (via .env file).
//! Command-line arguments override environment variables.
//!
//! Usage:
//!   scratch seed          - Create a demo catalog
//!   scratch buy <type>    - Buy tickets
//!   scratch scratch <id>  - Reveal and settle a ticket
//!   scratch reconcile     - Check wallets against the ledger
//!   scratch simulate      - Drain an in-memory pool

use clap::Parser;
use scratch_cli::{handler, Cli};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if cli.verbose {
        init_logging();
    }

    if let Err(e) = handler::run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

/// Initialize logging with tracing
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "scratch_cli=info,scratch_engine=info,scratch_store=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
