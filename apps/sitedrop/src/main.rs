//! sitedrop command-line entry point.

mod app;
mod cli;
mod config;

use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Load `.env` before parsing so it can supply credentials.
    let dotenv = dotenvy::dotenv();

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = dotenv
        && !e.not_found()
    {
        tracing::warn!(error = %e, "failed to load .env");
    }

    let cli = cli::Cli::parse();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting sitedrop");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(cli))
}
