//! talentmatch - Main entry point
//!
//! Candidate-vacancy match scoring service with drift monitoring.

use clap::Parser;
use talentmatch::cli::{cmd_serve, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "talentmatch=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { host, port, model }) => {
            cmd_serve(host, port, model).await?;
        }
        None => {
            // Default: serve with environment-derived configuration
            cmd_serve(None, None, None).await?;
        }
    }

    Ok(())
}
