//! talentmatch CLI
//!
//! Command-line interface for running the match-scoring service.

use clap::{Parser, Subcommand};

use crate::server::{run_server, ServerConfig};

#[derive(Parser)]
#[command(name = "talentmatch")]
#[command(about = "Candidate-vacancy match scoring with drift monitoring")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP serving layer
    Serve {
        /// Host to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to bind
        #[arg(long)]
        port: Option<u16>,

        /// Path of the JSON model artifact
        #[arg(long)]
        model: Option<String>,
    },
}

pub async fn cmd_serve(
    host: Option<String>,
    port: Option<u16>,
    model: Option<String>,
) -> anyhow::Result<()> {
    let mut config = ServerConfig::default();
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(model) = model {
        config.model_path = model;
    }

    println!(
        "talentmatch v{} | API at http://{}:{}/api",
        env!("CARGO_PKG_VERSION"),
        config.host,
        config.port
    );

    run_server(config).await
}
