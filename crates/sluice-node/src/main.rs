//! Sluice Node: entry point.
//!
//! Starts the channel engine with configuration from a TOML file or defaults.

// Accessors kept for tests and embedding.
#![allow(dead_code)]

mod api;
mod commands;
mod config;
mod node;
mod state;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::{LogFormat, LoggingConfig, SluiceConfig};
use node::SluiceNode;

/// Sluice Node
#[derive(Parser, Debug)]
#[command(name = "sluice-node", version, about = "Sluice payment channel node")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "sluice.toml")]
    config: PathBuf,

    /// Override the API port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Override the log format.
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Handle --init flag
    if args.init {
        let config = SluiceConfig::default();
        config.save(&args.config)?;
        println!("wrote default config to {}", args.config.display());
        return Ok(());
    }

    // Load configuration
    let mut config = SluiceConfig::load(&args.config)?;

    // Apply CLI overrides
    if let Some(api_port) = args.api_port {
        config.api.port = api_port;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(format) = args.log_format {
        config.logging.format = format;
    }

    init_tracing(&config.logging);
    tracing::info!("Sluice Node v{}", env!("CARGO_PKG_VERSION"));

    let mut node = SluiceNode::new(config)?;
    node.start().await?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        tracing::info!("received shutdown signal");
    };

    tokio::select! {
        result = node.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "command loop error");
            }
        }
        _ = shutdown => {
            tracing::info!("initiating graceful shutdown");
        }
    }

    node.shutdown().await?;
    tracing::info!("Sluice node exited cleanly");
    Ok(())
}
