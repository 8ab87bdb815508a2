//! Sluice CLI: command-line interface for a running Sluice node.
//!
//! Subcommands: status, channel, htlc, pay, admin.

mod client;
mod commands;

use clap::{Parser, Subcommand};

use client::NodeClient;

/// Sluice: bilateral payment channels.
#[derive(Parser, Debug)]
#[command(name = "sluice", version, about, long_about = None)]
struct Cli {
    /// API endpoint of the node.
    #[arg(short, long, global = true, default_value = "http://127.0.0.1:9101")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Query the status of a running node.
    Status,
    /// Open, fund, use and close channels.
    Channel(commands::channel::ChannelArgs),
    /// Create and resolve hash-time-locked contracts.
    Htlc(commands::htlc::HtlcArgs),
    /// Send a routed payment or complete one.
    Pay(commands::pay::PayArgs),
    /// Participants, fees, rail funding and the clock.
    Admin(commands::admin::AdminArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = NodeClient::new(&cli.endpoint);

    match &cli.command {
        Commands::Status => commands::status::run(&client).await,
        Commands::Channel(args) => commands::channel::run(&client, args).await,
        Commands::Htlc(args) => commands::htlc::run(&client, args).await,
        Commands::Pay(args) => commands::pay::run(&client, args).await,
        Commands::Admin(args) => commands::admin::run(&client, args).await,
    }
}
