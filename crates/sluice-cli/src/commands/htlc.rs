//! `sluice htlc`: Hash-time-locked contracts on a channel.

use clap::{Args, Subcommand};
use serde_json::json;

use crate::client::{print_json, NodeClient};

#[derive(Args, Debug)]
pub struct HtlcArgs {
    #[command(subcommand)]
    pub command: HtlcCommand,
}

#[derive(Subcommand, Debug)]
pub enum HtlcCommand {
    /// Lock funds behind a hashlock.
    Create {
        #[arg(long)]
        channel: u64,
        #[arg(long = "from")]
        sender: String,
        #[arg(long = "to")]
        receiver: String,
        #[arg(short, long)]
        amount: u64,
        /// Hex-encoded 32-byte hashlock.
        #[arg(long)]
        hashlock: String,
        /// Expiry tick; defaults to now plus the node's horizon.
        #[arg(long)]
        timelock: Option<u64>,
    },
    /// Claim with the preimage.
    Fulfill {
        id: u64,
        #[arg(long = "as")]
        caller: String,
        /// Hex-encoded preimage.
        #[arg(long)]
        preimage: String,
    },
    /// Reclaim after the timelock.
    Refund {
        id: u64,
        #[arg(long = "as")]
        caller: String,
    },
    /// Show one HTLC.
    Show { id: u64 },
}

pub async fn run(client: &NodeClient, args: &HtlcArgs) -> anyhow::Result<()> {
    match &args.command {
        HtlcCommand::Create {
            channel,
            sender,
            receiver,
            amount,
            hashlock,
            timelock,
        } => {
            let resp = client
                .post(
                    "htlcs",
                    json!({
                        "channel_id": channel,
                        "sender": sender,
                        "receiver": receiver,
                        "amount": amount,
                        "hashlock": hashlock,
                        "timelock": timelock,
                    }),
                )
                .await?;
            println!("HTLC {} created on channel {channel}", resp["htlc_id"]);
        }
        HtlcCommand::Fulfill {
            id,
            caller,
            preimage,
        } => {
            client
                .post(
                    &format!("htlcs/{id}/fulfill"),
                    json!({"caller": caller, "preimage": preimage}),
                )
                .await?;
            println!("HTLC {id} claimed");
        }
        HtlcCommand::Refund { id, caller } => {
            client
                .post(&format!("htlcs/{id}/refund"), json!({"caller": caller}))
                .await?;
            println!("HTLC {id} refunded");
        }
        HtlcCommand::Show { id } => print_json(&client.get(&format!("htlcs/{id}")).await?)?,
    }
    Ok(())
}
