//! `sluice channel`: Channel lifecycle.

use clap::{Args, Subcommand};
use serde_json::json;

use crate::client::{print_json, NodeClient};

#[derive(Args, Debug)]
pub struct ChannelArgs {
    #[command(subcommand)]
    pub command: ChannelCommand,
}

#[derive(Subcommand, Debug)]
pub enum ChannelCommand {
    /// Open a channel with a first deposit.
    Open {
        /// Funding account.
        #[arg(long = "from")]
        initiator: String,
        /// Counterparty account.
        #[arg(long = "to")]
        counterparty: String,
        #[arg(short, long)]
        deposit: u64,
    },
    /// Make the counterparty's deposit.
    Join {
        id: u64,
        #[arg(long = "as")]
        counterparty: String,
        #[arg(short, long)]
        deposit: u64,
    },
    /// Shift balance to the other participant.
    Pay {
        id: u64,
        #[arg(long = "from")]
        payer: String,
        #[arg(short, long)]
        amount: u64,
    },
    /// Cooperatively close and pay out.
    Close {
        id: u64,
        #[arg(long = "as")]
        caller: String,
    },
    /// Show one channel.
    Show { id: u64 },
    /// List an account's channels.
    List { account: String },
    /// List the HTLCs of a channel.
    Htlcs { id: u64 },
}

pub async fn run(client: &NodeClient, args: &ChannelArgs) -> anyhow::Result<()> {
    match &args.command {
        ChannelCommand::Open {
            initiator,
            counterparty,
            deposit,
        } => {
            let resp = client
                .post(
                    "channels",
                    json!({"initiator": initiator, "counterparty": counterparty, "deposit": deposit}),
                )
                .await?;
            println!("Channel {} opened ({initiator} -> {counterparty}, deposit {deposit})", resp["channel_id"]);
        }
        ChannelCommand::Join {
            id,
            counterparty,
            deposit,
        } => {
            let channel = client
                .post(
                    &format!("channels/{id}/join"),
                    json!({"counterparty": counterparty, "deposit": deposit}),
                )
                .await?;
            println!("Channel {id} joined, capacity {}", channel["capacity"]);
        }
        ChannelCommand::Pay { id, payer, amount } => {
            let channel = client
                .post(
                    &format!("channels/{id}/pay"),
                    json!({"payer": payer, "amount": amount}),
                )
                .await?;
            println!(
                "Paid {amount} on channel {id}: balance_a {}, balance_b {}",
                channel["balance_a"], channel["balance_b"]
            );
        }
        ChannelCommand::Close { id, caller } => {
            let settlement = client
                .post(&format!("channels/{id}/close"), json!({"caller": caller}))
                .await?;
            println!("Channel {id} settled");
            println!(
                "  {}: {} (fee {})",
                settlement["participant_a"], settlement["net_a"], settlement["fee_a"]
            );
            println!(
                "  {}: {} (fee {})",
                settlement["participant_b"], settlement["net_b"], settlement["fee_b"]
            );
        }
        ChannelCommand::Show { id } => print_json(&client.get(&format!("channels/{id}")).await?)?,
        ChannelCommand::List { account } => {
            print_json(&client.get(&format!("channels?account={account}")).await?)?
        }
        ChannelCommand::Htlcs { id } => {
            print_json(&client.get(&format!("channels/{id}/htlcs")).await?)?
        }
    }
    Ok(())
}
