//! `sluice admin`: Participants, fees, rail funding and the clock.

use clap::{Args, Subcommand};
use serde_json::json;

use crate::client::{print_json, NodeClient};

#[derive(Args, Debug)]
pub struct AdminArgs {
    #[command(subcommand)]
    pub command: AdminCommand,
}

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    /// Register a participant.
    Register { account: String },
    /// Deactivate a participant; open channels are unaffected.
    Deactivate {
        account: String,
        #[arg(long = "as")]
        caller: String,
    },
    /// List participants.
    Participants,
    /// Change the protocol fee rate.
    FeeRate {
        bps: u32,
        #[arg(long = "as")]
        caller: String,
    },
    /// Withdraw the fee pool.
    Withdraw {
        #[arg(long)]
        to: String,
        #[arg(long = "as")]
        caller: String,
    },
    /// Credit an account on the in-memory rail.
    Mint {
        account: String,
        #[arg(short, long)]
        amount: u64,
        #[arg(long = "as")]
        caller: String,
    },
    /// Show an account's rail balance.
    Balance { account: String },
    /// Advance the node's manual clock.
    Advance { ticks: u64 },
}

pub async fn run(client: &NodeClient, args: &AdminArgs) -> anyhow::Result<()> {
    match &args.command {
        AdminCommand::Register { account } => {
            let resp = client
                .post("participants", json!({"account": account}))
                .await?;
            if resp["created"].as_bool().unwrap_or(false) {
                println!("Registered {account}");
            } else {
                println!("{account} was already registered (re-activated)");
            }
        }
        AdminCommand::Deactivate { account, caller } => {
            let resp = client
                .post(
                    &format!("participants/{account}/deactivate"),
                    json!({"caller": caller}),
                )
                .await?;
            if resp["deactivated"].as_bool().unwrap_or(false) {
                println!("Deactivated {account}");
            } else {
                println!("{account} has no participant record");
            }
        }
        AdminCommand::Participants => print_json(&client.get("participants").await?)?,
        AdminCommand::FeeRate { bps, caller } => {
            let resp = client
                .post(
                    "admin/fee-rate",
                    json!({"caller": caller, "fee_rate_bps": bps}),
                )
                .await?;
            println!("Fee rate {} -> {} bps", resp["previous"], resp["fee_rate_bps"]);
        }
        AdminCommand::Withdraw { to, caller } => {
            let resp = client
                .post("admin/withdraw", json!({"caller": caller, "to": to}))
                .await?;
            println!("Withdrew {} to {to}", resp["amount"]);
        }
        AdminCommand::Mint {
            account,
            amount,
            caller,
        } => {
            let resp = client
                .post(
                    "admin/mint",
                    json!({"caller": caller, "account": account, "amount": amount}),
                )
                .await?;
            println!("{account} balance: {}", resp["balance"]);
        }
        AdminCommand::Balance { account } => {
            let resp = client.get(&format!("accounts/{account}/balance")).await?;
            println!("{account}: {}", resp["balance"]);
        }
        AdminCommand::Advance { ticks } => {
            let resp = client.post("clock/advance", json!({"ticks": ticks})).await?;
            println!("Clock now at {}", resp["now"]);
        }
    }
    Ok(())
}
