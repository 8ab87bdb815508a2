//! `sluice pay`: Routed single-hop payments.

use clap::{Args, Subcommand};
use serde_json::json;

use crate::client::NodeClient;

#[derive(Args, Debug)]
pub struct PayArgs {
    #[command(subcommand)]
    pub command: PayCommand,
}

#[derive(Subcommand, Debug)]
pub enum PayCommand {
    /// Find a route and lock a payment. Prints the secret to hand to the
    /// receiver.
    Send {
        #[arg(long = "from")]
        sender: String,
        #[arg(long = "to")]
        receiver: String,
        #[arg(short, long)]
        amount: u64,
        /// Hex-encoded secret; generated by the node when omitted.
        #[arg(long)]
        secret: Option<String>,
    },
    /// Reveal the secret and take the payment.
    Complete {
        htlc_id: u64,
        #[arg(long = "as")]
        caller: String,
        /// Hex-encoded preimage.
        #[arg(long)]
        preimage: String,
    },
}

pub async fn run(client: &NodeClient, args: &PayArgs) -> anyhow::Result<()> {
    match &args.command {
        PayCommand::Send {
            sender,
            receiver,
            amount,
            secret,
        } => {
            println!("Sending payment...");
            println!("  From:     {sender}");
            println!("  To:       {receiver}");
            println!("  Amount:   {amount}");
            println!();

            let sent = client
                .post(
                    "payments",
                    json!({"sender": sender, "receiver": receiver, "amount": amount, "secret": secret}),
                )
                .await?;
            println!("Payment locked!");
            println!("  HTLC:     {}", sent["htlc_id"]);
            println!("  Route:    {}", sent["route"]["hops"]);
            println!("  Hashlock: {}", sent["hashlock"].as_str().unwrap_or_default());
            println!("  Timelock: {}", sent["timelock"]);
            println!("  Secret:   {}", sent["secret"].as_str().unwrap_or_default());
        }
        PayCommand::Complete {
            htlc_id,
            caller,
            preimage,
        } => {
            client
                .post(
                    &format!("payments/{htlc_id}/complete"),
                    json!({"caller": caller, "preimage": preimage}),
                )
                .await?;
            println!("Payment {htlc_id} completed");
        }
    }
    Ok(())
}
