//! `sluice status`: Query the status of a running node.

use serde::Deserialize;

use crate::client::NodeClient;

#[derive(Deserialize)]
struct Stats {
    channels_opened: u64,
    channels_open: u64,
    htlcs_created: u64,
    htlcs_pending: u64,
    payments: u64,
    volume: u64,
    fees_collected: u64,
    fee_pool: u64,
    fee_rate_bps: u32,
}

#[derive(Deserialize)]
struct StatusResponse {
    version: String,
    uptime_secs: u64,
    now: u64,
    rail: String,
    escrow_account: String,
    stats: Stats,
}

pub async fn run(client: &NodeClient) -> anyhow::Result<()> {
    let status: StatusResponse = serde_json::from_value(client.get("status").await?)?;
    let s = &status.stats;

    println!("Node Status:");
    println!("  Version:   {}", status.version);
    println!("  Uptime:    {}s", status.uptime_secs);
    println!("  Clock:     {}", status.now);
    println!("  Rail:      {} (escrow {})", status.rail, status.escrow_account);
    println!();
    println!("Channels:    {} open / {} opened", s.channels_open, s.channels_opened);
    println!("HTLCs:       {} pending / {} created", s.htlcs_pending, s.htlcs_created);
    println!("Payments:    {} (volume {})", s.payments, s.volume);
    println!(
        "Fees:        {} bps, pool {}, collected {}",
        s.fee_rate_bps, s.fee_pool, s.fees_collected
    );
    Ok(())
}
