use serde::{Deserialize, Serialize};
use sluice_core::Amount;

use crate::htlc::HtlcEngine;

/// Point-in-time counters across the ledger and the HTLC engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub channels_opened: u64,
    pub channels_open: u64,
    pub htlcs_created: u64,
    pub htlcs_pending: u64,
    /// Successful off-chain `pay` calls.
    pub payments: u64,
    /// Sum of all `pay` amounts.
    pub volume: Amount,
    /// Fees accrued since start, including withdrawn ones.
    pub fees_collected: Amount,
    /// Fees still held in escrow.
    pub fee_pool: Amount,
    pub fee_rate_bps: u32,
}

impl HtlcEngine {
    pub fn stats(&self) -> NetworkStats {
        let ledger = self.ledger();
        NetworkStats {
            channels_opened: ledger.channel_count() as u64,
            channels_open: ledger.open_channel_count() as u64,
            htlcs_created: self.htlc_count() as u64,
            htlcs_pending: self.pending_count() as u64,
            payments: ledger.payment_count(),
            volume: ledger.payment_volume(),
            fees_collected: ledger.fees().collected(),
            fee_pool: ledger.fee_pool(),
            fee_rate_bps: ledger.fee_rate_bps(),
        }
    }
}
