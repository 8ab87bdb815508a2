use serde::{Deserialize, Serialize};

use crate::error::ChannelError;
use crate::types::{AccountId, Amount};

/// Highest fee rate an administrator may set (10%).
pub const MAX_FEE_RATE_BPS: u32 = 1_000;

/// Basis points in one whole.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// One day of clock ticks at one tick per ten-minute block.
pub const BLOCK_TICKS_PER_DAY: u64 = 144;

/// One day of clock ticks when ticks are wall-clock seconds.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Tunables of the channel engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Smallest deposit accepted by `open` and `join`.
    #[serde(default = "default_min_deposit")]
    pub min_deposit: Amount,
    /// Initial protocol fee charged per side at cooperative close.
    #[serde(default = "default_fee_rate_bps")]
    pub fee_rate_bps: u32,
    /// Clock ticks added to `now` for router-created HTLC timelocks. Unset
    /// means one day in the units of the engine's clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub htlc_timelock_horizon: Option<u64>,
    /// Account holding deposits, locked funds and accrued fees.
    #[serde(default = "default_escrow_account")]
    pub escrow_account: AccountId,
    /// Account allowed to change the fee rate and withdraw fees.
    #[serde(default = "default_admin_account")]
    pub admin_account: AccountId,
}

fn default_min_deposit() -> Amount {
    10_000
}
fn default_fee_rate_bps() -> u32 {
    20
}
fn default_escrow_account() -> AccountId {
    AccountId::from("sluice-escrow")
}
fn default_admin_account() -> AccountId {
    AccountId::from("sluice-admin")
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_deposit: default_min_deposit(),
            fee_rate_bps: default_fee_rate_bps(),
            htlc_timelock_horizon: None,
            escrow_account: default_escrow_account(),
            admin_account: default_admin_account(),
        }
    }
}

impl EngineConfig {
    /// Reject configurations the engine cannot honour.
    pub fn validate(&self) -> Result<(), ChannelError> {
        if self.fee_rate_bps > MAX_FEE_RATE_BPS {
            return Err(ChannelError::InvalidParameters(format!(
                "fee rate {} bps exceeds maximum of {} bps",
                self.fee_rate_bps, MAX_FEE_RATE_BPS
            )));
        }
        if self.htlc_timelock_horizon == Some(0) {
            return Err(ChannelError::InvalidParameters(
                "htlc_timelock_horizon must be positive".into(),
            ));
        }
        if self.escrow_account == self.admin_account {
            return Err(ChannelError::InvalidParameters(
                "escrow and admin accounts must differ".into(),
            ));
        }
        Ok(())
    }
}
