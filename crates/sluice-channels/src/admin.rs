use sluice_core::{AccountId, Amount, ChannelError};

use crate::ledger::ChannelLedger;

/// Administrative operations, restricted to the configured admin account.
impl ChannelLedger {
    fn require_admin(&self, caller: &AccountId) -> Result<(), ChannelError> {
        if caller != &self.config().admin_account {
            tracing::warn!(caller = %caller, "admin operation by non-admin");
            return Err(ChannelError::NotAuthorized(caller.clone()));
        }
        Ok(())
    }

    /// Change the protocol fee rate applied by later closes. Returns the
    /// previous rate.
    pub fn set_fee_rate(&self, caller: &AccountId, fee_rate_bps: u32) -> Result<u32, ChannelError> {
        self.require_admin(caller)?;
        let previous = self.fees().set_rate_bps(fee_rate_bps)?;
        tracing::info!(previous, fee_rate_bps, "fee rate updated");
        Ok(previous)
    }

    /// Move the whole fee pool from escrow to `to`. Returns the amount paid.
    pub fn withdraw_fees(&self, caller: &AccountId, to: &AccountId) -> Result<Amount, ChannelError> {
        self.require_admin(caller)?;
        let amount = self.fees().drain();
        if amount == 0 {
            return Err(ChannelError::InvalidParameters("fee pool is empty".into()));
        }
        if let Err(e) = self
            .transfer()
            .transfer(amount, &self.config().escrow_account, to)
        {
            self.fees().restore(amount);
            return Err(e);
        }
        tracing::info!(amount, to = %to, "fees withdrawn");
        Ok(amount)
    }

    pub fn fee_rate_bps(&self) -> u32 {
        self.fees().rate_bps()
    }

    pub fn fee_pool(&self) -> Amount {
        self.fees().pool()
    }
}
