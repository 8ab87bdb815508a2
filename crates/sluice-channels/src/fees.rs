use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use sluice_core::config::{BPS_DENOMINATOR, MAX_FEE_RATE_BPS};
use sluice_core::{Amount, ChannelError};

/// Protocol fee on one side's balance: `floor(balance * rate / 10000)`.
pub fn protocol_fee(balance: Amount, fee_rate_bps: u32) -> Amount {
    let fee = (balance as u128 * fee_rate_bps as u128) / BPS_DENOMINATOR as u128;
    // fee <= balance whenever rate <= 10000
    fee as Amount
}

/// Fees and net payouts for both sides of a closing channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementQuote {
    pub fee_rate_bps: u32,
    pub fee_a: Amount,
    pub fee_b: Amount,
    pub net_a: Amount,
    pub net_b: Amount,
}

impl SettlementQuote {
    /// Each side is charged independently, truncating toward zero.
    pub fn compute(balance_a: Amount, balance_b: Amount, fee_rate_bps: u32) -> Self {
        let fee_a = protocol_fee(balance_a, fee_rate_bps);
        let fee_b = protocol_fee(balance_b, fee_rate_bps);
        Self {
            fee_rate_bps,
            fee_a,
            fee_b,
            net_a: balance_a - fee_a,
            net_b: balance_b - fee_b,
        }
    }

    pub fn total_fee(&self) -> Amount {
        self.fee_a + self.fee_b
    }
}

/// Current fee rate plus the process-wide pool of accrued fees.
#[derive(Debug)]
pub struct FeeSchedule {
    rate_bps: AtomicU32,
    pool: AtomicU64,
    collected: AtomicU64,
}

impl FeeSchedule {
    pub fn new(rate_bps: u32) -> Result<Self, ChannelError> {
        Self::check_rate(rate_bps)?;
        Ok(Self {
            rate_bps: AtomicU32::new(rate_bps),
            pool: AtomicU64::new(0),
            collected: AtomicU64::new(0),
        })
    }

    fn check_rate(rate_bps: u32) -> Result<(), ChannelError> {
        if rate_bps > MAX_FEE_RATE_BPS {
            return Err(ChannelError::InvalidParameters(format!(
                "fee rate {rate_bps} bps exceeds maximum of {MAX_FEE_RATE_BPS} bps"
            )));
        }
        Ok(())
    }

    pub fn rate_bps(&self) -> u32 {
        self.rate_bps.load(Ordering::SeqCst)
    }

    pub(crate) fn set_rate_bps(&self, rate_bps: u32) -> Result<u32, ChannelError> {
        Self::check_rate(rate_bps)?;
        Ok(self.rate_bps.swap(rate_bps, Ordering::SeqCst))
    }

    pub fn quote(&self, balance_a: Amount, balance_b: Amount) -> SettlementQuote {
        SettlementQuote::compute(balance_a, balance_b, self.rate_bps())
    }

    /// Fees currently withdrawable.
    pub fn pool(&self) -> Amount {
        self.pool.load(Ordering::SeqCst)
    }

    /// Fees accrued since start, including those already withdrawn.
    pub fn collected(&self) -> Amount {
        self.collected.load(Ordering::SeqCst)
    }

    /// Add `fee` to the pool. Fails without effect on overflow.
    pub(crate) fn accrue(&self, fee: Amount) -> Result<(), ChannelError> {
        self.pool
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |p| p.checked_add(fee))
            .map_err(|_| ChannelError::overflow("fee pool"))?;
        self.collected
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |c| {
                Some(c.saturating_add(fee))
            })
            .ok();
        Ok(())
    }

    /// Empty the pool, returning what it held.
    pub(crate) fn drain(&self) -> Amount {
        self.pool.swap(0, Ordering::SeqCst)
    }

    /// Put back an amount taken by `drain` after a failed payout.
    pub(crate) fn restore(&self, amount: Amount) {
        self.pool.fetch_add(amount, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_twenty_bps_on_one_million() {
        assert_eq!(protocol_fee(1_000_000, 20), 2_000);
        let quote = SettlementQuote::compute(1_000_000, 0, 20);
        assert_eq!(quote.net_a, 998_000);
        assert_eq!(quote.fee_b, 0);
        assert_eq!(quote.net_b, 0);
    }

    #[test]
    fn test_fee_truncates_toward_zero() {
        // 4_999 * 20 / 10_000 = 9.998
        assert_eq!(protocol_fee(4_999, 20), 9);
        assert_eq!(protocol_fee(499, 20), 0);
    }

    #[test]
    fn test_fee_on_zero_balance() {
        assert_eq!(protocol_fee(0, 1_000), 0);
    }

    #[test]
    fn test_fee_at_max_rate_without_overflow() {
        assert_eq!(protocol_fee(Amount::MAX, MAX_FEE_RATE_BPS), Amount::MAX / 10);
    }

    #[test]
    fn test_quote_sides_independent() {
        let quote = SettlementQuote::compute(1_500_000, 1_500_000, 20);
        assert_eq!(quote.fee_a, 3_000);
        assert_eq!(quote.fee_b, 3_000);
        assert_eq!(quote.net_a, quote.net_b);
        assert_eq!(quote.total_fee(), 6_000);
    }

    #[test]
    fn test_schedule_rejects_rate_above_cap() {
        assert!(FeeSchedule::new(1_001).is_err());
        let schedule = FeeSchedule::new(20).unwrap();
        assert!(schedule.set_rate_bps(1_001).is_err());
        assert_eq!(schedule.rate_bps(), 20);
        assert_eq!(schedule.set_rate_bps(1_000).unwrap(), 20);
        assert_eq!(schedule.rate_bps(), 1_000);
    }

    #[test]
    fn test_pool_accrue_drain_restore() {
        let schedule = FeeSchedule::new(20).unwrap();
        schedule.accrue(2_000).unwrap();
        schedule.accrue(500).unwrap();
        assert_eq!(schedule.pool(), 2_500);

        assert_eq!(schedule.drain(), 2_500);
        assert_eq!(schedule.pool(), 0);
        assert_eq!(schedule.collected(), 2_500);

        schedule.restore(2_500);
        assert_eq!(schedule.pool(), 2_500);
    }

    #[test]
    fn test_pool_overflow_rejected() {
        let schedule = FeeSchedule::new(20).unwrap();
        schedule.accrue(Amount::MAX).unwrap();
        assert!(schedule.accrue(1).is_err());
        assert_eq!(schedule.pool(), Amount::MAX);
    }
}
