use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use sluice_core::{AccountId, Amount, ChannelError};

use crate::traits::ValueTransfer;

/// A completed transfer in the journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    pub seq: u64,
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Amount,
    pub at: DateTime<Utc>,
}

/// In-memory settlement rail.
///
/// Keeps a balance per account and a journal of every transfer. Balances
/// cannot go negative: a transfer larger than the sender's balance fails
/// with `TransferFailed`. Accounts can be frozen, after which every transfer
/// touching them fails.
pub struct InternalTransfer {
    balances: DashMap<AccountId, Amount>,
    journal: DashMap<u64, TransferRecord>,
    seq: AtomicU64,
    frozen: DashSet<AccountId>,
}

impl InternalTransfer {
    pub fn new() -> Self {
        Self {
            balances: DashMap::new(),
            journal: DashMap::new(),
            seq: AtomicU64::new(0),
            frozen: DashSet::new(),
        }
    }

    /// Mint `amount` into `account` (funding from outside the rail).
    pub fn credit(&self, account: &AccountId, amount: Amount) -> Result<Amount, ChannelError> {
        let mut balance = self.balances.entry(account.clone()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| ChannelError::overflow("credit"))?;
        Ok(*balance)
    }

    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).map(|b| *b).unwrap_or(0)
    }

    /// Sum of every balance on the rail.
    pub fn total_supply(&self) -> u128 {
        self.balances.iter().map(|b| *b.value() as u128).sum()
    }

    pub fn freeze(&self, account: &AccountId) {
        self.frozen.insert(account.clone());
        tracing::warn!(account = %account, "account frozen");
    }

    pub fn unfreeze(&self, account: &AccountId) {
        self.frozen.remove(account);
    }

    /// Journal entries involving `account`, oldest first.
    pub fn history(&self, account: &AccountId) -> Vec<TransferRecord> {
        let mut records: Vec<TransferRecord> = self
            .journal
            .iter()
            .filter(|r| &r.from == account || &r.to == account)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by_key(|r| r.seq);
        records
    }

    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    fn debit(&self, account: &AccountId, amount: Amount) -> Result<(), ChannelError> {
        let mut balance = self
            .balances
            .get_mut(account)
            .ok_or_else(|| ChannelError::TransferFailed(format!("unknown account {account}")))?;
        if *balance < amount {
            return Err(ChannelError::TransferFailed(format!(
                "account {account} holds {}, needs {amount}",
                *balance
            )));
        }
        *balance -= amount;
        Ok(())
    }
}

impl Default for InternalTransfer {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueTransfer for InternalTransfer {
    fn transfer(
        &self,
        amount: Amount,
        from: &AccountId,
        to: &AccountId,
    ) -> Result<(), ChannelError> {
        if from == to {
            return Err(ChannelError::TransferFailed(format!(
                "transfer from {from} to itself"
            )));
        }
        if let Some(account) = [from, to].into_iter().find(|a| self.frozen.contains(*a)) {
            return Err(ChannelError::TransferFailed(format!(
                "account {account} is frozen"
            )));
        }

        self.debit(from, amount)?;

        // Each map guard is released before the next is taken.
        let credited = {
            let mut balance = self.balances.entry(to.clone()).or_insert(0);
            match balance.checked_add(amount) {
                Some(next) => {
                    *balance = next;
                    true
                }
                None => false,
            }
        };
        if !credited {
            self.balances
                .entry(from.clone())
                .and_modify(|b| *b += amount)
                .or_insert(amount);
            return Err(ChannelError::TransferFailed(format!(
                "balance of {to} would overflow"
            )));
        }

        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.journal.insert(
            seq,
            TransferRecord {
                seq,
                from: from.clone(),
                to: to.clone(),
                amount,
                at: Utc::now(),
            },
        );
        tracing::debug!(seq, from = %from, to = %to, amount, "internal transfer");
        Ok(())
    }

    fn adapter_id(&self) -> &str {
        "vt-internal"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> AccountId {
        AccountId::from("alice")
    }

    fn bob() -> AccountId {
        AccountId::from("bob")
    }

    #[test]
    fn test_credit_and_transfer() {
        let rail = InternalTransfer::new();
        rail.credit(&alice(), 10_000).unwrap();
        rail.transfer(4_000, &alice(), &bob()).unwrap();

        assert_eq!(rail.balance_of(&alice()), 6_000);
        assert_eq!(rail.balance_of(&bob()), 4_000);
        assert_eq!(rail.total_supply(), 10_000);
    }

    #[test]
    fn test_insufficient_balance_fails_without_effect() {
        let rail = InternalTransfer::new();
        rail.credit(&alice(), 100).unwrap();

        let result = rail.transfer(101, &alice(), &bob());
        assert!(matches!(result, Err(ChannelError::TransferFailed(_))));
        assert_eq!(rail.balance_of(&alice()), 100);
        assert_eq!(rail.balance_of(&bob()), 0);
        assert_eq!(rail.journal_len(), 0);
    }

    #[test]
    fn test_unknown_sender_fails() {
        let rail = InternalTransfer::new();
        let result = rail.transfer(1, &alice(), &bob());
        assert!(matches!(result, Err(ChannelError::TransferFailed(_))));
    }

    #[test]
    fn test_self_transfer_rejected() {
        let rail = InternalTransfer::new();
        rail.credit(&alice(), 100).unwrap();
        assert!(rail.transfer(10, &alice(), &alice()).is_err());
    }

    #[test]
    fn test_frozen_account_rejects_both_directions() {
        let rail = InternalTransfer::new();
        rail.credit(&alice(), 1_000).unwrap();
        rail.credit(&bob(), 1_000).unwrap();
        rail.freeze(&bob());

        assert!(rail.transfer(10, &alice(), &bob()).is_err());
        assert!(rail.transfer(10, &bob(), &alice()).is_err());
        assert_eq!(rail.balance_of(&alice()), 1_000);

        rail.unfreeze(&bob());
        rail.transfer(10, &alice(), &bob()).unwrap();
        assert_eq!(rail.balance_of(&bob()), 1_010);
    }

    #[test]
    fn test_overflow_on_credit_side_restores_sender() {
        let rail = InternalTransfer::new();
        rail.credit(&alice(), 10).unwrap();
        rail.credit(&bob(), Amount::MAX).unwrap();

        assert!(rail.transfer(10, &alice(), &bob()).is_err());
        assert_eq!(rail.balance_of(&alice()), 10);
        assert_eq!(rail.balance_of(&bob()), Amount::MAX);
    }

    #[test]
    fn test_history_is_ordered() {
        let rail = InternalTransfer::new();
        rail.credit(&alice(), 1_000).unwrap();
        rail.transfer(100, &alice(), &bob()).unwrap();
        rail.transfer(50, &bob(), &alice()).unwrap();

        let history = rail.history(&alice());
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].amount, 100);
        assert_eq!(history[1].amount, 50);
        assert!(history[0].seq < history[1].seq);
    }

    #[test]
    fn test_adapter_id() {
        assert_eq!(InternalTransfer::new().adapter_id(), "vt-internal");
    }
}
