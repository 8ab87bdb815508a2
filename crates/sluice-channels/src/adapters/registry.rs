use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sluice_core::AccountId;

use crate::traits::ParticipantRegistry;

/// A registered participant record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub account: AccountId,
    pub active: bool,
    /// Completed payments sent or received. Bookkeeping only.
    pub payments: u64,
    pub registered_at: DateTime<Utc>,
}

/// In-memory participant registry.
pub struct InMemoryRegistry {
    participants: DashMap<AccountId, Participant>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self {
            participants: DashMap::new(),
        }
    }

    /// Register (or re-activate) a participant. Returns `true` if the account
    /// was not previously known.
    pub fn register(&self, account: AccountId) -> bool {
        let mut is_new = false;
        self.participants
            .entry(account.clone())
            .and_modify(|p| p.active = true)
            .or_insert_with(|| {
                is_new = true;
                Participant {
                    account: account.clone(),
                    active: true,
                    payments: 0,
                    registered_at: Utc::now(),
                }
            });
        tracing::info!(account = %account, is_new, "participant registered");
        is_new
    }

    /// Mark a participant inactive. Existing channels are unaffected; the
    /// account can no longer open new ones.
    pub fn deactivate(&self, account: &AccountId) -> bool {
        match self.participants.get_mut(account) {
            Some(mut p) => {
                p.active = false;
                tracing::info!(account = %account, "participant deactivated");
                true
            }
            None => false,
        }
    }

    /// Bump the payment counter of a known participant.
    pub fn record_payment(&self, account: &AccountId) {
        if let Some(mut p) = self.participants.get_mut(account) {
            p.payments = p.payments.saturating_add(1);
        }
    }

    /// All participants, ordered by account id.
    pub fn list(&self) -> Vec<Participant> {
        let mut all: Vec<Participant> = self.participants.iter().map(|p| p.clone()).collect();
        all.sort_by(|a, b| a.account.cmp(&b.account));
        all
    }

    pub fn get(&self, account: &AccountId) -> Option<Participant> {
        self.participants.get(account).map(|p| p.clone())
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticipantRegistry for InMemoryRegistry {
    fn is_registered(&self, account: &AccountId) -> bool {
        self.participants
            .get(account)
            .map(|p| p.active)
            .unwrap_or(false)
    }
}
