//! Shared fixtures for the unit tests.

use std::sync::Arc;

use sluice_core::{AccountId, Amount, ChannelId, EngineConfig};

use crate::adapters::{InMemoryRegistry, InternalTransfer, ManualClock};
use crate::htlc::HtlcEngine;
use crate::ledger::ChannelLedger;

pub(crate) fn account(name: &str) -> AccountId {
    AccountId::from(name)
}

/// A ledger and HTLC engine over an in-memory rail, with alice, bob and
/// carol registered and funded.
pub(crate) struct Fixture {
    pub rail: Arc<InternalTransfer>,
    pub registry: Arc<InMemoryRegistry>,
    pub clock: Arc<ManualClock>,
    pub ledger: Arc<ChannelLedger>,
    pub htlcs: HtlcEngine,
    pub alice: AccountId,
    pub bob: AccountId,
    pub carol: AccountId,
}

impl Fixture {
    pub const FUNDING: Amount = 10_000_000;
    pub const START: u64 = 1_000;

    pub fn config() -> EngineConfig {
        EngineConfig::default()
    }

    pub fn new() -> Self {
        Self::with_config(Self::config())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let rail = Arc::new(InternalTransfer::new());
        let registry = Arc::new(InMemoryRegistry::new());
        let clock = Arc::new(ManualClock::new(Self::START));

        let (alice, bob, carol) = (account("alice"), account("bob"), account("carol"));
        for who in [&alice, &bob, &carol] {
            registry.register(who.clone());
            rail.credit(who, Self::FUNDING).unwrap();
        }

        let ledger = Arc::new(
            ChannelLedger::new(config, rail.clone(), registry.clone(), clock.clone()).unwrap(),
        );
        let htlcs = HtlcEngine::new(Arc::clone(&ledger));

        Self {
            rail,
            registry,
            clock,
            ledger,
            htlcs,
            alice,
            bob,
            carol,
        }
    }

    pub fn escrow(&self) -> AccountId {
        self.ledger.config().escrow_account.clone()
    }

    pub fn admin(&self) -> AccountId {
        self.ledger.config().admin_account.clone()
    }

    /// Open alice → bob with `deposit_a` and have bob join with `deposit_b`.
    pub fn joined_channel(&self, deposit_a: Amount, deposit_b: Amount) -> ChannelId {
        let id = self.ledger.open(&self.alice, &self.bob, deposit_a).unwrap();
        self.ledger.join(id, &self.bob, deposit_b).unwrap();
        id
    }
}
