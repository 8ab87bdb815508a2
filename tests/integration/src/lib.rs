//! Shared harness for the cross-crate scenario tests.

use std::sync::Arc;

use sluice_channels::{ChannelLedger, HtlcEngine, InMemoryRegistry, InternalTransfer, ManualClock};
use sluice_core::{AccountId, Amount, ChannelId, EngineConfig};
use sluice_routing::SingleHopRouter;

/// Rail balance every harness account starts with.
pub const FUNDING: Amount = 50_000_000;

/// A complete in-process engine: rail, registry, clock, ledger, HTLCs and
/// router.
pub struct Network {
    pub rail: Arc<InternalTransfer>,
    pub registry: Arc<InMemoryRegistry>,
    pub clock: Arc<ManualClock>,
    pub ledger: Arc<ChannelLedger>,
    pub engine: Arc<HtlcEngine>,
    pub router: SingleHopRouter,
}

impl Network {
    /// Build a network with `accounts` registered and funded.
    pub fn new(config: EngineConfig, accounts: &[&str]) -> Self {
        let rail = Arc::new(InternalTransfer::new());
        let registry = Arc::new(InMemoryRegistry::new());
        let clock = Arc::new(ManualClock::new(0));

        for name in accounts {
            let account = AccountId::from(*name);
            registry.register(account.clone());
            rail.credit(&account, FUNDING)
                .expect("funding fits in an amount");
        }

        let ledger = Arc::new(
            ChannelLedger::new(config, rail.clone(), registry.clone(), clock.clone())
                .expect("valid engine config"),
        );
        let engine = Arc::new(HtlcEngine::new(Arc::clone(&ledger)));
        let router = SingleHopRouter::new(Arc::clone(&engine));
        tracing::debug!(accounts = accounts.len(), "test network ready");

        Self {
            rail,
            registry,
            clock,
            ledger,
            engine,
            router,
        }
    }

    pub fn with_defaults(accounts: &[&str]) -> Self {
        Self::new(EngineConfig::default(), accounts)
    }

    /// Open `a` → `b` and have `b` join.
    pub fn channel(&self, a: &str, b: &str, deposit_a: Amount, deposit_b: Amount) -> ChannelId {
        let (a, b) = (AccountId::from(a), AccountId::from(b));
        let id = self.ledger.open(&a, &b, deposit_a).expect("open");
        self.ledger.join(id, &b, deposit_b).expect("join");
        id
    }

    pub fn escrow(&self) -> AccountId {
        self.ledger.config().escrow_account.clone()
    }

    pub fn admin(&self) -> AccountId {
        self.ledger.config().admin_account.clone()
    }

    pub fn balance(&self, account: &str) -> Amount {
        self.rail.balance_of(&AccountId::from(account))
    }

    /// Value locked in open channels plus the fee pool must equal what escrow
    /// holds.
    pub fn escrow_is_backed(&self) -> bool {
        let held = self.rail.balance_of(&self.escrow()) as u128;
        held == self.ledger.total_capacity() + self.ledger.fee_pool() as u128
    }
}

pub fn account(name: &str) -> AccountId {
    AccountId::from(name)
}
