use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sluice_channels::{ChannelLedger, HtlcEngine};
use sluice_core::{AccountId, Amount, ChannelError, HtlcId, PaymentHash, Preimage};

use crate::route::Route;

/// Handle returned when a routed payment has been locked in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStart {
    pub hashlock: PaymentHash,
    pub timelock: u64,
    pub htlc_id: HtlcId,
}

/// Finds direct channels and runs payments over them as HTLCs.
pub struct SingleHopRouter {
    engine: Arc<HtlcEngine>,
}

impl SingleHopRouter {
    pub fn new(engine: Arc<HtlcEngine>) -> Self {
        Self { engine }
    }

    fn ledger(&self) -> &ChannelLedger {
        self.engine.ledger()
    }

    /// Route for `amount` from `sender` to `receiver` over their direct
    /// channel.
    pub fn find_route(
        &self,
        sender: &AccountId,
        receiver: &AccountId,
        amount: Amount,
    ) -> Result<Route, ChannelError> {
        let not_found = || ChannelError::RouteNotFound {
            from: sender.clone(),
            to: receiver.clone(),
        };
        let channel = self
            .ledger()
            .channel_between(sender, receiver)
            .filter(|c| c.is_open())
            .ok_or_else(not_found)?;
        let available = channel.balance_of(sender).ok_or_else(not_found)?;
        if available < amount {
            return Err(ChannelError::InsufficientFunds {
                available,
                required: amount,
            });
        }
        tracing::debug!(channel_id = %channel.id, sender = %sender, receiver = %receiver, amount, "route found");
        Ok(Route::direct(channel.id))
    }

    /// Lock `amount` toward `receiver` behind `hash(secret)`, expiring one
    /// timelock horizon from now. The secret itself is not retained.
    pub fn start_payment(
        &self,
        sender: &AccountId,
        receiver: &AccountId,
        amount: Amount,
        route: &Route,
        secret: &[u8],
    ) -> Result<PaymentStart, ChannelError> {
        let channel_id = route.single_hop().ok_or_else(|| {
            ChannelError::InvalidRoute(format!(
                "only single-hop routes are supported, got {} hops",
                route.hop_count()
            ))
        })?;
        let channel = self
            .ledger()
            .channel(channel_id)
            .ok_or(ChannelError::ChannelNotFound(channel_id))?;
        let endpoints_match = (&channel.participant_a == sender
            && &channel.participant_b == receiver)
            || (&channel.participant_a == receiver && &channel.participant_b == sender);
        if !endpoints_match {
            return Err(ChannelError::InvalidRoute(format!(
                "channel {channel_id} does not connect {sender} and {receiver}"
            )));
        }

        let hashlock = sluice_crypto::hashlock(secret);
        let timelock = self
            .ledger()
            .now()
            .checked_add(self.ledger().timelock_horizon())
            .ok_or_else(|| ChannelError::overflow("timelock"))?;
        let htlc_id = self
            .engine
            .create(channel_id, sender, receiver, amount, hashlock, timelock)?;

        tracing::info!(htlc_id = %htlc_id, channel_id = %channel_id, amount, timelock, "payment started");
        Ok(PaymentStart {
            hashlock,
            timelock,
            htlc_id,
        })
    }

    /// Settle a started payment by revealing its preimage.
    pub fn complete_payment(
        &self,
        htlc_id: HtlcId,
        caller: &AccountId,
        preimage: &[u8],
    ) -> Result<Preimage, ChannelError> {
        self.engine.fulfill(htlc_id, caller, preimage)?;
        Ok(Preimage::from(preimage))
    }
}
