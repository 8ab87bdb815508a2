use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sluice_core::{
    AccountId, Amount, ChannelError, ChannelId, HtlcEvent, HtlcId, HtlcStateMachine, HtlcStatus,
    PaymentHash, Preimage,
};
use sluice_crypto::verify_preimage;

use crate::ids::IdAllocator;
use crate::ledger::ChannelLedger;

/// A Hash Time-Locked Contract over one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Htlc {
    pub id: HtlcId,
    pub channel_id: ChannelId,
    /// Funds originator, one of the channel's participants.
    pub sender: AccountId,
    /// The sender's counterparty on the channel.
    pub receiver: AccountId,
    pub amount: Amount,
    /// Commitment the receiver must open to claim.
    pub hashlock: PaymentHash,
    /// Clock value from which the sender may reclaim.
    pub timelock: u64,
    /// Set once, on fulfillment.
    pub preimage: Option<Preimage>,
    pub claimed: bool,
    pub refunded: bool,
    pub created_at: u64,
}

impl Htlc {
    pub fn status(&self) -> HtlcStatus {
        if self.claimed {
            HtlcStatus::Claimed
        } else if self.refunded {
            HtlcStatus::Refunded
        } else {
            HtlcStatus::Pending
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status() == HtlcStatus::Pending
    }

    /// Whether the timelock has been reached at `now`.
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.timelock
    }
}

/// Conditional transfers layered on the channel ledger.
///
/// Creating an HTLC moves `amount` out of the sender's channel balance into
/// the channel's `locked` total. Fulfilling releases it to the receiver;
/// refunding returns it to the sender. Each operation holds the channel entry
/// and then the HTLC entry for its whole duration.
pub struct HtlcEngine {
    ledger: Arc<ChannelLedger>,
    htlcs: DashMap<HtlcId, Htlc>,
    ids: IdAllocator,
}

impl HtlcEngine {
    pub fn new(ledger: Arc<ChannelLedger>) -> Self {
        Self {
            ledger,
            htlcs: DashMap::new(),
            ids: IdAllocator::new(),
        }
    }

    pub fn ledger(&self) -> &Arc<ChannelLedger> {
        &self.ledger
    }

    /// Lock `amount` of the sender's channel balance behind `hashlock`
    /// until `timelock`.
    pub fn create(
        &self,
        channel_id: ChannelId,
        sender: &AccountId,
        receiver: &AccountId,
        amount: Amount,
        hashlock: PaymentHash,
        timelock: u64,
    ) -> Result<HtlcId, ChannelError> {
        let mut channel = self.ledger.channel_mut(channel_id)?;
        if !channel.is_open() {
            return Err(ChannelError::ChannelClosed(channel_id));
        }
        let side = channel
            .side_of(sender)
            .ok_or_else(|| ChannelError::NotAuthorized(sender.clone()))?;
        if channel.participant(side.other()) != receiver {
            return Err(ChannelError::NotAuthorized(receiver.clone()));
        }
        let now = self.ledger.now();
        if timelock <= now {
            return Err(ChannelError::InvalidParameters(format!(
                "timelock {timelock} is not after current time {now}"
            )));
        }
        if amount == 0 {
            return Err(ChannelError::InvalidParameters(
                "HTLC amount must be positive".into(),
            ));
        }
        if !channel.joined {
            return Err(ChannelError::InvalidState(format!(
                "channel {channel_id} has not been joined"
            )));
        }
        let available = channel.balance(side);
        if available < amount {
            return Err(ChannelError::InsufficientFunds {
                available,
                required: amount,
            });
        }
        let locked = channel
            .locked
            .checked_add(amount)
            .ok_or_else(|| ChannelError::overflow("HTLC lock"))?;

        let id = HtlcId(self.ids.allocate());
        self.htlcs.insert(
            id,
            Htlc {
                id,
                channel_id,
                sender: sender.clone(),
                receiver: receiver.clone(),
                amount,
                hashlock,
                timelock,
                preimage: None,
                claimed: false,
                refunded: false,
                created_at: now,
            },
        );
        *channel.balance_mut(side) = available - amount;
        channel.locked = locked;

        tracing::info!(
            htlc_id = %id,
            channel_id = %channel_id,
            sender = %sender,
            amount,
            timelock,
            "HTLC created"
        );
        Ok(id)
    }

    /// Claim a pending HTLC by revealing the preimage of its hashlock,
    /// strictly before the timelock.
    pub fn fulfill(
        &self,
        htlc_id: HtlcId,
        caller: &AccountId,
        preimage: &[u8],
    ) -> Result<(), ChannelError> {
        let channel_id = self.channel_of(htlc_id)?;
        let mut channel = self.ledger.channel_mut(channel_id)?;
        let mut htlc = self
            .htlcs
            .get_mut(&htlc_id)
            .ok_or(ChannelError::InvalidHtlc(htlc_id))?;

        HtlcStateMachine::transition(htlc.status(), HtlcEvent::Fulfill)?;
        if htlc.is_expired(self.ledger.now()) {
            return Err(ChannelError::HtlcExpired(htlc_id));
        }
        if caller != &htlc.receiver {
            return Err(ChannelError::NotAuthorized(caller.clone()));
        }
        if !verify_preimage(&htlc.hashlock, preimage) {
            tracing::warn!(htlc_id = %htlc_id, "incorrect preimage presented");
            return Err(ChannelError::IncorrectPreimage(htlc_id));
        }

        let side = channel.side_of(&htlc.receiver).ok_or_else(|| {
            ChannelError::InvalidState(format!("HTLC {htlc_id} receiver left channel {channel_id}"))
        })?;
        let (credited, locked) = Self::release(channel.balance(side), channel.locked, htlc.amount)?;

        *channel.balance_mut(side) = credited;
        channel.locked = locked;
        htlc.preimage = Some(Preimage::from(preimage));
        htlc.claimed = true;

        tracing::info!(htlc_id = %htlc_id, channel_id = %channel_id, amount = htlc.amount, "HTLC fulfilled");
        Ok(())
    }

    /// Return a pending HTLC's amount to its sender once the timelock has
    /// been reached.
    pub fn refund(&self, htlc_id: HtlcId, caller: &AccountId) -> Result<(), ChannelError> {
        let channel_id = self.channel_of(htlc_id)?;
        let mut channel = self.ledger.channel_mut(channel_id)?;
        let mut htlc = self
            .htlcs
            .get_mut(&htlc_id)
            .ok_or(ChannelError::InvalidHtlc(htlc_id))?;

        HtlcStateMachine::transition(htlc.status(), HtlcEvent::Refund)?;
        if !htlc.is_expired(self.ledger.now()) {
            return Err(ChannelError::HtlcNotExpired(htlc_id));
        }
        if caller != &htlc.sender {
            return Err(ChannelError::NotAuthorized(caller.clone()));
        }

        let side = channel.side_of(&htlc.sender).ok_or_else(|| {
            ChannelError::InvalidState(format!("HTLC {htlc_id} sender left channel {channel_id}"))
        })?;
        let (credited, locked) = Self::release(channel.balance(side), channel.locked, htlc.amount)?;

        *channel.balance_mut(side) = credited;
        channel.locked = locked;
        htlc.refunded = true;

        tracing::info!(htlc_id = %htlc_id, channel_id = %channel_id, amount = htlc.amount, "HTLC refunded");
        Ok(())
    }

    /// New (balance, locked) after moving `amount` out of the locked total.
    fn release(
        balance: Amount,
        locked: Amount,
        amount: Amount,
    ) -> Result<(Amount, Amount), ChannelError> {
        let locked = locked.checked_sub(amount).ok_or_else(|| {
            ChannelError::InvalidState(format!("locked total below HTLC amount {amount}"))
        })?;
        let credited = balance
            .checked_add(amount)
            .ok_or_else(|| ChannelError::overflow("HTLC release"))?;
        Ok((credited, locked))
    }

    fn channel_of(&self, htlc_id: HtlcId) -> Result<ChannelId, ChannelError> {
        self.htlcs
            .get(&htlc_id)
            .map(|h| h.channel_id)
            .ok_or(ChannelError::InvalidHtlc(htlc_id))
    }

    // --- Queries ---

    pub fn get(&self, htlc_id: HtlcId) -> Option<Htlc> {
        self.htlcs.get(&htlc_id).map(|h| h.clone())
    }

    /// Every HTLC ever created on `channel_id`, ordered by id.
    pub fn htlcs_for_channel(&self, channel_id: ChannelId) -> Vec<Htlc> {
        let mut htlcs: Vec<Htlc> = self
            .htlcs
            .iter()
            .filter(|h| h.channel_id == channel_id)
            .map(|h| h.value().clone())
            .collect();
        htlcs.sort_by_key(|h| h.id);
        htlcs
    }

    pub fn htlc_count(&self) -> usize {
        self.htlcs.len()
    }

    pub fn pending_count(&self) -> usize {
        self.htlcs.iter().filter(|h| h.is_pending()).count()
    }
}
