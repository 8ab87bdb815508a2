use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::mapref::one::RefMut;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sluice_core::{
    AccountId, Amount, ChannelError, ChannelEvent, ChannelId, ChannelState, ChannelStateMachine,
    EngineConfig,
};

use crate::fees::{FeeSchedule, SettlementQuote};
use crate::ids::IdAllocator;
use crate::traits::{Clock, ParticipantRegistry, ValueTransfer};

/// Which end of a channel an account sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// The initiator.
    A,
    /// The counterparty.
    B,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// A bilateral payment channel.
///
/// While `state` is `Open`: `balance_a + balance_b + locked == capacity`,
/// where `locked` is the sum of the channel's pending HTLC amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub participant_a: AccountId,
    pub participant_b: AccountId,
    /// Total deposited by both sides. Zeroed at settlement.
    pub capacity: Amount,
    pub balance_a: Amount,
    pub balance_b: Amount,
    /// Value held by pending HTLCs, outside both spendable balances.
    pub locked: Amount,
    pub state: ChannelState,
    /// Whether the counterparty has made its deposit.
    pub joined: bool,
    pub opened_at: u64,
    pub settled_at: Option<u64>,
}

impl Channel {
    pub fn side_of(&self, account: &AccountId) -> Option<Side> {
        if account == &self.participant_a {
            Some(Side::A)
        } else if account == &self.participant_b {
            Some(Side::B)
        } else {
            None
        }
    }

    pub fn is_participant(&self, account: &AccountId) -> bool {
        self.side_of(account).is_some()
    }

    pub fn participant(&self, side: Side) -> &AccountId {
        match side {
            Side::A => &self.participant_a,
            Side::B => &self.participant_b,
        }
    }

    pub fn balance(&self, side: Side) -> Amount {
        match side {
            Side::A => self.balance_a,
            Side::B => self.balance_b,
        }
    }

    pub(crate) fn balance_mut(&mut self, side: Side) -> &mut Amount {
        match side {
            Side::A => &mut self.balance_a,
            Side::B => &mut self.balance_b,
        }
    }

    /// Spendable balance of `account`, if it is a participant.
    pub fn balance_of(&self, account: &AccountId) -> Option<Amount> {
        self.side_of(account).map(|side| self.balance(side))
    }

    pub fn is_open(&self) -> bool {
        self.state == ChannelState::Open
    }

    /// Whether the conservation invariant holds for this record.
    pub fn is_conserved(&self) -> bool {
        let total = self.balance_a as u128 + self.balance_b as u128 + self.locked as u128;
        total == self.capacity as u128
    }
}

/// Outcome of a cooperative close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub channel_id: ChannelId,
    pub participant_a: AccountId,
    pub participant_b: AccountId,
    pub fee_a: Amount,
    pub fee_b: Amount,
    /// Paid out to `participant_a`.
    pub net_a: Amount,
    /// Paid out to `participant_b`.
    pub net_b: Amount,
    pub settled_at: u64,
}

/// Participant pair → channel id. A pair maps to one entry regardless of
/// direction, so both directions are always written together.
struct PairIndex {
    pairs: DashMap<(AccountId, AccountId), ChannelId>,
}

impl PairIndex {
    fn new() -> Self {
        Self {
            pairs: DashMap::new(),
        }
    }

    fn key(a: &AccountId, b: &AccountId) -> (AccountId, AccountId) {
        if a <= b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        }
    }

    fn get(&self, a: &AccountId, b: &AccountId) -> Option<ChannelId> {
        self.pairs.get(&Self::key(a, b)).map(|id| *id)
    }

    fn entry(&self, a: &AccountId, b: &AccountId) -> Entry<'_, (AccountId, AccountId), ChannelId> {
        self.pairs.entry(Self::key(a, b))
    }
}

/// Owns every channel record and enforces open/join/pay/close.
///
/// Each operation validates fully before mutating and runs while holding the
/// channel's map entry, so operations on one channel never interleave. Lock
/// order across the crate is: pair index, channel, HTLC, settlement rail.
pub struct ChannelLedger {
    config: EngineConfig,
    channels: DashMap<ChannelId, Channel>,
    pairs: PairIndex,
    ids: IdAllocator,
    fees: FeeSchedule,
    transfer: Arc<dyn ValueTransfer>,
    registry: Arc<dyn ParticipantRegistry>,
    clock: Arc<dyn Clock>,
    payments: AtomicU64,
    payment_volume: AtomicU64,
}

impl ChannelLedger {
    pub fn new(
        config: EngineConfig,
        transfer: Arc<dyn ValueTransfer>,
        registry: Arc<dyn ParticipantRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ChannelError> {
        config.validate()?;
        let fees = FeeSchedule::new(config.fee_rate_bps)?;
        tracing::info!(
            rail = transfer.adapter_id(),
            escrow = %config.escrow_account,
            min_deposit = config.min_deposit,
            fee_rate_bps = config.fee_rate_bps,
            "channel ledger initialized"
        );
        Ok(Self {
            config,
            channels: DashMap::new(),
            pairs: PairIndex::new(),
            ids: IdAllocator::new(),
            fees,
            transfer,
            registry,
            clock,
            payments: AtomicU64::new(0),
            payment_volume: AtomicU64::new(0),
        })
    }

    fn check_deposit(&self, deposit: Amount) -> Result<(), ChannelError> {
        if deposit == 0 || deposit < self.config.min_deposit {
            return Err(ChannelError::BelowMinimumDeposit {
                deposit,
                minimum: self.config.min_deposit.max(1),
            });
        }
        Ok(())
    }

    /// Open a channel funded by `initiator`. Returns the new channel id.
    pub fn open(
        &self,
        initiator: &AccountId,
        counterparty: &AccountId,
        deposit: Amount,
    ) -> Result<ChannelId, ChannelError> {
        if initiator == counterparty {
            return Err(ChannelError::SelfPayment(initiator.clone()));
        }
        self.check_deposit(deposit)?;

        let entry = self.pairs.entry(initiator, counterparty);
        if let Entry::Occupied(ref existing) = entry {
            let existing = *existing.get();
            let live = self
                .channels
                .get(&existing)
                .map(|c| !c.state.is_final())
                .unwrap_or(false);
            if live {
                return Err(ChannelError::ChannelAlreadyExists {
                    a: initiator.clone(),
                    b: counterparty.clone(),
                    existing,
                });
            }
        }
        if !self.registry.is_registered(initiator) {
            return Err(ChannelError::NotRegistered(initiator.clone()));
        }

        self.transfer
            .transfer(deposit, initiator, &self.config.escrow_account)?;

        let id = ChannelId(self.ids.allocate());
        let opened_at = self.clock.now();
        self.channels.insert(
            id,
            Channel {
                id,
                participant_a: initiator.clone(),
                participant_b: counterparty.clone(),
                capacity: deposit,
                balance_a: deposit,
                balance_b: 0,
                locked: 0,
                state: ChannelState::Open,
                joined: false,
                opened_at,
                settled_at: None,
            },
        );
        match entry {
            Entry::Occupied(mut occupied) => {
                occupied.insert(id);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(id);
            }
        }

        tracing::info!(
            channel_id = %id,
            initiator = %initiator,
            counterparty = %counterparty,
            deposit,
            "channel opened"
        );
        Ok(id)
    }

    /// Second and final deposit, made by the designated counterparty.
    pub fn join(
        &self,
        channel_id: ChannelId,
        counterparty: &AccountId,
        deposit: Amount,
    ) -> Result<(), ChannelError> {
        let mut channel = self.channel_mut(channel_id)?;
        if !channel.is_open() {
            return Err(ChannelError::ChannelClosed(channel_id));
        }
        if counterparty != &channel.participant_b {
            tracing::warn!(channel_id = %channel_id, caller = %counterparty, "join by non-counterparty");
            return Err(ChannelError::NotAuthorized(counterparty.clone()));
        }
        if channel.joined || channel.balance_b != 0 {
            return Err(ChannelError::AlreadyJoined(channel_id));
        }
        self.check_deposit(deposit)?;
        let capacity = channel
            .capacity
            .checked_add(deposit)
            .ok_or_else(|| ChannelError::overflow("join"))?;

        self.transfer
            .transfer(deposit, counterparty, &self.config.escrow_account)?;

        channel.capacity = capacity;
        channel.balance_b = deposit;
        channel.joined = true;

        tracing::info!(channel_id = %channel_id, deposit, capacity, "channel joined");
        Ok(())
    }

    /// Shift `amount` from `payer` to the other participant. No value leaves
    /// the channel.
    pub fn pay(
        &self,
        channel_id: ChannelId,
        payer: &AccountId,
        amount: Amount,
    ) -> Result<(), ChannelError> {
        let mut channel = self.channel_mut(channel_id)?;
        if !channel.is_open() {
            return Err(ChannelError::ChannelClosed(channel_id));
        }
        let side = channel
            .side_of(payer)
            .ok_or_else(|| ChannelError::NotAuthorized(payer.clone()))?;
        if amount == 0 {
            return Err(ChannelError::InvalidParameters(
                "payment amount must be positive".into(),
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
        let credited = channel
            .balance(side.other())
            .checked_add(amount)
            .ok_or_else(|| ChannelError::overflow("pay"))?;

        *channel.balance_mut(side) = available - amount;
        *channel.balance_mut(side.other()) = credited;
        drop(channel);

        self.payments.fetch_add(1, Ordering::Relaxed);
        self.payment_volume
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_add(amount))
            })
            .ok();
        tracing::debug!(channel_id = %channel_id, payer = %payer, amount, "channel payment");
        Ok(())
    }

    /// Cooperative close: pay both sides their balance minus the protocol
    /// fee, accrue the fees, and settle the channel.
    ///
    /// Refused with `InvalidState` while HTLCs are pending on the channel.
    pub fn close(
        &self,
        channel_id: ChannelId,
        caller: &AccountId,
    ) -> Result<Settlement, ChannelError> {
        let mut channel = self.channel_mut(channel_id)?;
        if !channel.is_open() {
            return Err(ChannelError::ChannelClosed(channel_id));
        }
        if !channel.is_participant(caller) {
            tracing::warn!(channel_id = %channel_id, caller = %caller, "close by non-participant");
            return Err(ChannelError::NotAuthorized(caller.clone()));
        }
        if channel.locked > 0 {
            return Err(ChannelError::InvalidState(format!(
                "channel {channel_id} has {} locked in pending HTLCs",
                channel.locked
            )));
        }
        let next = ChannelStateMachine::transition(channel.state, ChannelEvent::CooperativeClose)?;
        let quote = self.fees.quote(channel.balance_a, channel.balance_b);

        self.pay_out(&mut channel, &quote)?;

        let settled_at = self.clock.now();
        channel.balance_a = 0;
        channel.balance_b = 0;
        channel.capacity = 0;
        channel.state = next;
        channel.settled_at = Some(settled_at);

        tracing::info!(
            channel_id = %channel_id,
            net_a = quote.net_a,
            net_b = quote.net_b,
            fees = quote.total_fee(),
            "channel settled"
        );
        Ok(Settlement {
            channel_id,
            participant_a: channel.participant_a.clone(),
            participant_b: channel.participant_b.clone(),
            fee_a: quote.fee_a,
            fee_b: quote.fee_b,
            net_a: quote.net_a,
            net_b: quote.net_b,
            settled_at,
        })
    }

    /// Transfer both net payouts out of escrow and accrue the fees. On any
    /// failure, payouts already made are reversed.
    fn pay_out(&self, channel: &mut Channel, quote: &SettlementQuote) -> Result<(), ChannelError> {
        let mut paid: Vec<Side> = Vec::with_capacity(2);

        for side in [Side::A, Side::B] {
            let (net, _) = Self::leg(quote, side);
            if net == 0 {
                continue;
            }
            if let Err(e) =
                self.transfer
                    .transfer(net, &self.config.escrow_account, channel.participant(side))
            {
                self.unwind(channel, quote, &paid);
                return Err(e);
            }
            paid.push(side);
        }

        if let Err(e) = self.fees.accrue(quote.total_fee()) {
            self.unwind(channel, quote, &paid);
            return Err(e);
        }
        Ok(())
    }

    /// Reverse completed payouts, newest first.
    ///
    /// A payout that cannot be pulled back stays paid, so that side is
    /// settled on the record: its balance leaves the channel, capacity shrinks
    /// by the same amount and its fee joins the pool. Escrow then still backs
    /// the channel and a later close pays only the other side.
    fn unwind(&self, channel: &mut Channel, quote: &SettlementQuote, paid: &[Side]) {
        let channel_id = channel.id;
        for &side in paid.iter().rev() {
            let (net, fee) = Self::leg(quote, side);
            let account = channel.participant(side).clone();
            let Err(e) = self
                .transfer
                .transfer(net, &account, &self.config.escrow_account)
            else {
                continue;
            };

            let gross = channel.balance(side);
            *channel.balance_mut(side) = 0;
            channel.capacity = channel.capacity.saturating_sub(gross);
            if let Err(accrue_err) = self.fees.accrue(fee) {
                tracing::error!(channel_id = %channel_id, fee, error = %accrue_err, "failed to accrue fee of settled side");
            }
            tracing::error!(
                channel_id = %channel_id,
                account = %account,
                amount = net,
                error = %e,
                "settlement payout not reversible, side settled in place"
            );
        }
    }

    /// (net payout, fee) for one side of a quote.
    fn leg(quote: &SettlementQuote, side: Side) -> (Amount, Amount) {
        match side {
            Side::A => (quote.net_a, quote.fee_a),
            Side::B => (quote.net_b, quote.fee_b),
        }
    }

    pub(crate) fn channel_mut(
        &self,
        channel_id: ChannelId,
    ) -> Result<RefMut<'_, ChannelId, Channel>, ChannelError> {
        self.channels
            .get_mut(&channel_id)
            .ok_or(ChannelError::ChannelNotFound(channel_id))
    }

    // --- Queries ---

    pub fn channel(&self, channel_id: ChannelId) -> Option<Channel> {
        self.channels.get(&channel_id).map(|c| c.clone())
    }

    /// Most recent channel between two accounts, in either direction.
    pub fn channel_between(&self, a: &AccountId, b: &AccountId) -> Option<Channel> {
        self.pairs.get(a, b).and_then(|id| self.channel(id))
    }

    /// All channels `account` participates in, ordered by id.
    pub fn channels_of(&self, account: &AccountId) -> Vec<Channel> {
        let mut channels: Vec<Channel> = self
            .channels
            .iter()
            .filter(|c| c.is_participant(account))
            .map(|c| c.value().clone())
            .collect();
        channels.sort_by_key(|c| c.id);
        channels
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn open_channel_count(&self) -> usize {
        self.channels.iter().filter(|c| c.is_open()).count()
    }

    /// Total value held by open channels.
    pub fn total_capacity(&self) -> u128 {
        self.channels
            .iter()
            .filter(|c| c.is_open())
            .map(|c| c.capacity as u128)
            .sum()
    }

    pub fn payment_count(&self) -> u64 {
        self.payments.load(Ordering::Relaxed)
    }

    pub fn payment_volume(&self) -> Amount {
        self.payment_volume.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ticks between HTLC creation and expiry when the caller gives no
    /// timelock: the configured horizon, else one day of clock ticks.
    pub fn timelock_horizon(&self) -> u64 {
        self.config
            .htlc_timelock_horizon
            .unwrap_or_else(|| self.clock.ticks_per_day())
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    pub(crate) fn transfer(&self) -> &dyn ValueTransfer {
        self.transfer.as_ref()
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }
}
