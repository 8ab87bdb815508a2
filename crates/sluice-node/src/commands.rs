//! Commands dispatched from the HTTP API to the node's single-writer loop.

use serde::Serialize;
use sluice_channels::Settlement;
use sluice_core::{AccountId, Amount, ChannelError, ChannelId, HtlcId, PaymentHash, Preimage};
use sluice_routing::{PaymentStart, Route};
use tokio::sync::oneshot;

/// Reply channel carried by every command.
pub type Reply<T> = oneshot::Sender<Result<T, ChannelError>>;

/// A state-changing request for the command loop. Reads bypass the loop.
pub enum NodeCommand {
    RegisterParticipant {
        account: AccountId,
        reply: Reply<bool>,
    },
    /// Admin only. Replies whether an active record was deactivated.
    DeactivateParticipant {
        caller: AccountId,
        account: AccountId,
        reply: Reply<bool>,
    },
    OpenChannel {
        initiator: AccountId,
        counterparty: AccountId,
        deposit: Amount,
        reply: Reply<ChannelId>,
    },
    JoinChannel {
        channel_id: ChannelId,
        counterparty: AccountId,
        deposit: Amount,
        reply: Reply<()>,
    },
    Pay {
        channel_id: ChannelId,
        payer: AccountId,
        amount: Amount,
        reply: Reply<()>,
    },
    CloseChannel {
        channel_id: ChannelId,
        caller: AccountId,
        reply: Reply<Settlement>,
    },
    CreateHtlc {
        channel_id: ChannelId,
        sender: AccountId,
        receiver: AccountId,
        amount: Amount,
        hashlock: PaymentHash,
        /// Defaults to now plus the configured horizon.
        timelock: Option<u64>,
        reply: Reply<HtlcId>,
    },
    FulfillHtlc {
        htlc_id: HtlcId,
        caller: AccountId,
        preimage: Preimage,
        reply: Reply<()>,
    },
    RefundHtlc {
        htlc_id: HtlcId,
        caller: AccountId,
        reply: Reply<()>,
    },
    /// Route and lock a single-hop payment. A fresh secret is generated when
    /// none is supplied.
    SendPayment {
        sender: AccountId,
        receiver: AccountId,
        amount: Amount,
        secret: Option<Preimage>,
        reply: Reply<SentPayment>,
    },
    CompletePayment {
        htlc_id: HtlcId,
        caller: AccountId,
        preimage: Preimage,
        reply: Reply<Preimage>,
    },
    SetFeeRate {
        caller: AccountId,
        fee_rate_bps: u32,
        reply: Reply<u32>,
    },
    WithdrawFees {
        caller: AccountId,
        to: AccountId,
        reply: Reply<Amount>,
    },
    /// Fund an account on the in-memory rail. Admin only.
    Mint {
        caller: AccountId,
        account: AccountId,
        amount: Amount,
        reply: Reply<Amount>,
    },
    /// Advance a manual clock.
    AdvanceClock { ticks: u64, reply: Reply<u64> },
}

impl NodeCommand {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RegisterParticipant { .. } => "register_participant",
            Self::DeactivateParticipant { .. } => "deactivate_participant",
            Self::OpenChannel { .. } => "open_channel",
            Self::JoinChannel { .. } => "join_channel",
            Self::Pay { .. } => "pay",
            Self::CloseChannel { .. } => "close_channel",
            Self::CreateHtlc { .. } => "create_htlc",
            Self::FulfillHtlc { .. } => "fulfill_htlc",
            Self::RefundHtlc { .. } => "refund_htlc",
            Self::SendPayment { .. } => "send_payment",
            Self::CompletePayment { .. } => "complete_payment",
            Self::SetFeeRate { .. } => "set_fee_rate",
            Self::WithdrawFees { .. } => "withdraw_fees",
            Self::Mint { .. } => "mint",
            Self::AdvanceClock { .. } => "advance_clock",
        }
    }
}

/// Result of `SendPayment`. The secret goes back to the payer only.
#[derive(Debug, Clone, Serialize)]
pub struct SentPayment {
    pub route: Route,
    #[serde(flatten)]
    pub start: PaymentStart,
    pub secret: Preimage,
}
