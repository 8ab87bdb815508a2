use sluice_core::config::BLOCK_TICKS_PER_DAY;
use sluice_core::{AccountId, Amount, ChannelError};

/// Atomic move of value between two accounts on the settlement layer.
///
/// Implementations must be all-or-nothing: an `Err` means no value moved.
/// Failures are reported as [`ChannelError::TransferFailed`] and are
/// propagated to the caller unmodified.
pub trait ValueTransfer: Send + Sync {
    fn transfer(&self, amount: Amount, from: &AccountId, to: &AccountId)
        -> Result<(), ChannelError>;

    /// Identifier of the settlement rail (e.g. "vt-internal").
    fn adapter_id(&self) -> &str;
}

/// Monotonically non-decreasing clock supplied by the host environment.
///
/// Ticks are opaque to the engine; timelocks are compared against `now()`.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;

    /// Ticks in one day, used as the default HTLC timelock horizon.
    fn ticks_per_day(&self) -> u64 {
        BLOCK_TICKS_PER_DAY
    }
}

/// Read-only view of participant registration.
pub trait ParticipantRegistry: Send + Sync {
    /// Whether the account has an active participant record.
    fn is_registered(&self, account: &AccountId) -> bool;
}
