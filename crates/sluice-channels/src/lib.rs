//! Sluice Channels
//!
//! The channel accounting engine: the [`ChannelLedger`] that locks, moves and
//! releases deposited value, the [`HtlcEngine`] layering hash-time-locked
//! transfers on top of it, protocol fees at cooperative close, and in-memory
//! adapters for the external collaborators (value transfer, clock,
//! participant registry).

pub mod adapters;
pub mod admin;
pub mod fees;
pub mod htlc;
pub mod ids;
pub mod ledger;
pub mod stats;
pub mod traits;

#[cfg(test)]
mod testing;

pub use adapters::{InMemoryRegistry, InternalTransfer, ManualClock, SystemClock};
pub use fees::{protocol_fee, FeeSchedule, SettlementQuote};
pub use htlc::{Htlc, HtlcEngine};
pub use ids::IdAllocator;
pub use ledger::{Channel, ChannelLedger, Settlement, Side};
pub use stats::NetworkStats;
pub use traits::{Clock, ParticipantRegistry, ValueTransfer};
