//! Sluice Core: identifiers, record states, the error taxonomy and engine
//! configuration shared by every Sluice crate.

pub mod config;
pub mod error;
pub mod state_machine;
pub mod types;

pub use config::EngineConfig;
pub use error::{ChannelError, ErrorCategory};
pub use state_machine::{
    ChannelEvent, ChannelState, ChannelStateMachine, HtlcEvent, HtlcStateMachine, HtlcStatus,
};
pub use types::{AccountId, Amount, ChannelId, HtlcId, PaymentHash, Preimage};
