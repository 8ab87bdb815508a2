use std::fmt;

use crate::error::ChannelError;

/// Lifecycle of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ChannelState {
    /// Accepting deposits, payments and HTLCs.
    Open,
    /// Reserved for a future dispute window. Never entered.
    Closing,
    /// Cooperatively closed and paid out. Final state.
    Settled,
}

impl ChannelState {
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Settled)
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::Closing => write!(f, "Closing"),
            Self::Settled => write!(f, "Settled"),
        }
    }
}

/// Events that move a channel between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Both parties accepted the current balances and were paid out.
    CooperativeClose,
}

/// Channel transitions.
///
/// Valid transitions:
/// - Open → Settled (CooperativeClose)
pub struct ChannelStateMachine;

impl ChannelStateMachine {
    pub fn transition(
        current: ChannelState,
        event: ChannelEvent,
    ) -> Result<ChannelState, ChannelError> {
        let next = match (current, event) {
            (ChannelState::Open, ChannelEvent::CooperativeClose) => ChannelState::Settled,
            _ => {
                return Err(ChannelError::InvalidState(format!(
                    "channel cannot handle {:?} in state {}",
                    event, current
                )));
            }
        };

        tracing::debug!(from = %current, to = %next, event = ?event, "channel state transition");
        Ok(next)
    }
}

/// Status of a Hash Time-Locked Contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum HtlcStatus {
    /// Funds are locked, awaiting the preimage or the timelock.
    Pending,
    /// The receiver revealed the preimage before the timelock. Final state.
    Claimed,
    /// The sender reclaimed the funds after the timelock. Final state.
    Refunded,
}

impl HtlcStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for HtlcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Claimed => write!(f, "Claimed"),
            Self::Refunded => write!(f, "Refunded"),
        }
    }
}

/// Events that resolve an HTLC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtlcEvent {
    Fulfill,
    Refund,
}

/// HTLC transitions.
///
/// Valid transitions:
/// - Pending → Claimed (Fulfill)
/// - Pending → Refunded (Refund)
///
/// Anything from a final state fails with `InvalidState`.
pub struct HtlcStateMachine;

impl HtlcStateMachine {
    pub fn transition(current: HtlcStatus, event: HtlcEvent) -> Result<HtlcStatus, ChannelError> {
        let next = match (current, event) {
            (HtlcStatus::Pending, HtlcEvent::Fulfill) => HtlcStatus::Claimed,
            (HtlcStatus::Pending, HtlcEvent::Refund) => HtlcStatus::Refunded,
            _ => {
                return Err(ChannelError::InvalidState(format!(
                    "cannot {:?} an HTLC that is already {}",
                    event, current
                )));
            }
        };

        tracing::debug!(from = %current, to = %next, event = ?event, "HTLC state transition");
        Ok(next)
    }

    pub fn can_transition(current: HtlcStatus, event: HtlcEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_cooperative_close() {
        let state =
            ChannelStateMachine::transition(ChannelState::Open, ChannelEvent::CooperativeClose)
                .unwrap();
        assert_eq!(state, ChannelState::Settled);
        assert!(state.is_final());
    }

    #[test]
    fn test_settled_channel_cannot_close_again() {
        let result =
            ChannelStateMachine::transition(ChannelState::Settled, ChannelEvent::CooperativeClose);
        assert!(matches!(result, Err(ChannelError::InvalidState(_))));
    }

    #[test]
    fn test_closing_is_never_left_by_cooperative_close() {
        let result =
            ChannelStateMachine::transition(ChannelState::Closing, ChannelEvent::CooperativeClose);
        assert!(result.is_err());
    }

    #[test]
    fn test_htlc_resolutions() {
        assert_eq!(
            HtlcStateMachine::transition(HtlcStatus::Pending, HtlcEvent::Fulfill).unwrap(),
            HtlcStatus::Claimed
        );
        assert_eq!(
            HtlcStateMachine::transition(HtlcStatus::Pending, HtlcEvent::Refund).unwrap(),
            HtlcStatus::Refunded
        );
    }

    #[test]
    fn test_htlc_terminal_states_reject_everything() {
        for terminal in [HtlcStatus::Claimed, HtlcStatus::Refunded] {
            assert!(terminal.is_final());
            for event in [HtlcEvent::Fulfill, HtlcEvent::Refund] {
                assert!(!HtlcStateMachine::can_transition(terminal, event));
                assert!(matches!(
                    HtlcStateMachine::transition(terminal, event),
                    Err(ChannelError::InvalidState(_))
                ));
            }
        }
    }

    #[test]
    fn test_state_display() {
        assert_eq!(format!("{}", ChannelState::Open), "Open");
        assert_eq!(format!("{}", ChannelState::Closing), "Closing");
        assert_eq!(format!("{}", ChannelState::Settled), "Settled");
        assert_eq!(format!("{}", HtlcStatus::Pending), "Pending");
        assert_eq!(format!("{}", HtlcStatus::Claimed), "Claimed");
        assert_eq!(format!("{}", HtlcStatus::Refunded), "Refunded");
    }
}
