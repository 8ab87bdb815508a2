use crate::types::{AccountId, Amount, ChannelId, HtlcId};

/// Every way a channel, HTLC or routing operation can be refused.
///
/// A returned error guarantees the operation applied no state change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("{0} is not authorized for this operation")]
    NotAuthorized(AccountId),

    #[error("participant not registered: {0}")]
    NotRegistered(AccountId),

    #[error("channel not found: {0}")]
    ChannelNotFound(ChannelId),

    #[error("channel {0} is not open")]
    ChannelClosed(ChannelId),

    #[error("a channel between {a} and {b} already exists: {existing}")]
    ChannelAlreadyExists {
        a: AccountId,
        b: AccountId,
        existing: ChannelId,
    },

    #[error("counterparty already joined channel {0}")]
    AlreadyJoined(ChannelId),

    #[error("HTLC not found: {0}")]
    InvalidHtlc(HtlcId),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("HTLC {0} has expired")]
    HtlcExpired(HtlcId),

    #[error("HTLC {0} has not expired yet")]
    HtlcNotExpired(HtlcId),

    #[error("insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: Amount, required: Amount },

    #[error("deposit {deposit} is below the minimum of {minimum}")]
    BelowMinimumDeposit { deposit: Amount, minimum: Amount },

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("invalid route: {0}")]
    InvalidRoute(String),

    #[error("no route from {from} to {to}")]
    RouteNotFound { from: AccountId, to: AccountId },

    #[error("{0} cannot open a channel with itself")]
    SelfPayment(AccountId),

    #[error("preimage does not match the hashlock of HTLC {0}")]
    IncorrectPreimage(HtlcId),

    #[error("value transfer failed: {0}")]
    TransferFailed(String),
}

/// Coarse grouping of [`ChannelError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authorization,
    Precondition,
    Value,
    Cryptographic,
    External,
}

impl ChannelError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotAuthorized(_) | Self::NotRegistered(_) => ErrorCategory::Authorization,
            Self::ChannelNotFound(_)
            | Self::ChannelClosed(_)
            | Self::ChannelAlreadyExists { .. }
            | Self::AlreadyJoined(_)
            | Self::InvalidHtlc(_)
            | Self::InvalidState(_)
            | Self::HtlcExpired(_)
            | Self::HtlcNotExpired(_) => ErrorCategory::Precondition,
            Self::InsufficientFunds { .. }
            | Self::BelowMinimumDeposit { .. }
            | Self::InvalidParameters(_)
            | Self::InvalidRoute(_)
            | Self::RouteNotFound { .. }
            | Self::SelfPayment(_) => ErrorCategory::Value,
            Self::IncorrectPreimage(_) => ErrorCategory::Cryptographic,
            Self::TransferFailed(_) => ErrorCategory::External,
        }
    }

    /// Stable machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotAuthorized(_) => "NotAuthorized",
            Self::NotRegistered(_) => "NotRegistered",
            Self::ChannelNotFound(_) => "ChannelNotFound",
            Self::ChannelClosed(_) => "ChannelClosed",
            Self::ChannelAlreadyExists { .. } => "ChannelAlreadyExists",
            Self::AlreadyJoined(_) => "AlreadyJoined",
            Self::InvalidHtlc(_) => "InvalidHtlc",
            Self::InvalidState(_) => "InvalidState",
            Self::HtlcExpired(_) => "HtlcExpired",
            Self::HtlcNotExpired(_) => "HtlcNotExpired",
            Self::InsufficientFunds { .. } => "InsufficientFunds",
            Self::BelowMinimumDeposit { .. } => "BelowMinimumDeposit",
            Self::InvalidParameters(_) => "InvalidParameters",
            Self::InvalidRoute(_) => "InvalidRoute",
            Self::RouteNotFound { .. } => "RouteNotFound",
            Self::SelfPayment(_) => "SelfPayment",
            Self::IncorrectPreimage(_) => "IncorrectPreimage",
            Self::TransferFailed(_) => "TransferFailed",
        }
    }

    /// Checked-arithmetic failure.
    pub fn overflow(context: &str) -> Self {
        Self::InvalidParameters(format!("arithmetic overflow in {context}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ChannelError::InsufficientFunds {
            available: 10,
            required: 20,
        };
        assert_eq!(
            err.to_string(),
            "insufficient funds: available 10, required 20"
        );
        assert_eq!(
            ChannelError::ChannelNotFound(ChannelId(9)).to_string(),
            "channel not found: 9"
        );
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(
            ChannelError::NotRegistered(AccountId::from("a")).category(),
            ErrorCategory::Authorization
        );
        assert_eq!(
            ChannelError::HtlcExpired(HtlcId(1)).category(),
            ErrorCategory::Precondition
        );
        assert_eq!(
            ChannelError::SelfPayment(AccountId::from("a")).category(),
            ErrorCategory::Value
        );
        assert_eq!(
            ChannelError::IncorrectPreimage(HtlcId(1)).category(),
            ErrorCategory::Cryptographic
        );
        assert_eq!(
            ChannelError::TransferFailed("down".into()).category(),
            ErrorCategory::External
        );
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(ChannelError::InvalidRoute("x".into()).kind(), "InvalidRoute");
        assert_eq!(ChannelError::overflow("pay").kind(), "InvalidParameters");
    }
}
