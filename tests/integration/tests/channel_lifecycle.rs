//! Integration test: channel lifecycle against the in-memory rail.

use sluice_core::{ChannelError, ChannelState};
use sluice_integration_tests::{account, Network, FUNDING};

// =========================================================================
// Open → join → pay → close
// =========================================================================

#[test]
fn test_full_lifecycle_with_equal_payouts() {
    let net = Network::with_defaults(&["alice", "bob"]);
    let (alice, bob) = (account("alice"), account("bob"));

    let id = net.ledger.open(&alice, &bob, 2_000_000).unwrap();
    net.ledger.join(id, &bob, 1_000_000).unwrap();
    assert!(net.escrow_is_backed());

    net.ledger.pay(id, &alice, 500_000).unwrap();
    let channel = net.ledger.channel(id).unwrap();
    assert_eq!(channel.balance_a, 1_500_000);
    assert_eq!(channel.balance_b, 1_500_000);

    let settlement = net.ledger.close(id, &alice).unwrap();
    assert_eq!(settlement.net_a, settlement.net_b);
    assert_eq!(settlement.net_a, 1_497_000);

    assert_eq!(net.balance("alice"), FUNDING - 2_000_000 + 1_497_000);
    assert_eq!(net.balance("bob"), FUNDING - 1_000_000 + 1_497_000);
    assert_eq!(net.ledger.fee_pool(), 6_000);
    assert!(net.escrow_is_backed());
    assert_eq!(
        net.ledger.channel(id).unwrap().state,
        ChannelState::Settled
    );
}

#[test]
fn test_rail_supply_is_conserved() {
    let net = Network::with_defaults(&["alice", "bob", "carol"]);
    let supply = net.rail.total_supply();

    let ab = net.channel("alice", "bob", 1_000_000, 250_000);
    let bc = net.channel("bob", "carol", 300_000, 300_000);
    net.ledger.pay(ab, &account("bob"), 100_000).unwrap();
    net.ledger.pay(bc, &account("carol"), 299_999).unwrap();
    net.ledger.close(ab, &account("bob")).unwrap();

    assert_eq!(net.rail.total_supply(), supply);
    assert!(net.escrow_is_backed());
}

// =========================================================================
// Rejections leave no trace
// =========================================================================

#[test]
fn test_self_channel_never_mutates() {
    let net = Network::with_defaults(&["alice"]);
    let before = net.rail.journal_len();
    let result = net.ledger.open(&account("alice"), &account("alice"), 2_000_000);
    assert!(matches!(result, Err(ChannelError::SelfPayment(_))));
    assert_eq!(net.rail.journal_len(), before);
    assert_eq!(net.ledger.channel_count(), 0);
}

#[test]
fn test_deactivated_participant_cannot_open() {
    let net = Network::with_defaults(&["alice", "bob"]);
    net.registry.deactivate(&account("alice"));
    assert!(matches!(
        net.ledger.open(&account("alice"), &account("bob"), 20_000),
        Err(ChannelError::NotRegistered(_))
    ));
    // The counterparty does not need a record.
    net.ledger
        .open(&account("bob"), &account("alice"), 20_000)
        .unwrap();
}

#[test]
fn test_duplicate_pair_rejected_until_settled() {
    let net = Network::with_defaults(&["alice", "bob"]);
    let first = net.channel("alice", "bob", 20_000, 20_000);
    assert!(matches!(
        net.ledger.open(&account("bob"), &account("alice"), 20_000),
        Err(ChannelError::ChannelAlreadyExists { existing, .. }) if existing == first
    ));

    net.ledger.close(first, &account("alice")).unwrap();
    let second = net.ledger.open(&account("bob"), &account("alice"), 20_000).unwrap();
    assert!(second > first);
}

#[test]
fn test_settled_channel_rejects_everything() {
    let net = Network::with_defaults(&["alice", "bob"]);
    let id = net.channel("alice", "bob", 20_000, 20_000);
    net.ledger.close(id, &account("bob")).unwrap();

    assert!(matches!(
        net.ledger.pay(id, &account("alice"), 1),
        Err(ChannelError::ChannelClosed(_))
    ));
    assert!(matches!(
        net.ledger.join(id, &account("bob"), 20_000),
        Err(ChannelError::ChannelClosed(_))
    ));
    assert!(matches!(
        net.ledger.close(id, &account("alice")),
        Err(ChannelError::ChannelClosed(_))
    ));
}
