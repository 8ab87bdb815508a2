//! Integration test: protocol fees and the administrative surface.

use sluice_core::{ChannelError, EngineConfig};
use sluice_integration_tests::{account, Network};

#[test]
fn test_fees_accrue_and_withdraw() {
    let net = Network::with_defaults(&["alice", "bob", "carol"]);
    let ab = net.channel("alice", "bob", 1_000_000, 500_000);
    let ac = net.channel("alice", "carol", 2_000_000, 1_000_000);

    let first = net.ledger.close(ab, &account("bob")).unwrap();
    assert_eq!(first.fee_a, 2_000);
    assert_eq!(first.fee_b, 1_000);

    net.ledger.set_fee_rate(&net.admin(), 100).unwrap();
    let second = net.ledger.close(ac, &account("carol")).unwrap();
    assert_eq!(second.fee_a, 20_000);
    assert_eq!(second.fee_b, 10_000);

    assert_eq!(net.ledger.fee_pool(), 33_000);
    assert!(net.escrow_is_backed());

    let paid = net
        .ledger
        .withdraw_fees(&net.admin(), &account("treasury"))
        .unwrap();
    assert_eq!(paid, 33_000);
    assert_eq!(net.balance("treasury"), 33_000);
    assert_eq!(net.rail.balance_of(&net.escrow()), 0);
    assert!(matches!(
        net.ledger.withdraw_fees(&net.admin(), &account("treasury")),
        Err(ChannelError::InvalidParameters(_))
    ));
}

#[test]
fn test_fee_truncation_per_side() {
    let net = Network::with_defaults(&["alice", "bob"]);
    let id = net.channel("alice", "bob", 10_499, 10_001);
    let settlement = net.ledger.close(id, &account("alice")).unwrap();
    // 10_499 * 20 / 10_000 = 20.998; 10_001 * 20 / 10_000 = 20.002
    assert_eq!(settlement.fee_a, 20);
    assert_eq!(settlement.fee_b, 20);
    assert_eq!(settlement.net_a, 10_479);
    assert_eq!(settlement.net_b, 9_981);
}

#[test]
fn test_custom_minimum_deposit() {
    let config = EngineConfig {
        min_deposit: 1,
        ..EngineConfig::default()
    };
    let net = Network::new(config, &["alice", "bob"]);
    let id = net.channel("alice", "bob", 1, 1);
    assert_eq!(net.ledger.channel(id).unwrap().capacity, 2);
    assert!(matches!(
        net.ledger.open(&account("bob"), &account("carol"), 0),
        Err(ChannelError::BelowMinimumDeposit { .. })
    ));
}

#[test]
fn test_only_admin_controls_fees() {
    let net = Network::with_defaults(&["alice"]);
    assert!(matches!(
        net.ledger.set_fee_rate(&account("alice"), 0),
        Err(ChannelError::NotAuthorized(_))
    ));
    assert!(matches!(
        net.ledger.set_fee_rate(&net.admin(), 1_001),
        Err(ChannelError::InvalidParameters(_))
    ));
    assert_eq!(net.ledger.fee_rate_bps(), 20);
}

#[test]
fn test_settlement_serializes_for_clients() {
    let net = Network::with_defaults(&["alice", "bob"]);
    let id = net.channel("alice", "bob", 100_000, 100_000);
    let settlement = net.ledger.close(id, &account("alice")).unwrap();
    let json = serde_json::to_value(&settlement).unwrap();
    assert_eq!(json["channel_id"], 1);
    assert_eq!(json["participant_a"], "alice");
    assert_eq!(json["net_b"], 99_800);
}
