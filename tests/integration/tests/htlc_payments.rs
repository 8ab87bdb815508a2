//! Integration test: hash-time-locked payments through the router.

use sluice_core::{ChannelError, HtlcStatus};
use sluice_crypto::PaymentSecret;
use sluice_integration_tests::{account, Network};
use sluice_routing::Route;

// =========================================================================
// Routed payments
// =========================================================================

#[test]
fn test_routed_payment_end_to_end() {
    let net = Network::with_defaults(&["alice", "bob"]);
    let id = net.channel("alice", "bob", 1_000_000, 1_000_000);
    let (alice, bob) = (account("alice"), account("bob"));

    let secret = PaymentSecret::generate();
    let route = net.router.find_route(&alice, &bob, 250_000).unwrap();
    assert_eq!(route.hops(), &[id]);

    let start = net
        .router
        .start_payment(&alice, &bob, 250_000, &route, secret.as_bytes())
        .unwrap();
    assert_eq!(start.hashlock, secret.hashlock());
    assert_eq!(net.ledger.channel(id).unwrap().locked, 250_000);

    // Close is refused while the payment is in flight.
    assert!(matches!(
        net.ledger.close(id, &alice),
        Err(ChannelError::InvalidState(_))
    ));

    let preimage = net
        .router
        .complete_payment(start.htlc_id, &bob, secret.as_bytes())
        .unwrap();
    assert_eq!(preimage, secret.to_preimage());

    let channel = net.ledger.channel(id).unwrap();
    assert_eq!(channel.balance_a, 750_000);
    assert_eq!(channel.balance_b, 1_250_000);
    assert_eq!(channel.locked, 0);
    assert!(net.escrow_is_backed());
}

#[test]
fn test_two_hop_route_is_always_invalid() {
    let net = Network::with_defaults(&["alice", "bob", "carol"]);
    let ab = net.channel("alice", "bob", 100_000, 100_000);
    let bc = net.channel("bob", "carol", 100_000, 100_000);

    for (from, to) in [("alice", "carol"), ("alice", "bob"), ("bob", "carol")] {
        let result = net.router.start_payment(
            &account(from),
            &account(to),
            1,
            &Route::new(vec![ab, bc]),
            b"secret",
        );
        assert!(matches!(result, Err(ChannelError::InvalidRoute(_))));
    }
    assert_eq!(net.engine.htlc_count(), 0);
}

#[test]
fn test_no_route_without_direct_channel() {
    let net = Network::with_defaults(&["alice", "bob", "carol"]);
    net.channel("alice", "bob", 100_000, 100_000);
    net.channel("bob", "carol", 100_000, 100_000);
    assert!(matches!(
        net.router
            .find_route(&account("alice"), &account("carol"), 1),
        Err(ChannelError::RouteNotFound { .. })
    ));
}

// =========================================================================
// Timelocks
// =========================================================================

#[test]
fn test_expired_payment_is_refunded_exactly() {
    let net = Network::with_defaults(&["alice", "bob"]);
    let id = net.channel("alice", "bob", 500_000, 500_000);
    let (alice, bob) = (account("alice"), account("bob"));

    let start = net
        .router
        .start_payment(&alice, &bob, 123_456, &Route::direct(id), b"late")
        .unwrap();
    assert_eq!(start.timelock, 144);

    net.clock.set(143);
    assert!(matches!(
        net.engine.refund(start.htlc_id, &alice),
        Err(ChannelError::HtlcNotExpired(_))
    ));

    net.clock.set(144);
    assert!(matches!(
        net.router.complete_payment(start.htlc_id, &bob, b"late"),
        Err(ChannelError::HtlcExpired(_))
    ));
    net.engine.refund(start.htlc_id, &alice).unwrap();

    let channel = net.ledger.channel(id).unwrap();
    assert_eq!(channel.balance_a, 500_000);
    assert_eq!(channel.balance_b, 500_000);
    assert_eq!(
        net.engine.get(start.htlc_id).unwrap().status(),
        HtlcStatus::Refunded
    );
}

#[test]
fn test_preimage_sequence() {
    let net = Network::with_defaults(&["alice", "bob"]);
    let id = net.channel("alice", "bob", 500_000, 500_000);
    let (alice, bob) = (account("alice"), account("bob"));
    let hashlock = sluice_crypto::hashlock(b"right");

    let htlc = net
        .engine
        .create(id, &bob, &alice, 10_000, hashlock, 50)
        .unwrap();
    assert!(matches!(
        net.engine.fulfill(htlc, &alice, b"wrong"),
        Err(ChannelError::IncorrectPreimage(_))
    ));
    assert!(net.engine.get(htlc).unwrap().is_pending());

    net.engine.fulfill(htlc, &alice, b"right").unwrap();
    assert!(matches!(
        net.engine.fulfill(htlc, &alice, b"right"),
        Err(ChannelError::InvalidState(_))
    ));
    net.clock.set(50);
    assert!(matches!(
        net.engine.refund(htlc, &bob),
        Err(ChannelError::InvalidState(_))
    ));
    assert_eq!(net.ledger.channel(id).unwrap().balance_a, 510_000);
}
