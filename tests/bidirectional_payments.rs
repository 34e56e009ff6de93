// Bilateral payment-channel node core.
// Written in 2024 by
//     Dr. Maxim Orlovsky <orlovsky@pandoracore.com>
//
// To the extent possible under law, the author(s) have dedicated all
// copyright and related and neighboring rights to this software to
// the public domain worldwide. This software is distributed without
// any warranty.
//
// You should have received a copy of the MIT License
// along with this software.
// If not, see <https://opensource.org/licenses/MIT>.

mod support;

use support::TestNode;

#[test]
fn basic_bidirectional_payments() {
    let alice = TestNode::spawn(2, 100_000_000);
    let bob = TestNode::spawn(2, 100_000_000);

    alice.node.open_channel(bob.identity.clone(), 50_000_000, 25_000_000, 0).unwrap();

    assert_eq!(alice.node.balance(&bob.identity).unwrap(), (50_000_000, 25_000_000));
    assert_eq!(bob.node.balance(&alice.identity).unwrap(), (25_000_000, 50_000_000));

    bob.node.send(alice.identity.clone(), 5_000_000).unwrap();
    assert_eq!(alice.node.balance(&bob.identity).unwrap(), (55_000_000, 20_000_000));
    assert_eq!(bob.node.balance(&alice.identity).unwrap(), (20_000_000, 55_000_000));

    alice.node.send(bob.identity.clone(), 10_000_000).unwrap();
    assert_eq!(alice.node.balance(&bob.identity).unwrap(), (45_000_000, 30_000_000));
    assert_eq!(bob.node.balance(&alice.identity).unwrap(), (30_000_000, 45_000_000));

    bob.node.close_channel(alice.identity.clone()).unwrap();
}

#[test]
fn empty_balance_edges() {
    let alice = TestNode::spawn(2, 100_000_000);
    let bob = TestNode::spawn(2, 100_000_000);

    alice.node.open_channel(bob.identity.clone(), 25_000_000, 50_000_000, 0).unwrap();

    // Drive Alice's balance to exactly zero, then back up.
    alice.node.send(bob.identity.clone(), 25_000_000).unwrap();
    assert_eq!(alice.node.balance(&bob.identity).unwrap(), (0, 75_000_000));
    assert_eq!(bob.node.balance(&alice.identity).unwrap(), (75_000_000, 0));

    bob.node.send(alice.identity.clone(), 75_000_000).unwrap();
    assert_eq!(alice.node.balance(&bob.identity).unwrap(), (75_000_000, 0));
    assert_eq!(bob.node.balance(&alice.identity).unwrap(), (0, 75_000_000));

    // Close succeeds even with one side at zero.
    alice.node.close_channel(bob.identity.clone()).unwrap();
}

#[test]
fn send_of_zero_is_rejected_and_overdraft_fails_locally() {
    let alice = TestNode::spawn(2, 100_000_000);
    let bob = TestNode::spawn(2, 100_000_000);

    alice.node.open_channel(bob.identity.clone(), 50_000_000, 50_000_000, 0).unwrap();

    assert!(alice.node.send(bob.identity.clone(), 0).is_err());
    assert!(alice.node.send(bob.identity.clone(), 50_000_001).is_err());
    // Neither failed attempt moved any balance.
    assert_eq!(alice.node.balance(&bob.identity).unwrap(), (50_000_000, 50_000_000));

    // The boundary itself succeeds.
    alice.node.send(bob.identity.clone(), 50_000_000).unwrap();
    assert_eq!(alice.node.balance(&bob.identity).unwrap(), (0, 100_000_000));
}
