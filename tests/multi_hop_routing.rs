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
fn multi_hop_forward_pays_the_forwarding_fee_to_the_middle_hop() {
    let forward_fee = 100;
    let alice = TestNode::spawn_with_fee(2, 100_000_000, forward_fee);
    let carol = TestNode::spawn_with_fee(2, 100_000_000, forward_fee);
    let bob = TestNode::spawn_with_fee(2, 100_000_000, forward_fee);

    alice.node.open_channel(carol.identity.clone(), 50_000_000, 50_000_000, 0).unwrap();
    carol.node.open_channel(bob.identity.clone(), 50_000_000, 50_000_000, 0).unwrap();

    alice.node.send(bob.identity.clone(), 5_000_000).unwrap();

    // Alice pays Carol amount + fee over the direct hop (optimistic
    // forwarding per §9); Carol only forwards the bare amount onward.
    assert_eq!(
        alice.node.balance(&carol.identity).unwrap(),
        (50_000_000 - 5_000_000 - forward_fee, 50_000_000 + 5_000_000 + forward_fee)
    );
    assert_eq!(
        carol.node.balance(&bob.identity).unwrap(),
        (50_000_000 - 5_000_000, 50_000_000 + 5_000_000)
    );
}

#[test]
fn route_convergence_prefers_the_cheaper_direct_channel() {
    let a = TestNode::spawn_with_fee(2, 100_000_000, 0);
    let b = TestNode::spawn_with_fee(2, 100_000_000, 50);
    let c = TestNode::spawn_with_fee(2, 100_000_000, 0);

    a.node.open_channel(b.identity.clone(), 50_000_000, 50_000_000, 0).unwrap();
    b.node.open_channel(c.identity.clone(), 50_000_000, 50_000_000, 0).unwrap();

    // A short pause lets gossip triggered by `channel_opened` settle; the
    // calls above are themselves synchronous so no sleep is needed, but the
    // route for A->C should already be A->B->C at cost 50.
    let via_b = a.node.send(c.identity.clone(), 1_000_000);
    assert!(via_b.is_ok());
    let (a_vs_b_before, _) = a.node.balance(&b.identity).unwrap();

    // Opening a direct, lower-cost channel and re-announcing should make
    // A's route to C converge onto the direct hop.
    a.node.open_channel(c.identity.clone(), 50_000_000, 50_000_000, 0).unwrap();

    a.node.send(c.identity.clone(), 1_000_000).unwrap();
    let (a_vs_b_after, _) = a.node.balance(&b.identity).unwrap();
    // The second send no longer touched the A-B channel.
    assert_eq!(a_vs_b_before, a_vs_b_after);
}
