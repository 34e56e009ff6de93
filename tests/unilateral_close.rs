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
fn commitment_transaction_pays_out_current_balances_without_peer_cooperation() {
    let alice = TestNode::spawn(2, 100_000_000);
    let bob = TestNode::spawn(2, 100_000_000);

    alice.node.open_channel(bob.identity.clone(), 50_000_000, 25_000_000, 0).unwrap();
    bob.node.send(alice.identity.clone(), 5_000_000).unwrap();
    assert_eq!(alice.node.balance(&bob.identity).unwrap(), (55_000_000, 20_000_000));

    // Bob "stops processing"; Alice falls back to her unilateral-close
    // escape hatch instead of a cooperative `close_channel` round trip.
    let commitment = alice.node.commitment_transaction(&bob.identity).unwrap();

    let payouts: Vec<u64> = commitment.output.iter().map(|o| o.value).collect();
    assert!(payouts.contains(&55_000_000));
    assert!(payouts.contains(&20_000_000));
}
