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

//! A tiny "regnet": spins up several in-process [`Node`]s, each backed by
//! its own [`MockAdapter`] wallet and in-memory stores, each serving its
//! peer RPC endpoints on a distinct loopback port. Scenario tests dial one
//! node's local control surface directly (no RPC layer needed there — the
//! test *is* the local caller) and let the nodes talk to each other over
//! real loopback HTTP, exactly as they would in production.

use std::sync::atomic::{AtomicU16, Ordering};

use jsonrpc_http_server::Server;
use paychan::chain::mock::MockAdapter;
use paychan::peer::PeerIdentity;
use paychan::rpc::peer_server;
use paychan::store::memory::{MemoryChannelStore, MemoryRouteStore};
use paychan::Node;

static NEXT_PORT: AtomicU16 = AtomicU16::new(19_000);

fn reserve_port() -> u16 {
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

/// One participant in the test network: its node handle plus the peer
/// server keeping it reachable. Dropping this tears the server down.
pub struct TestNode {
    pub identity: PeerIdentity,
    pub node: Node,
    _server: Server,
}

impl TestNode {
    /// Starts a node with a wallet funded with `n_coins` outputs of
    /// `coin_value` each, listening on its own loopback port.
    pub fn spawn(n_coins: u32, coin_value: u64) -> TestNode {
        TestNode::spawn_with_fee(n_coins, coin_value, 0)
    }

    /// Same as [`TestNode::spawn`] but with an explicit per-hop forwarding
    /// fee, for the multi-hop routing scenarios.
    pub fn spawn_with_fee(n_coins: u32, coin_value: u64, forward_fee: u64) -> TestNode {
        let port = reserve_port();
        let identity = PeerIdentity::new(format!("http://127.0.0.1:{}", port));
        let chain = MockAdapter::funded(n_coins, coin_value);
        let keys = chain.keys().clone();

        let node = Node::new(
            identity.clone(),
            keys,
            Box::new(chain),
            Box::new(MemoryChannelStore::new()),
            Box::new(MemoryRouteStore::new()),
            2,
            forward_fee,
        );

        let server = peer_server::start(node.clone(), &format!("127.0.0.1:{}", port), 2)
            .expect("loopback peer server failed to bind");

        TestNode { identity, node, _server: server }
    }
}
