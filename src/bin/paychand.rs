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

//! The node daemon: parses configuration, opens the stores, wires a
//! [`Node`] together, and serves the peer and local RPC endpoints until
//! killed. Mirrors the reference `lightningd` entry point minus OS
//! daemonization (backgrounding is left to the process supervisor).

use std::fs;
use std::process::exit;

use clap::Parser;
use log::info;
use paychan::chain::BitcoindAdapter;
use paychan::config::{Config, Opts};
use paychan::keys::NodeKeys;
use paychan::peer::PeerIdentity;
use paychan::rpc::client::RpcClient;
use paychan::rpc::{local_server, peer_server};
use paychan::store::sled_store::{SledChannelStore, SledRouteStore};
use paychan::Node;

fn main() {
    env_logger::init();

    let opts = Opts::parse();
    let config = Config::load(&opts).unwrap_or_else(|err| {
        eprintln!("configuration error: {}", err);
        exit(1);
    });

    if let Err(err) = fs::create_dir_all(config.data_dir()) {
        eprintln!("failed to create data directory {}: {}", config.data_dir().display(), err);
        exit(1);
    }

    let db = sled::open(config.data_dir().join("paychand.sled")).unwrap_or_else(|err| {
        eprintln!("failed to open storage at {}: {}", config.data_dir().display(), err);
        exit(1);
    });
    let channel_store = SledChannelStore::open(&db).unwrap_or_else(|err| {
        eprintln!("failed to open channel store: {}", err);
        exit(1);
    });
    let route_store = SledRouteStore::open(&db).unwrap_or_else(|err| {
        eprintln!("failed to open route store: {}", err);
        exit(1);
    });

    let keys = NodeKeys::new(*config.secret_key());
    let self_identity = PeerIdentity::new(format!("http://{}", config.peer_listen()));

    let chain_rpc = match (config.chain_rpc_user(), config.chain_rpc_password()) {
        (Some(user), Some(password)) => {
            RpcClient::with_auth(config.chain_rpc_url().to_owned(), user.clone(), password.clone())
        }
        _ => RpcClient::new(config.chain_rpc_url().to_owned()),
    };
    let chain = BitcoindAdapter::new(chain_rpc);

    let node = Node::new(
        self_identity,
        keys,
        Box::new(chain),
        Box::new(channel_store),
        Box::new(route_store),
        *config.worker_threads(),
        *config.forward_fee(),
    );

    info!("starting peer RPC server on {}", config.peer_listen());
    let peer_srv = peer_server::start(node.clone(), config.peer_listen(), *config.worker_threads())
        .unwrap_or_else(|err| {
            eprintln!("failed to start peer RPC server: {}", err);
            exit(1);
        });

    info!("starting local control RPC server on {}", config.local_listen());
    let local_srv = local_server::start(
        node,
        config.local_listen(),
        config.local_user(),
        config.local_password(),
    )
    .unwrap_or_else(|err| {
        eprintln!("failed to start local RPC server: {}", err);
        exit(1);
    });

    // Both servers run their own thread pools; block the main thread on
    // whichever finishes first (normally neither does, short of a panic).
    std::thread::spawn(move || peer_srv.wait());
    local_srv.wait();
}
