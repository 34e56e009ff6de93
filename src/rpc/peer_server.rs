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

//! Inbound `channel.*` and `lightning.*` JSON-RPC dispatch (§6). Binds the
//! two method families under `/channel/` and `/lightning/` and routes each
//! call into a [`Node`] handler, translating its error into the JSON-RPC
//! error categories §7 requires (`"invalid signature"`, `"not enough
//! money"`, `"unknown peer"`, `"unexpected packet"`).

use jsonrpc_core::{Error as RpcError, ErrorCode, IoHandler, Params};
use jsonrpc_http_server::{Server, ServerBuilder};

use crate::channel::ChannelError;
use crate::node::Node;
use crate::peer::PeerIdentity;
use crate::router::RouterError;

fn channel_error_to_rpc(err: ChannelError) -> RpcError {
    let message = match &err {
        ChannelError::InsufficientFunds(_) => "not enough money".to_owned(),
        ChannelError::InvalidSignature => "invalid signature".to_owned(),
        ChannelError::ProtocolViolation { .. } => "unexpected packet".to_owned(),
        ChannelError::UnknownPeer => "unknown peer".to_owned(),
        ChannelError::Chain(_) | ChannelError::PeerError(_) => err.to_string(),
    };
    RpcError { code: ErrorCode::ServerError(1), message, data: None }
}

fn router_error_to_rpc(err: RouterError) -> RpcError {
    RpcError { code: ErrorCode::ServerError(2), message: err.to_string(), data: None }
}

fn invalid_params(err: serde_json::Error) -> RpcError {
    RpcError { code: ErrorCode::InvalidParams, message: err.to_string(), data: None }
}

/// Parses the `(self_addr, request)` positional pair every peer method
/// takes: the caller's own base URL followed by one strongly typed request
/// object, per §6's "first positional argument is the caller's own base
/// URL" convention.
fn parse_call<T: serde::de::DeserializeOwned>(params: Params) -> Result<(PeerIdentity, T), RpcError> {
    params.parse()
}

/// Registers the `channel.*` methods for one node onto `io`.
fn add_channel_methods(io: &mut IoHandler, node: Node) {
    let n = node.clone();
    io.add_sync_method("open_channel", move |params: Params| {
        let (peer, request) = parse_call(params)?;
        n.handle_open_channel(peer, request)
            .map(|reply| serde_json::to_value(reply).expect("OpenAccept always serializes"))
            .map_err(channel_error_to_rpc)
    });

    let n = node.clone();
    io.add_sync_method("update_anchor", move |params: Params| {
        let (peer, request) = parse_call(params)?;
        n.handle_update_anchor(peer, request)
            .map(|reply| serde_json::to_value(reply).expect("AnchorUpdateSig always serializes"))
            .map_err(channel_error_to_rpc)
    });

    let n = node.clone();
    io.add_sync_method("propose_update", move |params: Params| {
        let (peer, request) = parse_call(params)?;
        n.handle_propose_update(peer, request)
            .map(|reply| serde_json::to_value(reply).expect("UpdateAccept always serializes"))
            .map_err(channel_error_to_rpc)
    });

    let n = node.clone();
    io.add_sync_method("receive", move |params: Params| {
        let (peer, request) = parse_call(params)?;
        n.handle_receive(peer, request)
            .map(|()| serde_json::Value::Bool(true))
            .map_err(channel_error_to_rpc)
    });

    let n = node.clone();
    io.add_sync_method("close_channel", move |params: Params| {
        let (peer, request) = parse_call(params)?;
        n.handle_close_channel(peer, request)
            .map(|reply| serde_json::to_value(reply).expect("Close always serializes"))
            .map_err(channel_error_to_rpc)
    });
}

/// Registers the `lightning.*` methods for one node onto `io`.
fn add_lightning_methods(io: &mut IoHandler, node: Node) {
    let n = node.clone();
    io.add_sync_method("update", move |params: Params| {
        let (next_hop, destination, cost): (PeerIdentity, PeerIdentity, u64) =
            params.parse().map_err(invalid_params)?;
        n.handle_lightning_update(next_hop, destination, cost)
            .map(|()| serde_json::Value::Bool(true))
            .map_err(router_error_to_rpc)
    });

    let n = node.clone();
    io.add_sync_method("send", move |params: Params| {
        let (_self_addr, destination, amount): (PeerIdentity, PeerIdentity, u64) =
            params.parse().map_err(invalid_params)?;
        n.handle_lightning_send(destination, amount)
            .map(|()| serde_json::Value::Bool(true))
            .map_err(router_error_to_rpc)
    });
}

/// Starts the peer-facing HTTP server. `channel.*` and `lightning.*`
/// methods share one listen address and `IoHandler`; the two URL path
/// segments clients dial (`/channel/`, `/lightning/`) name-space the
/// method calls only on the client side, since the method names
/// themselves never collide.
pub fn start(node: Node, listen: &str, worker_threads: usize) -> std::io::Result<Server> {
    let mut io = IoHandler::new();
    add_channel_methods(&mut io, node.clone());
    add_lightning_methods(&mut io, node);

    let addr = listen.parse().map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("bad listen address: {}", e))
    })?;
    ServerBuilder::new(io)
        .threads(worker_threads.max(1))
        .start_http(&addr)
}
