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

//! The local control RPC server (§6): `create`, `send`, `close`,
//! `get_balance`, `get_commitment_transactions`, `alive`, served at
//! `/local/`, basic-auth guarded and meant to be bound to loopback only
//! (the bind address itself is the operator's responsibility via
//! configuration, same as the reference daemon).

use jsonrpc_core::{Error as RpcError, ErrorCode, IoHandler, Params};
use jsonrpc_http_server::hyper::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use jsonrpc_http_server::hyper::{Body, Request, Response, StatusCode};
use jsonrpc_http_server::{RequestMiddleware, RequestMiddlewareAction, Server, ServerBuilder};

use crate::node::{Node, NodeError};
use crate::peer::PeerIdentity;

fn node_error_to_rpc(err: NodeError) -> RpcError {
    RpcError { code: ErrorCode::ServerError(1), message: err.to_string(), data: None }
}

fn build_handler(node: Node) -> IoHandler {
    let mut io = IoHandler::new();

    let n = node.clone();
    io.add_sync_method("create", move |params: Params| {
        let (peer, our_amount, their_amount, fee): (PeerIdentity, u64, u64, Option<u64>) =
            params.parse()?;
        n.open_channel(peer, our_amount, their_amount, fee.unwrap_or(0))
            .map(|()| serde_json::Value::Bool(true))
            .map_err(node_error_to_rpc)
    });

    let n = node.clone();
    io.add_sync_method("send", move |params: Params| {
        let (peer, amount): (PeerIdentity, u64) = params.parse()?;
        n.send(peer, amount).map(|()| serde_json::Value::Bool(true)).map_err(node_error_to_rpc)
    });

    let n = node.clone();
    io.add_sync_method("close", move |params: Params| {
        let (peer,): (PeerIdentity,) = params.parse()?;
        n.close_channel(peer).map(|()| serde_json::Value::Bool(true)).map_err(node_error_to_rpc)
    });

    let n = node.clone();
    io.add_sync_method("get_balance", move |params: Params| {
        let (peer,): (PeerIdentity,) = params.parse()?;
        n.balance(&peer)
            .map(|(ours, theirs)| serde_json::json!({ "our_balance": ours, "their_balance": theirs }))
            .map_err(node_error_to_rpc)
    });

    let n = node.clone();
    io.add_sync_method("get_commitment_transactions", move |params: Params| {
        let (peer,): (PeerIdentity,) = params.parse()?;
        n.commitment_transaction(&peer)
            .map(|tx| {
                let raw = bitcoin::consensus::encode::serialize(&tx);
                serde_json::Value::String(bitcoin_hashes::hex::ToHex::to_hex(&raw[..]))
            })
            .map_err(node_error_to_rpc)
    });

    io.add_sync_method("alive", move |_params: Params| Ok(serde_json::Value::Bool(true)));

    io
}

/// Rejects any request whose `Authorization: Basic ...` header doesn't
/// match the configured credentials, before it ever reaches the JSON-RPC
/// dispatcher.
struct BasicAuth {
    expected: String,
}

impl BasicAuth {
    fn new(user: &str, password: &str) -> BasicAuth {
        BasicAuth { expected: format!("Basic {}", base64::encode(format!("{}:{}", user, password))) }
    }

    fn authorized(&self, request: &Request<Body>) -> bool {
        request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(|value| value == self.expected)
            .unwrap_or(false)
    }
}

impl RequestMiddleware for BasicAuth {
    fn on_request(&self, request: Request<Body>) -> RequestMiddlewareAction {
        if self.authorized(&request) {
            request.into()
        } else {
            let response = Response::builder()
                .status(StatusCode::UNAUTHORIZED)
                .header(WWW_AUTHENTICATE, "Basic realm=\"paychand\"")
                .body(Body::from("unauthorized"))
                .expect("a fixed, valid header set always builds");
            response.into()
        }
    }
}

/// Starts the local control server, bound to `listen` and basic-auth
/// gated with `user`/`password`.
pub fn start(
    node: Node,
    listen: &str,
    user: &str,
    password: &str,
) -> std::io::Result<Server> {
    let io = build_handler(node);
    let addr = listen.parse().map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("bad listen address: {}", e))
    })?;
    ServerBuilder::new(io)
        .request_middleware(BasicAuth::new(user, password))
        .start_http(&addr)
}
