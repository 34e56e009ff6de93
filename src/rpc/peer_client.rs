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

//! Outbound calls to a remote peer's `channel.*` and `lightning.*` RPC
//! methods (§6). Every call's first positional parameter is our own base
//! URL, per the wire protocol's convention; the remainder is the strongly
//! typed request struct, which round-trips as a single JSON object rather
//! than flattened positional fields — the receiver decodes it the same way.

use crate::channel::message::{
    AnchorUpdateSig, Close, OpenAccept, OpenChannel, Update, UpdateAccept, UpdateAnchor,
    UpdateSignature,
};
use crate::channel::ChannelError;
use crate::peer::PeerIdentity;
use crate::router::{PeerLink, RouterError};
use crate::rpc::client::RpcClient;

/// Dials one peer's `channel.*` endpoints. Cheap to construct: owns nothing
/// but two URLs and a request-id counter, so the worker builds one per call
/// rather than keeping a long-lived connection pool.
pub struct HttpPeerClient {
    channel_rpc: RpcClient,
    self_identity: PeerIdentity,
}

impl HttpPeerClient {
    pub fn new(peer: &PeerIdentity, self_identity: PeerIdentity) -> HttpPeerClient {
        HttpPeerClient {
            channel_rpc: RpcClient::new(format!("{}/channel/", peer.as_url())),
            self_identity,
        }
    }

    fn call<P: serde::Serialize, R: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        request: &P,
    ) -> Result<R, ChannelError> {
        self.channel_rpc
            .call(method, serde_json::json!([self.self_identity, request]))
            .map_err(|e| ChannelError::PeerError(e.to_string()))
    }

    pub fn open_channel(&self, request: OpenChannel) -> Result<OpenAccept, ChannelError> {
        self.call("open_channel", &request)
    }

    pub fn update_anchor(&self, request: UpdateAnchor) -> Result<AnchorUpdateSig, ChannelError> {
        self.call("update_anchor", &request)
    }

    pub fn propose_update(&self, request: Update) -> Result<UpdateAccept, ChannelError> {
        self.call("propose_update", &request)
    }

    pub fn receive(&self, request: UpdateSignature) -> Result<(), ChannelError> {
        let _ack: bool = self.call("receive", &request)?;
        Ok(())
    }

    pub fn close_channel(&self, request: Close) -> Result<Close, ChannelError> {
        self.call("close_channel", &request)
    }
}

/// Dials `lightning.*` on whichever peer the router names; unlike
/// [`HttpPeerClient`] this isn't bound to one counterparty at construction
/// since gossip fans out to every direct peer.
pub struct GossipLink {
    self_identity: PeerIdentity,
}

impl GossipLink {
    pub fn new(self_identity: PeerIdentity) -> GossipLink {
        GossipLink { self_identity }
    }
}

impl PeerLink for GossipLink {
    fn update(
        &self,
        peer: &PeerIdentity,
        next_hop: &PeerIdentity,
        destination: &PeerIdentity,
        cost: u64,
    ) -> Result<(), RouterError> {
        let rpc = RpcClient::new(format!("{}/lightning/", peer.as_url()));
        let _ack: bool = rpc
            .call("update", serde_json::json!([next_hop, destination, cost]))
            .map_err(|e| RouterError::GossipFailed(peer.clone(), e.to_string()))?;
        Ok(())
    }

    fn lightning_send(
        &self,
        peer: &PeerIdentity,
        destination: &PeerIdentity,
        amount: u64,
    ) -> Result<(), RouterError> {
        let rpc = RpcClient::new(format!("{}/lightning/", peer.as_url()));
        let _ack: bool = rpc
            .call("send", serde_json::json!([self.self_identity, destination, amount]))
            .map_err(|_| RouterError::NextHopRejected(peer.clone()))?;
        Ok(())
    }
}
