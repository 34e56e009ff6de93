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

//! The node: wires the chain adapter, the two stores, the worker pool, and
//! the router into the object both RPC servers and the binary entry point
//! drive (§2's data-flow: "a local command or a peer message becomes a task
//! tagged with the peer identity").

use std::sync::Arc;

use crate::chain::ChainAdapter;
use crate::channel::message::{
    AnchorUpdateSig, Close, OpenAccept, OpenChannel, Update, UpdateAccept, UpdateAnchor,
    UpdateSignature,
};
use crate::channel::{machine, Channel, ChannelError};
use crate::keys::NodeKeys;
use crate::peer::PeerIdentity;
use crate::router::{LocalChannel, Router, RouterError};
use crate::rpc::peer_client::{GossipLink, HttpPeerClient};
use crate::store::{ChannelStore, RouteStore, StoreError};
use crate::worker::{self, WorkerPool};

#[derive(Clone, Eq, PartialEq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum NodeError {
    /// {0}
    #[from]
    Channel(ChannelError),

    /// {0}
    #[from]
    Store(StoreError),

    /// {0}
    #[from]
    Router(RouterError),

    /// no channel is open with {0}
    UnknownPeer(PeerIdentity),
}

struct Inner {
    self_identity: PeerIdentity,
    keys: NodeKeys,
    chain: Box<dyn ChainAdapter>,
    channel_store: Box<dyn ChannelStore>,
    route_store: Box<dyn RouteStore>,
    workers: WorkerPool,
    forward_fee: u64,
}

/// A running node. Cheap to clone: internals are `Arc`-shared so local and
/// peer RPC handlers can each hold their own handle.
#[derive(Clone)]
pub struct Node(Arc<Inner>);

impl Node {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        self_identity: PeerIdentity,
        keys: NodeKeys,
        chain: Box<dyn ChainAdapter>,
        channel_store: Box<dyn ChannelStore>,
        route_store: Box<dyn RouteStore>,
        worker_threads: usize,
        forward_fee: u64,
    ) -> Node {
        Node(Arc::new(Inner {
            self_identity,
            keys,
            chain,
            channel_store,
            route_store,
            workers: WorkerPool::new(worker_threads, 64),
            forward_fee,
        }))
    }

    pub fn identity(&self) -> &PeerIdentity {
        &self.0.self_identity
    }

    /// `create(peer, our_amount, their_amount, fees)`: local control RPC.
    pub fn open_channel(
        &self,
        peer: PeerIdentity,
        our_amount: u64,
        their_amount: u64,
        fee: u64,
    ) -> Result<(), NodeError> {
        let inner = self.0.clone();
        let target = peer.clone();
        worker::submit_and_wait(&self.0.workers, &peer, move || {
            inner.open_channel_blocking(&target, our_amount, their_amount, fee)
        })
    }

    /// `send(peer, amount)`: local control RPC. Dispatches through the
    /// router, which may forward over several hops.
    pub fn send(&self, destination: PeerIdentity, amount: u64) -> Result<(), NodeError> {
        let router =
            Router::new(self.0.route_store.as_ref(), self.0.self_identity.clone(), self.0.forward_fee);
        let link = GossipLink::new(self.0.self_identity.clone());
        router.send(&destination, amount, self, &link).map_err(NodeError::from)
    }

    /// `close(peer)`: local control RPC.
    pub fn close_channel(&self, peer: PeerIdentity) -> Result<(), NodeError> {
        let inner = self.0.clone();
        let target = peer.clone();
        worker::submit_and_wait(&self.0.workers, &peer, move || {
            inner.close_channel_blocking(&target)
        })
    }

    /// `get_balance(peer)`: local control RPC.
    pub fn balance(&self, peer: &PeerIdentity) -> Result<(u64, u64), NodeError> {
        let record = self
            .0
            .channel_store
            .get(peer)?
            .ok_or_else(|| NodeError::UnknownPeer(peer.clone()))?;
        Ok((*record.our_balance(), *record.their_balance()))
    }

    /// `get_commitment_transactions(peer)`: local control RPC, the
    /// unilateral-close escape hatch.
    pub fn commitment_transaction(
        &self,
        peer: &PeerIdentity,
    ) -> Result<bitcoin::Transaction, NodeError> {
        let record = self
            .0
            .channel_store
            .get(peer)?
            .ok_or_else(|| NodeError::UnknownPeer(peer.clone()))?;
        let channel = Channel::new(record, self.0.chain.as_ref(), &self.0.keys);
        channel.commitment_transaction().map_err(NodeError::from)
    }

    /// Inbound `channel.open_channel`.
    pub fn handle_open_channel(
        &self,
        peer: PeerIdentity,
        request: OpenChannel,
    ) -> Result<OpenAccept, ChannelError> {
        let inner = self.0.clone();
        worker::submit_and_wait(&self.0.workers, &peer, move || {
            inner.handle_open_channel_blocking(&peer, request)
        })
    }

    /// Inbound `channel.update_anchor`.
    pub fn handle_update_anchor(
        &self,
        peer: PeerIdentity,
        request: UpdateAnchor,
    ) -> Result<AnchorUpdateSig, ChannelError> {
        let inner = self.0.clone();
        worker::submit_and_wait(&self.0.workers, &peer, move || {
            inner.handle_update_anchor_blocking(&peer, request)
        })
    }

    /// Inbound `channel.propose_update`.
    pub fn handle_propose_update(
        &self,
        peer: PeerIdentity,
        request: Update,
    ) -> Result<UpdateAccept, ChannelError> {
        let inner = self.0.clone();
        worker::submit_and_wait(&self.0.workers, &peer, move || {
            inner.handle_propose_update_blocking(&peer, request)
        })
    }

    /// Inbound `channel.receive`.
    pub fn handle_receive(
        &self,
        peer: PeerIdentity,
        request: UpdateSignature,
    ) -> Result<(), ChannelError> {
        let inner = self.0.clone();
        worker::submit_and_wait(&self.0.workers, &peer, move || {
            inner.handle_receive_blocking(&peer, request)
        })
    }

    /// Inbound `channel.close_channel`.
    pub fn handle_close_channel(
        &self,
        peer: PeerIdentity,
        request: Close,
    ) -> Result<Close, ChannelError> {
        let inner = self.0.clone();
        worker::submit_and_wait(&self.0.workers, &peer, move || {
            inner.handle_close_channel_blocking(&peer, request)
        })
    }

    /// Inbound `lightning.update`.
    pub fn handle_lightning_update(
        &self,
        next_hop: PeerIdentity,
        destination: PeerIdentity,
        cost: u64,
    ) -> Result<(), RouterError> {
        let router =
            Router::new(self.0.route_store.as_ref(), self.0.self_identity.clone(), self.0.forward_fee);
        let link = GossipLink::new(self.0.self_identity.clone());
        router.update(&next_hop, &destination, cost, &link)
    }

    /// Inbound `lightning.send`.
    pub fn handle_lightning_send(
        &self,
        destination: PeerIdentity,
        amount: u64,
    ) -> Result<(), RouterError> {
        let router =
            Router::new(self.0.route_store.as_ref(), self.0.self_identity.clone(), self.0.forward_fee);
        let link = GossipLink::new(self.0.self_identity.clone());
        router.send(&destination, amount, self, &link)
    }
}

/// The router's view of "pay a direct peer": load the record, run `cmd_send`
/// through the state machine, persist. Implemented on `Node` itself rather
/// than a wrapper since it always means the *local* hop.
impl LocalChannel for Node {
    fn send(&self, peer: &PeerIdentity, amount: u64) -> Result<(), RouterError> {
        let inner = self.0.clone();
        let target = peer.clone();
        worker::submit_and_wait(&self.0.workers, peer, move || {
            inner.send_local_blocking(&target, amount)
        })
        .map_err(|e: NodeError| RouterError::LocalSendFailed(peer.clone(), e.to_string()))
    }
}

impl Inner {
    fn open_channel_blocking(
        &self,
        peer: &PeerIdentity,
        our_amount: u64,
        their_amount: u64,
        fee: u64,
    ) -> Result<(), NodeError> {
        let client = HttpPeerClient::new(peer, self.self_identity.clone());
        let (channel, effects) = Channel::open(
            self.chain.as_ref(),
            &self.keys,
            peer,
            our_amount,
            their_amount,
            fee,
            |request| client.open_channel(request),
            |request| client.update_anchor(request),
        )?;
        self.channel_store.put(peer, &channel.record)?;
        self.apply_effects(peer, effects)?;
        Ok(())
    }

    fn send_local_blocking(&self, peer: &PeerIdentity, amount: u64) -> Result<(), NodeError> {
        let record = self
            .channel_store
            .get(peer)?
            .ok_or_else(|| NodeError::UnknownPeer(peer.clone()))?;
        let mut channel = Channel::new(record, self.chain.as_ref(), &self.keys);
        let client = HttpPeerClient::new(peer, self.self_identity.clone());
        channel.send(amount, |request| client.propose_update(request), |request| {
            client.receive(request)
        })?;
        self.channel_store.put(peer, &channel.record)?;
        Ok(())
    }

    fn close_channel_blocking(&self, peer: &PeerIdentity) -> Result<(), NodeError> {
        let record = self
            .channel_store
            .get(peer)?
            .ok_or_else(|| NodeError::UnknownPeer(peer.clone()))?;
        let channel = Channel::new(record, self.chain.as_ref(), &self.keys);
        let client = HttpPeerClient::new(peer, self.self_identity.clone());
        let effects = channel.close(|request| client.close_channel(request))?;
        self.apply_effects(peer, effects)?;
        Ok(())
    }

    fn handle_open_channel_blocking(
        &self,
        peer: &PeerIdentity,
        request: OpenChannel,
    ) -> Result<OpenAccept, ChannelError> {
        let (channel, reply) = Channel::accept_open(self.chain.as_ref(), &self.keys, peer, request)?;
        self.channel_store
            .put(peer, &channel.record)
            .map_err(|e| ChannelError::PeerError(e.to_string()))?;
        Ok(reply)
    }

    fn handle_update_anchor_blocking(
        &self,
        peer: &PeerIdentity,
        request: UpdateAnchor,
    ) -> Result<AnchorUpdateSig, ChannelError> {
        let record = self
            .channel_store
            .get(peer)
            .map_err(|e| ChannelError::PeerError(e.to_string()))?
            .ok_or(ChannelError::UnknownPeer)?;
        let mut channel = Channel::new(record, self.chain.as_ref(), &self.keys);
        let (reply, effects) = channel.accept_update_anchor(request)?;
        self.channel_store
            .put(peer, &channel.record)
            .map_err(|e| ChannelError::PeerError(e.to_string()))?;
        if effects.channel_opened {
            self.notify_channel_opened(peer);
        }
        Ok(reply)
    }

    fn handle_propose_update_blocking(
        &self,
        peer: &PeerIdentity,
        request: Update,
    ) -> Result<UpdateAccept, ChannelError> {
        let record = self
            .channel_store
            .get(peer)
            .map_err(|e| ChannelError::PeerError(e.to_string()))?
            .ok_or(ChannelError::UnknownPeer)?;
        let channel = Channel::new(record, self.chain.as_ref(), &self.keys);
        channel.accept_propose_update(request)
    }

    fn handle_receive_blocking(
        &self,
        peer: &PeerIdentity,
        request: UpdateSignature,
    ) -> Result<(), ChannelError> {
        let record = self
            .channel_store
            .get(peer)
            .map_err(|e| ChannelError::PeerError(e.to_string()))?
            .ok_or(ChannelError::UnknownPeer)?;
        let mut channel = Channel::new(record, self.chain.as_ref(), &self.keys);
        channel.accept_receive(request)?;
        self.channel_store
            .put(peer, &channel.record)
            .map_err(|e| ChannelError::PeerError(e.to_string()))?;
        Ok(())
    }

    fn handle_close_channel_blocking(
        &self,
        peer: &PeerIdentity,
        request: Close,
    ) -> Result<Close, ChannelError> {
        let record = self
            .channel_store
            .get(peer)
            .map_err(|e| ChannelError::PeerError(e.to_string()))?
            .ok_or(ChannelError::UnknownPeer)?;
        let channel = Channel::new(record, self.chain.as_ref(), &self.keys);
        let (reply, effects) = channel.accept_close(request)?;
        self.apply_effects(peer, effects)
            .map_err(|e| ChannelError::PeerError(e.to_string()))?;
        Ok(reply)
    }

    fn apply_effects(&self, peer: &PeerIdentity, effects: machine::Effects) -> Result<(), NodeError> {
        if let Some(tx) = effects.broadcast {
            debug!("broadcasting settlement transaction {} for {}", tx.txid(), peer);
        }
        if effects.delete_record {
            self.channel_store.delete(peer)?;
        }
        if effects.channel_opened {
            self.notify_channel_opened(peer);
        }
        Ok(())
    }

    fn notify_channel_opened(&self, peer: &PeerIdentity) {
        let router = Router::new(self.route_store.as_ref(), self.self_identity.clone(), self.forward_fee);
        let link = GossipLink::new(self.self_identity.clone());
        if let Err(err) = router.channel_opened(peer, &link) {
            warn!("failed to announce channel_opened({}) to the router: {}", peer, err);
        } else {
            info!("channel with {} reached normal", peer);
        }
    }
}
