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

//! The per-channel state machine (§4.2): [`record`] holds the persistent
//! data, [`state`] and [`message`] define the tagged-sum input alphabet,
//! [`machine`] implements each transition, and [`Channel`] is the facade
//! the node's per-peer worker drives.

pub mod error;
pub mod machine;
pub mod message;
pub mod record;
pub mod state;

use bitcoin::OutPoint;

pub use error::ChannelError;
pub use record::ChannelRecord;
pub use state::State;

use crate::chain::ChainAdapter;
use crate::keys::NodeKeys;
use crate::peer::PeerIdentity;
use message::*;

/// Binds a loaded [`ChannelRecord`] to the collaborators its transitions
/// need, so a worker can drive one channel's protocol without threading
/// `chain`/`keys` through every call by hand.
pub struct Channel<'a> {
    pub record: ChannelRecord,
    chain: &'a dyn ChainAdapter,
    keys: &'a NodeKeys,
}

impl<'a> Channel<'a> {
    pub fn new(record: ChannelRecord, chain: &'a dyn ChainAdapter, keys: &'a NodeKeys) -> Self {
        Channel { record, chain, keys }
    }

    fn anchor_point(&self) -> Result<OutPoint, ChannelError> {
        self.record
            .anchor_point()
            .as_ref()
            .map(|p| p.as_outpoint())
            .ok_or(ChannelError::UnknownPeer)
    }

    /// `cmd_open`, originator side (A1+A2+A3 per §4.2).
    pub fn open(
        chain: &'a dyn ChainAdapter,
        keys: &'a NodeKeys,
        peer: &PeerIdentity,
        our_amount: u64,
        their_amount: u64,
        fee: u64,
        call_open: impl FnOnce(OpenChannel) -> Result<OpenAccept, ChannelError>,
        call_update_anchor: impl FnOnce(UpdateAnchor) -> Result<AnchorUpdateSig, ChannelError>,
    ) -> Result<(Channel<'a>, machine::Effects), ChannelError> {
        let (record, effects) = machine::originate_open(
            chain,
            keys,
            peer,
            our_amount,
            their_amount,
            fee,
            call_open,
            call_update_anchor,
        )?;
        Ok((Channel::new(record, chain, keys), effects))
    }

    /// Inbound `open_channel`, responder side (B1).
    pub fn accept_open(
        chain: &'a dyn ChainAdapter,
        keys: &'a NodeKeys,
        peer: &PeerIdentity,
        request: OpenChannel,
    ) -> Result<(Channel<'a>, OpenAccept), ChannelError> {
        let (record, reply) = machine::respond_open_channel(chain, keys, peer, request)?;
        Ok((Channel::new(record, chain, keys), reply))
    }

    /// Inbound `update_anchor`, responder side (B2).
    pub fn accept_update_anchor(
        &mut self,
        request: UpdateAnchor,
    ) -> Result<(AnchorUpdateSig, machine::Effects), ChannelError> {
        machine::respond_update_anchor(self.chain, self.keys, &mut self.record, request)
    }

    /// `cmd_send`, sender side (S1+S3+S4).
    pub fn send(
        &mut self,
        amount: u64,
        call_propose: impl FnOnce(Update) -> Result<UpdateAccept, ChannelError>,
        call_receive: impl FnOnce(UpdateSignature) -> Result<(), ChannelError>,
    ) -> Result<(), ChannelError> {
        let anchor_point = self.anchor_point()?;
        machine::originate_send(
            self.chain,
            self.keys,
            &mut self.record,
            anchor_point,
            amount,
            call_propose,
            call_receive,
        )
    }

    /// Inbound `propose_update`, receiver side (S2, never persists).
    pub fn accept_propose_update(
        &self,
        request: Update,
    ) -> Result<UpdateAccept, ChannelError> {
        let anchor_point = self.anchor_point()?;
        machine::respond_propose_update(self.chain, self.keys, &self.record, anchor_point, request)
    }

    /// Inbound `receive`, receiver side (S4, commits the balance change).
    pub fn accept_receive(&mut self, request: UpdateSignature) -> Result<(), ChannelError> {
        let anchor_point = self.anchor_point()?;
        machine::respond_receive(self.chain, &mut self.record, anchor_point, request)
    }

    /// `cmd_close`, initiator side (C1+C3).
    pub fn close(
        &self,
        call_close: impl FnOnce(Close) -> Result<Close, ChannelError>,
    ) -> Result<machine::Effects, ChannelError> {
        let anchor_point = self.anchor_point()?;
        machine::originate_close(self.chain, self.keys, &self.record, anchor_point, call_close)
    }

    /// Inbound `close_channel`, acceptor side (C2).
    pub fn accept_close(
        &self,
        request: Close,
    ) -> Result<(Close, machine::Effects), ChannelError> {
        let anchor_point = self.anchor_point()?;
        machine::respond_close_channel(self.chain, self.keys, &self.record, anchor_point, request)
    }

    /// `get_commitment_transactions`: a fully signed, script-verified
    /// unilateral-close transaction usable without peer cooperation.
    pub fn commitment_transaction(&self) -> Result<bitcoin::Transaction, ChannelError> {
        let anchor_point = self.anchor_point()?;
        machine::finish_our_commitment(self.chain, self.keys, &self.record, anchor_point)
    }
}
