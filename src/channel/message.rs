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

//! The channel state machine's input alphabet (§4.2): local commands and
//! peer-wire packets, each an explicit variant rather than a name-keyed
//! dispatch table.
//!
//! Several of these travel as the *return value* of a synchronous JSON-RPC
//! call rather than as an independently dispatched message — §6 specifies
//! the peer wire protocol as request/response RPCs, so e.g. `pkt_open_accept`
//! is simply what `channel.open_channel` returns to its caller. The variant
//! still gets its own name here because the state machine treats it as a
//! distinct input to a distinct transition.

use bitcoin::{Script, Transaction, Txid};
use secp256k1::{PublicKey, Signature};

use crate::chain::Utxo;
use crate::peer::PeerIdentity;

/// A command issued by the local user, addressed to one peer's channel.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum Command {
    /// `cmd_open(m, t, fee)`: open a channel sending `our_amount` and
    /// `their_amount` to the named peer, paying `fee` in reserved on-chain
    /// fee.
    Open { peer: PeerIdentity, our_amount: u64, their_amount: u64, fee: u64 },
    /// `cmd_send(x)`: pay `amount` to the peer over the existing channel.
    Send { peer: PeerIdentity, amount: u64 },
    /// `cmd_close`: cooperatively close the channel with the peer.
    Close { peer: PeerIdentity },
}

/// `pkt_open_channel`: the originator's open request, addressed to the
/// responder. Field names are from the sender's point of view.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct OpenChannel {
    pub sender_amount: u64,
    pub receiver_amount: u64,
    pub fee: u64,
    pub sender_coins: Vec<Utxo>,
    #[serde(with = "crate::hexser::script")]
    pub sender_change: Script,
    #[serde(with = "crate::hexser::pubkey")]
    pub sender_pubkey: PublicKey,
    #[serde(with = "crate::hexser::script")]
    pub sender_addr: Script,
}

/// `pkt_open_accept`: the responder's reply, returned directly as the
/// result of the `open_channel` call.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct OpenAccept {
    #[serde(with = "crate::hexser::transaction")]
    pub anchor_tx: Transaction,
    #[serde(with = "crate::hexser::script")]
    pub redeem: Script,
    #[serde(with = "crate::hexser::script")]
    pub receiver_addr: Script,
    #[serde(with = "crate::hexser::pubkey")]
    pub receiver_pubkey: PublicKey,
}

/// `pkt_update_anchor`: the originator informs the responder which txid the
/// anchor confirmed under and hands over its mirror signature.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct UpdateAnchor {
    pub anchor_txid: Txid,
    #[serde(with = "crate::hexser::signature")]
    pub mirror_sig: Signature,
}

/// `pkt_anchor_update_sig`: the responder's mirror signature, returned
/// directly as the result of the `update_anchor` call.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct AnchorUpdateSig {
    #[serde(with = "crate::hexser::signature")]
    pub mirror_sig: Signature,
}

/// `pkt_update`: propose a balance shift of `amount` towards the caller.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct Update {
    pub amount: u64,
}

/// `pkt_update_accept`: the receiver's mirror signature over the proposed
/// new balances, returned directly as the result of `propose_update`.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct UpdateAccept {
    pub amount: u64,
    #[serde(with = "crate::hexser::signature")]
    pub mirror_sig: Signature,
}

/// `pkt_update_signature`: the sender's confirmation signature, carried as
/// the params of the `receive` call that completes the update.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct UpdateSignature {
    pub amount: u64,
    #[serde(with = "crate::hexser::signature")]
    pub mirror_sig: Signature,
}

/// `pkt_close`: a cooperative close request carrying the initiator's
/// settlement signature.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct Close {
    #[serde(with = "crate::hexser::signature")]
    pub settlement_sig: Signature,
}

/// `pkt_error`: the peer hit a fatal condition; carries a human-readable
/// reason only.
#[derive(Clone, Debug, Display, serde::Serialize, serde::Deserialize)]
#[display("{reason}")]
pub struct PeerError {
    pub reason: String,
}
