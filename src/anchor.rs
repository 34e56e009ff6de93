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

//! The two-of-two anchor output backing a channel, and the structured form
//! of its input script-signature.
//!
//! §9 of the spec calls for keeping the anchor input script-signature as a
//! structured value (`{ my_index, their_sig, redeem }`) threaded alongside
//! the transaction skeleton, rather than mutating a placeholder script in
//! place, and for assembling deterministically from `my_index` rather than
//! trying both signature orderings and relying on script verification to
//! pick the valid one.

use bitcoin::blockdata::opcodes::all::OP_CHECKMULTISIG;
use bitcoin::blockdata::script::Builder;
use bitcoin::{Address, Network, OutPoint, PublicKey, Script, Txid};
use secp256k1::Signature;

/// The (txid, output index) pair identifying an anchor output on chain.
#[derive(
    Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display,
    StrictEncode, StrictDecode, serde::Serialize, serde::Deserialize,
)]
#[display("{txid}:{vout}")]
pub struct AnchorPoint {
    pub txid: Txid,
    pub vout: u32,
}

impl AnchorPoint {
    pub fn new(txid: Txid, vout: u32) -> AnchorPoint {
        AnchorPoint { txid, vout }
    }

    pub fn as_outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid, self.vout)
    }
}

/// Builds the two-of-two multisig redeem script `2 <pk0> <pk1> 2
/// CHECKMULTISIG`, with keys ordered as given by the caller.
///
/// The caller is responsible for passing keys in the fixed order that
/// defines each party's `my_index`; this function never reorders them.
pub fn redeem_script(pubkey_0: &PublicKey, pubkey_1: &PublicKey) -> Script {
    Builder::new()
        .push_int(2)
        .push_key(pubkey_0)
        .push_key(pubkey_1)
        .push_int(2)
        .push_opcode(OP_CHECKMULTISIG)
        .into_script()
}

/// Pay-to-script-hash address for the given redeem script.
pub fn anchor_address(redeem: &Script, network: Network) -> Address {
    Address::p2sh(redeem, network)
        .expect("a 2-of-2 multisig redeem script is always embeddable in P2SH")
}

/// The structured form of the anchor input's script-signature: the two ECDSA
/// signatures plus the redeem script, kept separately from the transaction
/// they spend so callers can inspect/verify pieces before rendering.
///
/// `my_index` records which of the two redeem-script key slots belongs to
/// this node; either side can therefore assemble a byte-identical script by
/// always emitting `[OP_0, sig_at_index_0, sig_at_index_1, redeem]`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AnchorScriptSig {
    pub my_index: u8,
    pub my_sig: Signature,
    pub their_sig: Signature,
    pub redeem: Script,
}

impl AnchorScriptSig {
    pub fn new(
        my_index: u8,
        my_sig: Signature,
        their_sig: Signature,
        redeem: Script,
    ) -> AnchorScriptSig {
        assert!(my_index == 0 || my_index == 1, "my_index must be 0 or 1");
        AnchorScriptSig {
            my_index,
            my_sig,
            their_sig,
            redeem,
        }
    }

    fn sig_at(&self, index: u8) -> &Signature {
        if index == self.my_index {
            &self.my_sig
        } else {
            &self.their_sig
        }
    }

    /// Renders the final `scriptSig`: `OP_0 sig_at_index_0 sig_at_index_1
    /// redeem`. `OP_0` is the well-known CHECKMULTISIG off-by-one dummy
    /// element, not a placeholder that needs later substitution.
    pub fn into_script(self) -> Script {
        let sig0 = push_sig(self.sig_at(0));
        let sig1 = push_sig(self.sig_at(1));
        Builder::new()
            .push_int(0)
            .push_slice(&sig0)
            .push_slice(&sig1)
            .push_slice(self.redeem.as_bytes())
            .into_script()
    }
}

/// DER-encodes a signature and appends the SIGHASH_ALL flag byte, as
/// required by both the commitment-signing contract (§4.1) and by
/// CHECKMULTISIG's input format.
pub fn push_sig(sig: &Signature) -> Vec<u8> {
    let mut bytes = sig.serialize_der().to_vec();
    bytes.push(crate::signing::SIGHASH_ALL as u8);
    bytes
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::keys::NodeKeys;

    fn dumb_sig(byte: u8) -> Signature {
        let keys = NodeKeys::generate();
        let msg = secp256k1::Message::from_slice(&[byte; 32]).unwrap();
        crate::keys::SECP256K1.sign(&msg, keys.secret())
    }

    #[test]
    fn assembly_swaps_slots_by_index() {
        let k0 = NodeKeys::generate();
        let k1 = NodeKeys::generate();
        let redeem = redeem_script(
            &PublicKey::new(k0.public()),
            &PublicKey::new(k1.public()),
        );
        let my_sig = dumb_sig(1);
        let their_sig = dumb_sig(2);

        let as_index0 = AnchorScriptSig::new(
            0,
            my_sig,
            their_sig,
            redeem.clone(),
        )
        .into_script();
        let as_index1 = AnchorScriptSig::new(
            1,
            my_sig,
            their_sig,
            redeem,
        )
        .into_script();

        // Same two signature bytestrings appear, but in swapped slot order.
        assert_ne!(as_index0, as_index1);
    }
}
