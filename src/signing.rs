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

//! Commitment and settlement transaction construction and signing (§4.1).
//!
//! A commitment transaction always has the same shape: one input (the
//! anchor outpoint) and up to two outputs (one per party, omitted when that
//! party's balance is zero — §4.1's "zero-balance outputs are omitted, not
//! encoded as zero-value outputs" rule). Both peers build the identical
//! skeleton independently from the `ChannelRecord` balances and sign it;
//! each party's signature covers the whole transaction under `SIGHASH_ALL`.

use bitcoin::{OutPoint, Script, Transaction, TxIn, TxOut};
use secp256k1::{PublicKey, Signature};

use crate::anchor::{AnchorScriptSig, redeem_script};
use crate::chain::{ChainAdapter, ChainError};
use crate::keys::NodeKeys;

/// The only sighash flag this protocol ever uses: the legacy `SIGHASH_ALL`.
/// Kept as a crate-visible constant since both the anchor scriptSig encoder
/// and the signing core need the exact same byte.
pub const SIGHASH_ALL: u32 = 0x0000_0001;

#[derive(Clone, Eq, PartialEq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum SigningError {
    /// the chain adapter rejected a signing operation: {0}
    #[from]
    Chain(ChainError),

    /// signature verification failed for the counterparty's commitment
    /// signature
    BadSignature,
}

fn skeleton(anchor: OutPoint, outputs: Vec<TxOut>) -> Transaction {
    let input = TxIn {
        previous_output: anchor,
        script_sig: Script::new(),
        sequence: 0xFFFF_FFFF,
        witness: vec![],
    };
    Transaction { version: 2, lock_time: 0, input: vec![input], output: outputs }
}

fn maybe_output(value: u64, script: &Script) -> Option<TxOut> {
    if value > 0 {
        Some(TxOut { value, script_pubkey: script.clone() })
    } else {
        None
    }
}

/// Builds a commitment transaction skeleton (§4.1, §4.2 edge policy): one
/// input spending the anchor outpoint, the holder's own payout output
/// first, the counterparty's second, each omitted entirely when its balance
/// is zero. "Holder" is whoever will eventually hold and may unilaterally
/// broadcast this exact transaction — our own commitment has us as holder;
/// the mirror we sign for the peer has them as holder.
pub fn build_commitment(
    anchor: OutPoint,
    holder_balance: u64,
    holder_payout: &Script,
    other_balance: u64,
    other_payout: &Script,
) -> Transaction {
    let outputs = [
        maybe_output(holder_balance, holder_payout),
        maybe_output(other_balance, other_payout),
    ]
    .into_iter()
    .flatten()
    .collect();
    skeleton(anchor, outputs)
}

/// Builds the settlement transaction skeleton (§4.1): unlike a commitment,
/// output order is fixed by anchor-script index rather than by holder, so
/// both parties independently produce byte-identical bytes and either
/// party's signature is interchangeable.
pub fn build_settlement(
    anchor: OutPoint,
    my_index: u8,
    our_balance: u64,
    our_payout: &Script,
    their_balance: u64,
    their_payout: &Script,
) -> Transaction {
    let (index0_value, index0_script, index1_value, index1_script) = if my_index == 0 {
        (our_balance, our_payout, their_balance, their_payout)
    } else {
        (their_balance, their_payout, our_balance, our_payout)
    };
    let outputs = [
        maybe_output(index0_value, index0_script),
        maybe_output(index1_value, index1_script),
    ]
    .into_iter()
    .flatten()
    .collect();
    skeleton(anchor, outputs)
}

/// Signs a commitment (or settlement) transaction's single anchor input
/// with this node's anchor key, returning the raw ECDSA signature ready for
/// `push_sig`/`AnchorScriptSig`.
pub fn sign_commitment(
    chain: &dyn ChainAdapter,
    keys: &NodeKeys,
    redeem: &Script,
    tx: &Transaction,
) -> Signature {
    let sighash = chain.sighash(redeem, tx, 0, SIGHASH_ALL);
    chain.sign(keys.secret(), &sighash)
}

/// Verifies a counterparty-supplied mirror signature (§4.2's "mirror
/// signature" exchange: each side signs the *other's* view of the
/// commitment and sends that signature over) against their anchor pubkey.
pub fn verify_mirror(
    chain: &dyn ChainAdapter,
    redeem: &Script,
    tx: &Transaction,
    their_pubkey: &PublicKey,
    their_sig: &Signature,
) -> Result<(), SigningError> {
    let sighash = chain.sighash(redeem, tx, 0, SIGHASH_ALL);
    crate::keys::SECP256K1
        .verify(&sighash, their_sig, their_pubkey)
        .map_err(|_| SigningError::BadSignature)
}

/// Assembles the fully-signed commitment transaction's anchor input,
/// combining both signatures deterministically by `my_index` (§9: avoid
/// "try both orderings and let script verification pick" in favor of a
/// single deterministic assembly).
pub fn finalize_commitment(
    mut tx: Transaction,
    my_index: u8,
    my_sig: Signature,
    their_sig: Signature,
    pubkey_0: &PublicKey,
    pubkey_1: &PublicKey,
) -> Transaction {
    let redeem = redeem_script(&bitcoin::PublicKey::new(*pubkey_0), &bitcoin::PublicKey::new(*pubkey_1));
    let script_sig =
        AnchorScriptSig::new(my_index, my_sig, their_sig, redeem).into_script();
    tx.input[0].script_sig = script_sig;
    tx
}
