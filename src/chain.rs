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

//! The chain adapter interface (§6): UTXO selection, signing of inputs we
//! own, broadcast, and the two local script/crypto primitives (`sighash`,
//! `verify_script`) that the signing core depends on.
//!
//! The adapter itself is explicitly out of scope (§1): this module defines
//! only the boundary trait plus a single `BitcoindAdapter` that talks to a
//! real node's wallet RPC for the UTXO-touching calls. The in-memory
//! `mock` adapter used by tests and by `paychand`'s demo mode lives
//! alongside it.

use bitcoin::{Address, PublicKey, Script, Transaction};
use secp256k1::{Message, SecretKey, Signature};

use crate::keys::SECP256K1;
use crate::rpc::client::{RpcClient, RpcError};

pub mod mock;

/// A single unspent output as reported by `list_unspent`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Utxo {
    #[serde(with = "crate::hexser::txin")]
    pub txin: bitcoin::TxIn,
    pub value: u64,
}

#[derive(Clone, Eq, PartialEq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum ChainError {
    /// not enough money: wallet holds {available} but {requested} was
    /// requested
    InsufficientFunds { available: u64, requested: u64 },

    /// chain adapter RPC failed: {0}
    #[from]
    Rpc(RpcError),

    /// the chain node reported the signed transaction as incomplete
    IncompleteSignature,

    /// broadcast of transaction {0} was rejected by the chain node
    BroadcastRejected(bitcoin::Txid),
}

/// External collaborator interface (§6) this crate consumes but does not
/// implement: UTXO selection, signing of our own inputs, broadcast, and the
/// two pure script/crypto primitives the signing core needs.
pub trait ChainAdapter: Send + Sync {
    /// Selects UTXOs whose total value is at least `amount`, returning the
    /// inputs to use and a change output sending the remainder back to a
    /// fresh wallet address. Fails with `InsufficientFunds` before any
    /// network activity if the wallet cannot possibly cover `amount`.
    fn select_coins(
        &self,
        amount: u64,
    ) -> Result<(Vec<Utxo>, bitcoin::TxOut), ChainError>;

    /// Issues a fresh on-chain address for receiving a payout.
    fn get_new_address(&self) -> Result<Address, ChainError>;

    /// Issues a fresh anchor public key.
    fn get_new_pubkey(&self) -> Result<PublicKey, ChainError>;

    /// Signs every input of `tx` that the wallet can sign (i.e. every input
    /// it selected via `select_coins`), returning the partially- or
    /// fully-signed transaction and whether signing is complete.
    fn sign_raw_transaction(
        &self,
        tx: Transaction,
    ) -> Result<(Transaction, bool), ChainError>;

    /// Broadcasts a fully-signed transaction.
    fn send_raw_transaction(
        &self,
        tx: &Transaction,
    ) -> Result<bitcoin::Txid, ChainError>;

    /// Computes the legacy (pre-segwit) all-inputs/all-outputs
    /// signature-hash of `tx` at `input_index`, spending `redeem`. This must
    /// be byte-identical to the chain's own hashing convention (§4.1).
    fn sighash(
        &self,
        redeem: &Script,
        tx: &Transaction,
        input_index: usize,
        sighash_type: u32,
    ) -> Message {
        legacy_sighash(tx, redeem, input_index, sighash_type)
    }

    /// Verifies `script_sig` against `script_pubkey` for the given input of
    /// `tx` under the chain's standard script-verification rules.
    fn verify_script(
        &self,
        script_sig: &Script,
        script_pubkey: &Script,
        tx: &Transaction,
        input_index: usize,
    ) -> Result<(), ChainError> {
        legacy_verify_script(script_sig, script_pubkey, tx, input_index)
    }

    /// Raw ECDSA sign: `sign(seckey, sighash)`.
    fn sign(&self, seckey: &SecretKey, sighash: &Message) -> Signature {
        SECP256K1.sign(sighash, seckey)
    }
}

/// Computes the legacy sighash shared by every concrete adapter, so a real
/// adapter only has to implement the wallet-touching RPCs.
fn legacy_sighash(
    tx: &Transaction,
    redeem: &Script,
    input_index: usize,
    sighash_type: u32,
) -> Message {
    let hash = tx.signature_hash(input_index, redeem, sighash_type);
    Message::from_slice(&hash[..]).expect("SigHash is always 32 bytes")
}

/// Structural script check shared by every concrete adapter: the assembled
/// scriptSig's embedded redeem script must actually hash (via P2SH) to the
/// expected scriptPubkey. Full script execution against the real UTXO set is
/// delegated to the chain node at broadcast time either way.
fn legacy_verify_script(
    script_sig: &Script,
    script_pubkey: &Script,
    _tx: &Transaction,
    _input_index: usize,
) -> Result<(), ChainError> {
    let redeem = extract_redeem(script_sig)?;
    let computed =
        crate::anchor::anchor_address(&redeem, bitcoin::Network::Bitcoin)
            .script_pubkey();
    if &computed == script_pubkey {
        Ok(())
    } else {
        Err(ChainError::IncompleteSignature)
    }
}

fn extract_redeem(script_sig: &Script) -> Result<Script, ChainError> {
    let mut last = None;
    for instr in script_sig.instructions() {
        match instr {
            Ok(instr) => last = Some(instr),
            Err(_) => return Err(ChainError::IncompleteSignature),
        }
    }
    match last {
        Some(bitcoin::blockdata::script::Instruction::PushBytes(bytes)) => {
            Ok(Script::from(bytes.to_vec()))
        }
        _ => Err(ChainError::IncompleteSignature),
    }
}

/// Chain adapter backed by a real node's JSON-RPC wallet, reached through the
/// same small HTTP client used for outbound peer calls (§10: "a small
/// `ureq`-based JSON-RPC client mirroring ... `jsonrpcproxy.Proxy`").
pub struct BitcoindAdapter {
    rpc: RpcClient,
}

impl BitcoindAdapter {
    pub fn new(rpc: RpcClient) -> BitcoindAdapter {
        BitcoindAdapter { rpc }
    }
}

impl ChainAdapter for BitcoindAdapter {
    fn select_coins(
        &self,
        amount: u64,
    ) -> Result<(Vec<Utxo>, bitcoin::TxOut), ChainError> {
        let unspent: Vec<serde_json::Value> =
            self.rpc.call("listunspent", serde_json::json!([]))?;
        let mut selected = Vec::new();
        let mut total = 0u64;
        for entry in unspent {
            let spendable = entry
                .get("spendable")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            if !spendable {
                continue;
            }
            let value_btc =
                entry.get("amount").and_then(|v| v.as_f64()).unwrap_or(0.0);
            let value = (value_btc * 100_000_000.0).round() as u64;
            let txid: bitcoin::Txid = entry
                .get("txid")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse().ok())
                .ok_or(ChainError::IncompleteSignature)?;
            let vout =
                entry.get("vout").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
            selected.push(Utxo {
                txin: bitcoin::TxIn {
                    previous_output: bitcoin::OutPoint::new(txid, vout),
                    script_sig: Script::new(),
                    sequence: 0xFFFF_FFFF,
                    witness: vec![],
                },
                value,
            });
            total += value;
            if total >= amount {
                break;
            }
        }
        if total < amount {
            return Err(ChainError::InsufficientFunds {
                available: total,
                requested: amount,
            });
        }
        let change_addr = self.get_new_address()?;
        let change = bitcoin::TxOut {
            value: total - amount,
            script_pubkey: change_addr.script_pubkey(),
        };
        Ok((selected, change))
    }

    fn get_new_address(&self) -> Result<Address, ChainError> {
        let addr: String =
            self.rpc.call("getnewaddress", serde_json::json!([]))?;
        addr.parse().map_err(|_| ChainError::IncompleteSignature)
    }

    fn get_new_pubkey(&self) -> Result<PublicKey, ChainError> {
        let addr = self.get_new_address()?;
        let info: serde_json::Value = self
            .rpc
            .call("validateaddress", serde_json::json!([addr.to_string()]))?;
        let pubkey_hex = info
            .get("pubkey")
            .and_then(|v| v.as_str())
            .ok_or(ChainError::IncompleteSignature)?;
        pubkey_hex.parse().map_err(|_| ChainError::IncompleteSignature)
    }

    fn sign_raw_transaction(
        &self,
        tx: Transaction,
    ) -> Result<(Transaction, bool), ChainError> {
        let raw = bitcoin::consensus::encode::serialize_hex(&tx);
        let result: serde_json::Value = self
            .rpc
            .call("signrawtransactionwithwallet", serde_json::json!([raw]))?;
        let complete = result
            .get("complete")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let hex = result
            .get("hex")
            .and_then(|v| v.as_str())
            .ok_or(ChainError::IncompleteSignature)?;
        let bytes: Vec<u8> = bitcoin_hashes::hex::FromHex::from_hex(hex)
            .map_err(|_| ChainError::IncompleteSignature)?;
        let signed: Transaction =
            bitcoin::consensus::encode::deserialize(&bytes)
                .map_err(|_| ChainError::IncompleteSignature)?;
        Ok((signed, complete))
    }

    fn send_raw_transaction(
        &self,
        tx: &Transaction,
    ) -> Result<bitcoin::Txid, ChainError> {
        let raw = bitcoin::consensus::encode::serialize_hex(tx);
        let txid: String =
            self.rpc.call("sendrawtransaction", serde_json::json!([raw]))?;
        txid.parse().map_err(|_| ChainError::BroadcastRejected(tx.txid()))
    }
}
