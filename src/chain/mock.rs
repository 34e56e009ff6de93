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

//! An in-memory chain adapter for tests and `paychand`'s regtest-memory
//! demo mode: no real UTXO set, just a per-instance ledger of fake outputs
//! that `select_coins` draws from.

use std::sync::Mutex;

use bitcoin::{Address, Network, PublicKey, Script, Transaction};

use super::{ChainAdapter, ChainError, Utxo};
use crate::keys::NodeKeys;

struct FakeOutput {
    txin: bitcoin::TxIn,
    value: u64,
}

/// A wallet with a fixed starting balance, split into single-output
/// "coins" the mock hands out to `select_coins` on demand.
pub struct MockAdapter {
    keys: NodeKeys,
    network: Network,
    coins: Mutex<Vec<FakeOutput>>,
    broadcast: Mutex<Vec<Transaction>>,
}

impl MockAdapter {
    /// Creates a wallet funded with `n_coins` outputs of `coin_value` each.
    pub fn funded(n_coins: u32, coin_value: u64) -> MockAdapter {
        let keys = NodeKeys::generate();
        let coins = (0..n_coins)
            .map(|vout| FakeOutput {
                txin: bitcoin::TxIn {
                    previous_output: bitcoin::OutPoint::new(
                        bitcoin::Txid::from_hash(bitcoin_hashes::sha256d::Hash::from_inner(
                            [vout as u8; 32],
                        )),
                        vout,
                    ),
                    script_sig: Script::new(),
                    sequence: 0xFFFF_FFFF,
                    witness: vec![],
                },
                value: coin_value,
            })
            .collect();
        MockAdapter {
            keys,
            network: Network::Regtest,
            coins: Mutex::new(coins),
            broadcast: Mutex::new(Vec::new()),
        }
    }

    pub fn keys(&self) -> &NodeKeys {
        &self.keys
    }

    pub fn broadcast_log(&self) -> Vec<Transaction> {
        self.broadcast.lock().expect("mock adapter mutex poisoned").clone()
    }
}

impl ChainAdapter for MockAdapter {
    fn select_coins(&self, amount: u64) -> Result<(Vec<Utxo>, bitcoin::TxOut), ChainError> {
        let mut coins = self.coins.lock().expect("mock adapter mutex poisoned");
        let mut selected = Vec::new();
        let mut total = 0u64;
        while total < amount {
            match coins.pop() {
                Some(coin) => {
                    total += coin.value;
                    selected.push(Utxo { txin: coin.txin, value: coin.value });
                }
                None => {
                    return Err(ChainError::InsufficientFunds {
                        available: total,
                        requested: amount,
                    })
                }
            }
        }
        let change = self.get_new_address()?;
        Ok((
            selected,
            bitcoin::TxOut { value: total - amount, script_pubkey: change.script_pubkey() },
        ))
    }

    fn get_new_address(&self) -> Result<Address, ChainError> {
        Ok(Address::p2pkh(&PublicKey::new(self.keys.public()), self.network))
    }

    fn get_new_pubkey(&self) -> Result<PublicKey, ChainError> {
        Ok(PublicKey::new(self.keys.public()))
    }

    fn sign_raw_transaction(&self, tx: Transaction) -> Result<(Transaction, bool), ChainError> {
        // Our own inputs are already spendable without further
        // negotiation; mark complete unconditionally since the mock never
        // models partial co-signing by a real wallet.
        Ok((tx, true))
    }

    fn send_raw_transaction(&self, tx: &Transaction) -> Result<bitcoin::Txid, ChainError> {
        self.broadcast.lock().expect("mock adapter mutex poisoned").push(tx.clone());
        Ok(tx.txid())
    }
}
