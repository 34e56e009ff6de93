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

//! The persistent per-peer channel record (§3).

use bitcoin::{Script, Txid};
use secp256k1::{PublicKey, Signature};

use crate::anchor::AnchorPoint;
use crate::channel::state::State;
use crate::peer::PeerIdentity;

/// The persistent state of one bilateral channel.
///
/// `our_balance + their_balance` never exceeds the anchor's funded value;
/// the difference is fee reserved for settlement (§3). The struct carries
/// no encoding derives of its own — the store layer is responsible for
/// turning it into whatever the backing key-value store wants (§5 allows
/// "opaque blob"), so a plain `serde` round-trip is all it commits to.
#[derive(Clone, Debug, Getters, serde::Serialize, serde::Deserialize)]
pub struct ChannelRecord {
    peer: PeerIdentity,
    anchor_point: Option<AnchorPoint>,
    my_index: u8,
    #[serde(with = "sig_serde::option")]
    their_sig: Option<Signature>,
    #[serde(with = "script_serde")]
    anchor_redeem: Script,
    our_balance: u64,
    their_balance: u64,
    #[serde(with = "script_serde")]
    our_addr: Script,
    #[serde(with = "script_serde")]
    their_addr: Script,
    #[serde(with = "pubkey_serde")]
    their_pubkey: PublicKey,
    #[serde(with = "pubkey_serde")]
    my_pubkey: PublicKey,
    state: State,
    pending_cmd: Option<u64>,
}

impl ChannelRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        peer: PeerIdentity,
        my_index: u8,
        anchor_redeem: Script,
        our_balance: u64,
        their_balance: u64,
        our_addr: Script,
        their_addr: Script,
        their_pubkey: PublicKey,
        my_pubkey: PublicKey,
    ) -> ChannelRecord {
        assert!(my_index == 0 || my_index == 1, "my_index must be 0 or 1");
        ChannelRecord {
            peer,
            anchor_point: None,
            my_index,
            their_sig: None,
            anchor_redeem,
            our_balance,
            their_balance,
            our_addr,
            their_addr,
            their_pubkey,
            my_pubkey,
            state: State::Begin,
            pending_cmd: None,
        }
    }

    pub fn set_anchor_point(&mut self, txid: Txid, vout: u32) {
        self.anchor_point = Some(AnchorPoint::new(txid, vout));
    }

    pub fn set_their_sig(&mut self, sig: Signature) {
        self.their_sig = Some(sig);
    }

    pub fn set_state(&mut self, state: State) {
        self.state = state;
    }

    pub fn set_pending_cmd(&mut self, id: Option<u64>) {
        self.pending_cmd = id;
    }

    /// Applies a send of `amount` from our side to theirs; fails (without
    /// mutating) if it would drive our balance negative (§4.2 boundary
    /// rule, §8 boundary behaviors).
    pub fn apply_send(&mut self, amount: u64) -> Result<(), InsufficientBalance> {
        if amount > self.our_balance {
            return Err(InsufficientBalance {
                have: self.our_balance,
                requested: amount,
            });
        }
        self.our_balance -= amount;
        self.their_balance += amount;
        Ok(())
    }

    /// Applies a receive of `amount` credited to our side (the mirror of
    /// `apply_send` as seen from the recipient's ledger).
    pub fn apply_receive(&mut self, amount: u64) -> Result<(), InsufficientBalance> {
        if amount > self.their_balance {
            return Err(InsufficientBalance {
                have: self.their_balance,
                requested: amount,
            });
        }
        self.our_balance += amount;
        self.their_balance -= amount;
        Ok(())
    }

    /// The anchor redeem script's key at slot 0: ours if we're
    /// `my_index == 0`, theirs otherwise.
    pub fn pubkey_at_index0(&self) -> PublicKey {
        if self.my_index == 0 { self.my_pubkey } else { self.their_pubkey }
    }

    /// The anchor redeem script's key at slot 1, the complement of
    /// [`ChannelRecord::pubkey_at_index0`].
    pub fn pubkey_at_index1(&self) -> PublicKey {
        if self.my_index == 0 { self.their_pubkey } else { self.my_pubkey }
    }
}

#[derive(Clone, Copy, Eq, PartialEq, Debug, Display, Error)]
#[display("not enough money: have {have} but {requested} was requested")]
pub struct InsufficientBalance {
    pub have: u64,
    pub requested: u64,
}

mod pubkey_serde {
    use bitcoin_hashes::hex::{FromHex, ToHex};
    use secp256k1::PublicKey;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        key: &PublicKey,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&key.serialize().to_hex())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<PublicKey, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes: Vec<u8> = FromHex::from_hex(&s).map_err(serde::de::Error::custom)?;
        PublicKey::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}

mod sig_serde {
    pub mod option {
        use bitcoin_hashes::hex::{FromHex, ToHex};
        use secp256k1::Signature;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            sig: &Option<Signature>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match sig {
                Some(sig) => {
                    serializer.serialize_some(&sig.serialize_der().to_vec().to_hex())
                }
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Signature>, D::Error> {
            let s: Option<String> = Option::deserialize(deserializer)?;
            match s {
                Some(s) => {
                    let bytes: Vec<u8> =
                        FromHex::from_hex(&s).map_err(serde::de::Error::custom)?;
                    Signature::from_der(&bytes)
                        .map(Some)
                        .map_err(serde::de::Error::custom)
                }
                None => Ok(None),
            }
        }
    }
}

mod script_serde {
    use bitcoin::Script;
    use bitcoin_hashes::hex::{FromHex, ToHex};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        script: &Script,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&script.as_bytes().to_hex())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Script, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes: Vec<u8> = FromHex::from_hex(&s).map_err(serde::de::Error::custom)?;
        Ok(Script::from(bytes))
    }
}
