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

//! Hex-string `serde` adaptors for the Bitcoin/secp256k1 types that cross
//! the peer-to-peer RPC wire (§6) but don't carry their own `serde` impls.
//! Kept separate from `channel::record`'s equivalents since the wire
//! packets and the persisted record evolve independently even though today
//! they happen to need the same encodings.

pub mod pubkey {
    use bitcoin_hashes::hex::{FromHex, ToHex};
    use secp256k1::PublicKey;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(key: &PublicKey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&key.serialize().to_hex())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PublicKey, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes: Vec<u8> = FromHex::from_hex(&s).map_err(serde::de::Error::custom)?;
        PublicKey::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}

pub mod signature {
    use bitcoin_hashes::hex::{FromHex, ToHex};
    use secp256k1::Signature;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(sig: &Signature, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&sig.serialize_der().to_vec().to_hex())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Signature, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes: Vec<u8> = FromHex::from_hex(&s).map_err(serde::de::Error::custom)?;
        Signature::from_der(&bytes).map_err(serde::de::Error::custom)
    }
}

pub mod script {
    use bitcoin::Script;
    use bitcoin_hashes::hex::{FromHex, ToHex};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(script: &Script, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&script.as_bytes().to_hex())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Script, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes: Vec<u8> = FromHex::from_hex(&s).map_err(serde::de::Error::custom)?;
        Ok(Script::from(bytes))
    }
}

pub mod transaction {
    use bitcoin::consensus::encode::{
        deserialize as consensus_deserialize, serialize as consensus_serialize,
    };
    use bitcoin::Transaction;
    use bitcoin_hashes::hex::{FromHex, ToHex};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(tx: &Transaction, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&consensus_serialize(tx).to_hex())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Transaction, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes: Vec<u8> = FromHex::from_hex(&s).map_err(serde::de::Error::custom)?;
        consensus_deserialize(&bytes).map_err(serde::de::Error::custom)
    }
}

pub mod txin {
    use bitcoin::consensus::encode::{
        deserialize as consensus_deserialize, serialize as consensus_serialize,
    };
    use bitcoin::TxIn;
    use bitcoin_hashes::hex::{FromHex, ToHex};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(txin: &TxIn, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&consensus_serialize(txin).to_hex())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TxIn, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes: Vec<u8> = FromHex::from_hex(&s).map_err(serde::de::Error::custom)?;
        consensus_deserialize(&bytes).map_err(serde::de::Error::custom)
    }
}
