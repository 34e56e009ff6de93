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

//! Node-level secp256k1 key material.
//!
//! The node has exactly one long-lived secret, used as the per-channel anchor
//! key (§3 of the spec: "the node has one long-lived secret used for all
//! channel anchors it participates in"). Individual channels never derive or
//! store their own secret; they only remember the two public keys that went
//! into the anchor redeem script.

use lazy_static::lazy_static;
use secp256k1::{PublicKey, Secp256k1, SecretKey};

lazy_static! {
    /// Shared secp256k1 context, used everywhere signatures are produced or
    /// verified so we only pay the (re)randomization cost once per process.
    pub static ref SECP256K1: Secp256k1<secp256k1::All> = Secp256k1::new();
}

/// The node's long-lived anchor keypair. Read-only after construction: §5 of
/// the spec requires the secret to be treated as read-only after process
/// start.
#[derive(Clone)]
pub struct NodeKeys {
    secret: SecretKey,
    public: PublicKey,
}

impl NodeKeys {
    pub fn new(secret: SecretKey) -> NodeKeys {
        let public = PublicKey::from_secret_key(&SECP256K1, &secret);
        NodeKeys { secret, public }
    }

    /// Generates a fresh random keypair; used by tests and `paychand init`.
    pub fn generate() -> NodeKeys {
        let mut rng = secp256k1::rand::thread_rng();
        let (secret, public) = SECP256K1.generate_keypair(&mut rng);
        NodeKeys { secret, public }
    }

    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    pub fn public(&self) -> PublicKey {
        self.public
    }
}
