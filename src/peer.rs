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

//! Peer identity: an opaque token naming a channel counterparty.
//!
//! The reference implementation uses the peer's own RPC base URL as its
//! identity. We keep that convention but never parse it beyond what routing
//! and display need: equality, ordering (for the worker hash partition) and
//! `Display`.

use std::borrow::Borrow;
use std::str::FromStr;

/// Opaque identity of a channel counterparty. In the reference this is the
/// base URL at which the peer's JSON-RPC server listens; we treat it as an
/// opaque token everywhere except when actually dialing out.
#[derive(
    Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display,
    StrictEncode, StrictDecode, serde::Serialize, serde::Deserialize,
)]
#[display(inner)]
pub struct PeerIdentity(String);

impl PeerIdentity {
    pub fn new(base_url: impl Into<String>) -> PeerIdentity {
        PeerIdentity(base_url.into())
    }

    /// The base URL peer RPC calls should be dialed against.
    pub fn as_url(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PeerIdentity {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl FromStr for PeerIdentity {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(PeerIdentity(s.to_owned()))
    }
}

impl From<String> for PeerIdentity {
    fn from(s: String) -> Self {
        PeerIdentity(s)
    }
}

impl From<&str> for PeerIdentity {
    fn from(s: &str) -> Self {
        PeerIdentity(s.to_owned())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_roundtrip() {
        let id = PeerIdentity::new("http://bob.example:9735");
        assert_eq!(id.to_string(), "http://bob.example:9735");
        assert_eq!(id.as_url(), "http://bob.example:9735");
    }

    #[test]
    fn equality_and_ordering_are_by_url() {
        let a = PeerIdentity::new("http://a");
        let b = PeerIdentity::new("http://b");
        assert_ne!(a, b);
        assert!(a < b);
        assert_eq!(a, PeerIdentity::new("http://a"));
    }
}
