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

//! Persistent storage interfaces (§5, §6): the channel store and the route
//! store. Both require only per-key atomic read-modify-write — "the
//! reference uses a single-writer key-value store per process, acceptable
//! because each peer is single-writer."

pub mod memory;
pub mod sled_store;

use crate::channel::ChannelRecord;
use crate::peer::PeerIdentity;
use crate::router::table::{PeerRow, RouteRow};

#[derive(Clone, Eq, PartialEq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum StoreError {
    /// underlying storage engine failed: {0}
    Backend(String),

    /// no channel record exists for peer {0}
    NoSuchChannel(PeerIdentity),
}

/// Persistent mapping from peer identity to channel record (§2's "Channel
/// store"). `modify` is the one operation every transition needs: atomic
/// read-modify-write keyed by peer.
pub trait ChannelStore: Send + Sync {
    fn get(&self, peer: &PeerIdentity) -> Result<Option<ChannelRecord>, StoreError>;

    fn put(&self, peer: &PeerIdentity, record: &ChannelRecord) -> Result<(), StoreError>;

    fn delete(&self, peer: &PeerIdentity) -> Result<(), StoreError>;

    /// Atomically loads, transforms, and persists (or deletes, if `f`
    /// returns `None`) the record for `peer`.
    fn modify(
        &self,
        peer: &PeerIdentity,
        f: impl FnOnce(Option<ChannelRecord>) -> Result<Option<ChannelRecord>, StoreError>,
    ) -> Result<Option<ChannelRecord>, StoreError>
    where
        Self: Sized,
    {
        let current = self.get(peer)?;
        match f(current)? {
            Some(next) => {
                self.put(peer, &next)?;
                Ok(Some(next))
            }
            None => {
                self.delete(peer)?;
                Ok(None)
            }
        }
    }
}

/// Persistent routing table (§3, §6): peers we have a direct channel with,
/// and best-known routes to everyone else.
pub trait RouteStore: Send + Sync {
    fn get_peer(&self, peer: &PeerIdentity) -> Result<Option<PeerRow>, StoreError>;
    fn put_peer(&self, row: &PeerRow) -> Result<(), StoreError>;
    fn delete_peer(&self, peer: &PeerIdentity) -> Result<(), StoreError>;
    fn all_peers(&self) -> Result<Vec<PeerRow>, StoreError>;

    fn get_route(&self, destination: &PeerIdentity) -> Result<Option<RouteRow>, StoreError>;
    fn put_route(&self, row: &RouteRow) -> Result<(), StoreError>;
    fn all_routes(&self) -> Result<Vec<RouteRow>, StoreError>;
}
