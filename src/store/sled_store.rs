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

//! `sled`-backed persistence: one tree per record kind, keyed by the
//! peer/destination identity's UTF-8 bytes, values JSON-encoded.
//!
//! `sled::Tree::fetch_and_update` would be the more idiomatic home for an
//! atomic read-modify-write, but it cannot return an application error from
//! the closure; we instead take the simpler route of a per-store
//! coarse-grained lock, acceptable under §5's "single-writer per peer"
//! assumption.

use std::sync::Mutex;

use crate::channel::ChannelRecord;
use crate::peer::PeerIdentity;
use crate::router::table::{PeerRow, RouteRow};
use crate::store::{ChannelStore, RouteStore, StoreError};

fn ser<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(value).map_err(|e| StoreError::Backend(e.to_string()))
}

fn de<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Backend(e.to_string()))
}

/// Channel store backed by a single `sled::Tree`, guarded by a lock so
/// `ChannelStore::modify`'s default read-modify-write implementation is
/// actually atomic with respect to other workers touching the same tree.
pub struct SledChannelStore {
    tree: sled::Tree,
    lock: Mutex<()>,
}

impl SledChannelStore {
    pub fn open(db: &sled::Db) -> Result<SledChannelStore, StoreError> {
        let tree = db.open_tree("channels").map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(SledChannelStore { tree, lock: Mutex::new(()) })
    }
}

impl ChannelStore for SledChannelStore {
    fn get(&self, peer: &PeerIdentity) -> Result<Option<ChannelRecord>, StoreError> {
        let _guard = self.lock.lock().expect("channel store mutex poisoned");
        match self.tree.get(peer.as_url().as_bytes()).map_err(|e| StoreError::Backend(e.to_string()))? {
            Some(bytes) => Ok(Some(de(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put(&self, peer: &PeerIdentity, record: &ChannelRecord) -> Result<(), StoreError> {
        let _guard = self.lock.lock().expect("channel store mutex poisoned");
        self.tree
            .insert(peer.as_url().as_bytes(), ser(record)?)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.tree.flush().map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    fn delete(&self, peer: &PeerIdentity) -> Result<(), StoreError> {
        let _guard = self.lock.lock().expect("channel store mutex poisoned");
        self.tree
            .remove(peer.as_url().as_bytes())
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        self.tree.flush().map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }
}

/// Route store backed by two `sled::Tree`s (peers, routes), one key per
/// identity.
pub struct SledRouteStore {
    peers: sled::Tree,
    routes: sled::Tree,
}

impl SledRouteStore {
    pub fn open(db: &sled::Db) -> Result<SledRouteStore, StoreError> {
        let peers = db.open_tree("peers").map_err(|e| StoreError::Backend(e.to_string()))?;
        let routes = db.open_tree("routes").map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(SledRouteStore { peers, routes })
    }
}

impl RouteStore for SledRouteStore {
    fn get_peer(&self, peer: &PeerIdentity) -> Result<Option<PeerRow>, StoreError> {
        match self
            .peers
            .get(peer.as_url().as_bytes())
            .map_err(|e| StoreError::Backend(e.to_string()))?
        {
            Some(bytes) => Ok(Some(de(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_peer(&self, row: &PeerRow) -> Result<(), StoreError> {
        self.peers
            .insert(row.peer().as_url().as_bytes(), ser(row)?)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    fn delete_peer(&self, peer: &PeerIdentity) -> Result<(), StoreError> {
        self.peers
            .remove(peer.as_url().as_bytes())
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    fn all_peers(&self) -> Result<Vec<PeerRow>, StoreError> {
        self.peers
            .iter()
            .values()
            .map(|res| {
                let bytes = res.map_err(|e| StoreError::Backend(e.to_string()))?;
                de(&bytes)
            })
            .collect()
    }

    fn get_route(&self, destination: &PeerIdentity) -> Result<Option<RouteRow>, StoreError> {
        match self
            .routes
            .get(destination.as_url().as_bytes())
            .map_err(|e| StoreError::Backend(e.to_string()))?
        {
            Some(bytes) => Ok(Some(de(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_route(&self, row: &RouteRow) -> Result<(), StoreError> {
        self.routes
            .insert(row.destination().as_url().as_bytes(), ser(row)?)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    fn all_routes(&self) -> Result<Vec<RouteRow>, StoreError> {
        self.routes
            .iter()
            .values()
            .map(|res| {
                let bytes = res.map_err(|e| StoreError::Backend(e.to_string()))?;
                de(&bytes)
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn channel_store_roundtrips_through_a_real_sled_db() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let db = sled::open(dir.path()).expect("failed to open sled db");
        let store = SledChannelStore::open(&db).unwrap();

        let peer = PeerIdentity::new("http://bob");
        assert!(store.get(&peer).unwrap().is_none());

        let record = ChannelRecord::new(
            peer.clone(),
            0,
            bitcoin::Script::new(),
            100,
            200,
            bitcoin::Script::new(),
            bitcoin::Script::new(),
            crate::keys::NodeKeys::generate().public(),
            crate::keys::NodeKeys::generate().public(),
        );
        store.put(&peer, &record).unwrap();
        assert_eq!(*store.get(&peer).unwrap().unwrap().our_balance(), 100);

        store.delete(&peer).unwrap();
        assert!(store.get(&peer).unwrap().is_none());
    }

    #[test]
    fn route_store_roundtrips_peers_and_routes() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let db = sled::open(dir.path()).expect("failed to open sled db");
        let store = SledRouteStore::open(&db).unwrap();

        let peer = PeerIdentity::new("http://carol");
        store.put_peer(&PeerRow::new(peer.clone(), 10)).unwrap();
        assert_eq!(*store.get_peer(&peer).unwrap().unwrap().fee(), 10);
        assert_eq!(store.all_peers().unwrap().len(), 1);

        let dest = PeerIdentity::new("http://dave");
        store.put_route(&RouteRow::new(dest.clone(), 5, peer.clone())).unwrap();
        assert_eq!(*store.get_route(&dest).unwrap().unwrap().cost(), 5);
        assert_eq!(store.all_routes().unwrap().len(), 1);
    }
}
