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

//! In-memory store implementations, used by the test suite and by
//! `paychand`'s in-memory demo mode.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::channel::ChannelRecord;
use crate::peer::PeerIdentity;
use crate::router::table::{PeerRow, RouteRow};
use crate::store::{ChannelStore, RouteStore, StoreError};

#[derive(Default)]
pub struct MemoryChannelStore {
    channels: Mutex<HashMap<PeerIdentity, ChannelRecord>>,
}

impl MemoryChannelStore {
    pub fn new() -> MemoryChannelStore {
        MemoryChannelStore::default()
    }
}

impl ChannelStore for MemoryChannelStore {
    fn get(&self, peer: &PeerIdentity) -> Result<Option<ChannelRecord>, StoreError> {
        let channels = self.channels.lock().expect("channel store mutex poisoned");
        Ok(channels.get(peer).cloned())
    }

    fn put(&self, peer: &PeerIdentity, record: &ChannelRecord) -> Result<(), StoreError> {
        let mut channels = self.channels.lock().expect("channel store mutex poisoned");
        channels.insert(peer.clone(), record.clone());
        Ok(())
    }

    fn delete(&self, peer: &PeerIdentity) -> Result<(), StoreError> {
        let mut channels = self.channels.lock().expect("channel store mutex poisoned");
        channels.remove(peer);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryRouteStore {
    peers: Mutex<HashMap<PeerIdentity, PeerRow>>,
    routes: Mutex<HashMap<PeerIdentity, RouteRow>>,
}

impl MemoryRouteStore {
    pub fn new() -> MemoryRouteStore {
        MemoryRouteStore::default()
    }
}

impl RouteStore for MemoryRouteStore {
    fn get_peer(&self, peer: &PeerIdentity) -> Result<Option<PeerRow>, StoreError> {
        Ok(self.peers.lock().expect("route store mutex poisoned").get(peer).cloned())
    }

    fn put_peer(&self, row: &PeerRow) -> Result<(), StoreError> {
        self.peers
            .lock()
            .expect("route store mutex poisoned")
            .insert(row.peer().clone(), row.clone());
        Ok(())
    }

    fn delete_peer(&self, peer: &PeerIdentity) -> Result<(), StoreError> {
        self.peers.lock().expect("route store mutex poisoned").remove(peer);
        Ok(())
    }

    fn all_peers(&self) -> Result<Vec<PeerRow>, StoreError> {
        Ok(self.peers.lock().expect("route store mutex poisoned").values().cloned().collect())
    }

    fn get_route(&self, destination: &PeerIdentity) -> Result<Option<RouteRow>, StoreError> {
        Ok(self
            .routes
            .lock()
            .expect("route store mutex poisoned")
            .get(destination)
            .cloned())
    }

    fn put_route(&self, row: &RouteRow) -> Result<(), StoreError> {
        self.routes
            .lock()
            .expect("route store mutex poisoned")
            .insert(row.destination().clone(), row.clone());
        Ok(())
    }

    fn all_routes(&self) -> Result<Vec<RouteRow>, StoreError> {
        Ok(self.routes.lock().expect("route store mutex poisoned").values().cloned().collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn channel_store_roundtrips() {
        let store = MemoryChannelStore::new();
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
}
