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

//! The distance-vector routing engine (§4.3).
//!
//! Deliberately implements "optimistic forwarding": [`Router::send`] pays
//! the local hop before asking the next hop to forward, so a downstream
//! failure leaves the sender short while the next hop keeps the funds.
//! Reimplementers inheriting this file are expected to keep that behavior
//! for protocol compatibility (§9) rather than "fix" it — a correct
//! HTLC-based forwarding path is explicitly out of scope.

use crate::peer::PeerIdentity;
use crate::router::error::RouterError;
use crate::router::table::{PeerRow, RouteRow};
use crate::store::RouteStore;

/// Outbound gossip and multi-hop forwarding, dispatched to a remote peer's
/// `lightning.*` RPC methods. Kept as a trait so the router core stays
/// decoupled from the transport.
pub trait PeerLink: Send + Sync {
    fn update(
        &self,
        peer: &PeerIdentity,
        next_hop: &PeerIdentity,
        destination: &PeerIdentity,
        cost: u64,
    ) -> Result<(), RouterError>;

    fn lightning_send(
        &self,
        peer: &PeerIdentity,
        destination: &PeerIdentity,
        amount: u64,
    ) -> Result<(), RouterError>;
}

/// Pays a local channel, dispatched to the per-peer worker that owns the
/// state machine. Kept separate from [`PeerLink`] since it never leaves
/// the process.
pub trait LocalChannel: Send + Sync {
    fn send(&self, peer: &PeerIdentity, amount: u64) -> Result<(), RouterError>;
}

/// Distance-vector router over a [`RouteStore`] (§4.3).
pub struct Router<'a> {
    store: &'a dyn RouteStore,
    self_identity: PeerIdentity,
    local_fee: u64,
}

impl<'a> Router<'a> {
    pub fn new(store: &'a dyn RouteStore, self_identity: PeerIdentity, local_fee: u64) -> Self {
        Router { store, self_identity, local_fee }
    }

    /// Invoked by the state machine the moment a channel reaches `normal`
    /// (§9: "the router should subscribe via an explicit interface the
    /// state machine invokes").
    pub fn channel_opened(
        &self,
        peer: &PeerIdentity,
        link: &dyn PeerLink,
    ) -> Result<(), RouterError> {
        self.store.put_peer(&PeerRow::new(peer.clone(), self.local_fee))?;
        self.update(peer, peer, 0, link)?;
        for route in self.store.all_routes()? {
            self.update(peer, route.destination(), *route.cost(), link)?;
        }
        Ok(())
    }

    /// `update(next_hop, destination, cost)` (§4.3).
    pub fn update(
        &self,
        next_hop: &PeerIdentity,
        destination: &PeerIdentity,
        cost: u64,
        link: &dyn PeerLink,
    ) -> Result<(), RouterError> {
        if *destination == self.self_identity {
            return Ok(());
        }
        let existing = self.store.get_route(destination)?;
        let improved = match &existing {
            None => true,
            Some(row) => cost < *row.cost(),
        };
        if !improved {
            return Ok(());
        }

        self.store.put_route(&RouteRow::new(destination.clone(), cost, next_hop.clone()))?;

        for peer_row in self.store.all_peers()? {
            let onward_cost = cost + *peer_row.fee();
            if let Err(err) =
                link.update(peer_row.peer(), &self.self_identity, destination, onward_cost)
            {
                // §7: routing update errors are isolated to the offending
                // peer call and do not poison the table.
                warn!(
                    "gossip update to {} for destination {} failed: {}",
                    peer_row.peer(),
                    destination,
                    err
                );
            }
        }
        Ok(())
    }

    /// `send(destination, amount)` (§4.3): optimistic forwarding.
    pub fn send(
        &self,
        destination: &PeerIdentity,
        amount: u64,
        local: &dyn LocalChannel,
        link: &dyn PeerLink,
    ) -> Result<(), RouterError> {
        if *destination == self.self_identity {
            return Ok(());
        }
        match self.store.get_route(destination)? {
            None => local
                .send(destination, amount)
                .map_err(|_| RouterError::NoRoute(destination.clone())),
            Some(route) => {
                local
                    .send(route.next_hop(), amount + *route.cost())
                    .map_err(|e| RouterError::LocalSendFailed(route.next_hop().clone(), e.to_string()))?;
                link.lightning_send(route.next_hop(), destination, amount)
                    .map_err(|_| RouterError::NextHopRejected(route.next_hop().clone()))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::store::memory::MemoryRouteStore;
    use std::cell::RefCell;

    struct RecordingLink {
        updates: RefCell<Vec<(PeerIdentity, PeerIdentity, u64)>>,
    }

    impl PeerLink for RecordingLink {
        fn update(
            &self,
            peer: &PeerIdentity,
            _next_hop: &PeerIdentity,
            destination: &PeerIdentity,
            cost: u64,
        ) -> Result<(), RouterError> {
            self.updates.borrow_mut().push((peer.clone(), destination.clone(), cost));
            Ok(())
        }

        fn lightning_send(
            &self,
            _peer: &PeerIdentity,
            _destination: &PeerIdentity,
            _amount: u64,
        ) -> Result<(), RouterError> {
            Ok(())
        }
    }

    #[test]
    fn channel_opened_installs_zero_cost_self_route() {
        let store = MemoryRouteStore::new();
        let me = PeerIdentity::new("http://alice");
        let router = Router::new(&store, me, 10);
        let bob = PeerIdentity::new("http://bob");
        let link = RecordingLink { updates: RefCell::new(vec![]) };

        router.channel_opened(&bob, &link).unwrap();

        let route = store.get_route(&bob).unwrap().unwrap();
        assert_eq!(*route.cost(), 0);
        assert_eq!(route.next_hop(), &bob);
    }

    #[test]
    fn update_ignores_non_improving_cost() {
        let store = MemoryRouteStore::new();
        let me = PeerIdentity::new("http://alice");
        let router = Router::new(&store, me, 10);
        let carol = PeerIdentity::new("http://carol");
        let bob = PeerIdentity::new("http://bob");
        let link = RecordingLink { updates: RefCell::new(vec![]) };

        router.update(&bob, &carol, 5, &link).unwrap();
        router.update(&bob, &carol, 5, &link).unwrap();
        assert_eq!(*store.get_route(&carol).unwrap().unwrap().cost(), 5);

        router.update(&bob, &carol, 10, &link).unwrap();
        assert_eq!(*store.get_route(&carol).unwrap().unwrap().cost(), 5);
    }
}
