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

use crate::peer::PeerIdentity;
use crate::store::StoreError;

#[derive(Clone, Eq, PartialEq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum RouterError {
    /// route store failed: {0}
    #[from]
    Store(StoreError),

    /// no route to {0} and no direct channel either
    NoRoute(PeerIdentity),

    /// forwarding over the local channel to {0} failed: {1}
    LocalSendFailed(PeerIdentity, String),

    /// the next hop {0} rejected the forwarded send
    NextHopRejected(PeerIdentity),

    /// gossiping a route update to {0} failed: {1}
    GossipFailed(PeerIdentity, String),
}
