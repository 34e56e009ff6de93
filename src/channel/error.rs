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

//! The channel error taxonomy (§7). Every variant here is fatal for the
//! channel that raised it except `InsufficientFunds`, which never touches
//! state.

use crate::chain::ChainError;
use crate::channel::record::InsufficientBalance;
use crate::channel::state::State;
use crate::signing::SigningError;

#[derive(Clone, Eq, PartialEq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum ChannelError {
    /// not enough money: have {have} but {requested} was requested
    #[from]
    InsufficientFunds(InsufficientBalance),

    /// a received signature did not verify
    InvalidSignature,

    /// packet {packet} is not valid in state {state}
    ProtocolViolation { state: State, packet: &'static str },

    /// the chain adapter rejected an operation: {0}
    #[from]
    Chain(ChainError),

    /// peer rejected the channel with: {0}
    PeerError(String),

    /// no channel record exists for this peer
    UnknownPeer,
}

impl From<SigningError> for ChannelError {
    fn from(err: SigningError) -> Self {
        match err {
            SigningError::Chain(err) => ChannelError::Chain(err),
            SigningError::BadSignature => ChannelError::InvalidSignature,
        }
    }
}

impl ChannelError {
    /// Every variant here is fatal for the channel per §7's propagation
    /// policy; kept as a method so callers don't have to re-derive the
    /// rule by hand at each call site.
    pub fn is_fatal(&self) -> bool {
        true
    }
}
