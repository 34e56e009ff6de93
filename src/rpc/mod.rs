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

//! JSON-RPC transport (§6 and §10): a blocking client for the two outbound
//! legs (chain node, remote peer), a binary envelope codec for framing
//! `strict_encoding` packets inside JSON string fields, and the two inbound
//! servers (peer-to-peer, local control).

pub mod client;
pub mod codec;
pub mod local_server;
pub mod peer_client;
pub mod peer_server;

pub use client::{RpcClient, RpcError};
pub use codec::{Envelope, CodecError};
