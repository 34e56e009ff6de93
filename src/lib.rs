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

#![recursion_limit = "256"]
// Coding conventions
#![deny(
    non_upper_case_globals,
    non_camel_case_types,
    non_snake_case,
    unused_mut,
    unused_imports,
    dead_code,
    //missing_docs
)]

extern crate amplify;
#[macro_use]
extern crate amplify_derive;
#[macro_use]
extern crate strict_encoding;
#[macro_use]
extern crate log;
pub mod anchor;
pub mod chain;
pub mod channel;
pub mod config;
pub mod hexser;
pub mod keys;
pub mod node;
pub mod peer;
pub mod router;
pub mod rpc;
pub mod signing;
pub mod store;
pub mod worker;

pub use channel::{Channel, ChannelRecord};
pub use node::Node;
pub use peer::PeerIdentity;
pub use router::Router;
