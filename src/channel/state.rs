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

//! The channel's protocol state (§3, §4.2), expressed as an explicit tagged
//! sum rather than the reference's name-keyed dispatch table (§9: "the
//! original source's loose dispatch via a name-keyed table should become an
//! exhaustive match so unreachable transitions are compile-time errors").
//!
//! §4.2's protocol tables name more rows than there are states a record
//! actually sits in between two calls: every originator-side step
//! (`cmd_open`, `cmd_send`, `cmd_close`) is a fused synchronous round trip
//! that never returns control to the worker loop until it either completes
//! or fails, so there is no persisted state in between its rows to guard.
//! The only row whose reply genuinely arrives as a *separate* inbound call,
//! on a record already sitting in the store, is B1 → B2 (`pkt_open_channel`
//! then `pkt_update_anchor`). This enum tracks exactly the states that are
//! ever observed on a persisted record; `machine` guards every transition
//! that reads one against the states that may legally reach it.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, Debug, Display, serde::Serialize, serde::Deserialize,
)]
pub enum State {
    /// no anchor negotiated yet
    #[display("begin")]
    Begin,
    /// responder: sent `pkt_open_accept`, awaiting `pkt_update_anchor`
    #[display("open_wait_1_5")]
    OpenWait15,
    /// channel usable for sends and closes
    #[display("normal")]
    Normal,
}

impl State {
    /// True once the channel has reached `normal`; the one state from which
    /// both sends and closes are valid commands.
    pub fn is_usable(self) -> bool {
        matches!(self, State::Normal)
    }
}
