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

//! The deterministic transducer driving a channel from `begin` to `end`
//! (§4.2). Every function here is a single row (or a fused pair of rows
//! joined by one synchronous RPC round trip) of the protocol tables; there
//! is no dispatch-by-name anywhere, only exhaustive matches on explicit
//! types (§9).

use bitcoin::OutPoint;

use crate::anchor::redeem_script;
use crate::chain::ChainAdapter;
use crate::channel::error::ChannelError;
use crate::channel::message::*;
use crate::channel::record::ChannelRecord;
use crate::channel::state::State;
use crate::keys::NodeKeys;
use crate::peer::PeerIdentity;
use crate::signing;

/// What a transition asks its caller (the per-peer worker) to do once the
/// record has been persisted.
#[derive(Default)]
pub struct Effects {
    /// A chain transaction to broadcast.
    pub broadcast: Option<bitcoin::Transaction>,
    /// The channel just reached `normal` for the first time; the router
    /// should be notified (§4.3's `channel_opened`).
    pub channel_opened: bool,
    /// The channel record should be deleted after this transition
    /// completes (cooperative close / settlement broadcast).
    pub delete_record: bool,
}

fn our_commitment(record: &ChannelRecord, anchor: OutPoint) -> bitcoin::Transaction {
    signing::build_commitment(
        anchor,
        *record.our_balance(),
        record.our_addr(),
        *record.their_balance(),
        record.their_addr(),
    )
}

fn their_commitment(record: &ChannelRecord, anchor: OutPoint) -> bitcoin::Transaction {
    signing::build_commitment(
        anchor,
        *record.their_balance(),
        record.their_addr(),
        *record.our_balance(),
        record.our_addr(),
    )
}

/// A1+A2+A3 fused: the originator's side of opening a channel is one
/// synchronous round trip of `open_channel` followed by one of
/// `update_anchor`; both replies are ordinary RPC return values, not
/// messages arriving later on our queue, so there is nothing to persist
/// between them. `call_open` and `call_update_anchor` perform those two
/// outbound calls.
#[allow(clippy::too_many_arguments)]
pub fn originate_open(
    chain: &dyn ChainAdapter,
    keys: &NodeKeys,
    peer: &PeerIdentity,
    our_amount: u64,
    their_amount: u64,
    fee: u64,
    call_open: impl FnOnce(OpenChannel) -> Result<OpenAccept, ChannelError>,
    call_update_anchor: impl FnOnce(UpdateAnchor) -> Result<AnchorUpdateSig, ChannelError>,
) -> Result<(ChannelRecord, Effects), ChannelError> {
    let (coins, change) = chain.select_coins(our_amount + 2 * fee)?;
    let our_addr = chain.get_new_address()?.script_pubkey();
    // The anchor key must be the same key `sign_commitment` signs with
    // (§3: "the node has one long-lived secret used for all channel
    // anchors it participates in"), not a fresh wallet key from the chain
    // adapter.
    let my_pubkey = keys.public();

    let accept = call_open(OpenChannel {
        sender_amount: our_amount,
        receiver_amount: their_amount,
        fee,
        sender_coins: coins,
        sender_change: change.script_pubkey,
        sender_pubkey: my_pubkey,
        sender_addr: our_addr.clone(),
    })?;

    let (signed_anchor, complete) = chain.sign_raw_transaction(accept.anchor_tx)?;
    if !complete {
        return Err(ChannelError::Chain(crate::chain::ChainError::IncompleteSignature));
    }
    let anchor_txid = chain.send_raw_transaction(&signed_anchor)?;

    // B is index 0 (it built the anchor tx and half-signed first); we take
    // the remaining slot.
    let redeem = redeem_script(
        &bitcoin::PublicKey::new(accept.receiver_pubkey),
        &bitcoin::PublicKey::new(my_pubkey),
    );
    let mut record = ChannelRecord::new(
        peer.clone(),
        1,
        redeem.clone(),
        our_amount,
        their_amount,
        our_addr,
        accept.receiver_addr,
        accept.receiver_pubkey,
        my_pubkey,
    );
    record.set_anchor_point(anchor_txid, 0);
    let anchor_point = OutPoint::new(anchor_txid, 0);

    let mirror_tx = their_commitment(&record, anchor_point);
    let our_mirror_sig = signing::sign_commitment(chain, keys, &redeem, &mirror_tx);

    let reply = call_update_anchor(UpdateAnchor { anchor_txid, mirror_sig: our_mirror_sig })?;

    let our_tx = our_commitment(&record, anchor_point);
    signing::verify_mirror(chain, &redeem, &our_tx, &accept.receiver_pubkey, &reply.mirror_sig)
        .map_err(ChannelError::from)?;

    record.set_their_sig(reply.mirror_sig);
    record.set_state(State::Normal);

    Ok((record, Effects { channel_opened: true, ..Default::default() }))
}

/// B1: the responder's side of an inbound `open_channel` call.
pub fn respond_open_channel(
    chain: &dyn ChainAdapter,
    keys: &NodeKeys,
    peer: &PeerIdentity,
    request: OpenChannel,
) -> Result<(ChannelRecord, OpenAccept), ChannelError> {
    let (our_coins, our_change) = chain.select_coins(request.receiver_amount + request.fee)?;
    let our_addr = chain.get_new_address()?.script_pubkey();
    // Same anchor-key rule as `originate_open`: sign with, and advertise,
    // the node's one long-lived key.
    let my_pubkey = keys.public();

    let redeem = redeem_script(
        &bitcoin::PublicKey::new(my_pubkey),
        &bitcoin::PublicKey::new(request.sender_pubkey),
    );
    let anchor_value = request.sender_amount + request.receiver_amount + 2 * request.fee;
    let mut inputs: Vec<bitcoin::TxIn> =
        request.sender_coins.iter().map(|u| u.txin.clone()).collect();
    inputs.extend(our_coins.iter().map(|u| u.txin.clone()));
    let anchor_tx = bitcoin::Transaction {
        version: 2,
        lock_time: 0,
        input: inputs,
        output: vec![
            bitcoin::TxOut {
                value: anchor_value,
                script_pubkey: crate::anchor::anchor_address(
                    &redeem,
                    bitcoin::Network::Bitcoin,
                )
                .script_pubkey(),
            },
            request.sender_change,
            our_change,
        ],
    };
    let (half_signed, _complete) = chain.sign_raw_transaction(anchor_tx)?;

    let mut record = ChannelRecord::new(
        peer.clone(),
        0,
        redeem.clone(),
        request.receiver_amount,
        request.sender_amount,
        our_addr.clone(),
        request.sender_addr,
        request.sender_pubkey,
        my_pubkey,
    );
    // Persisted until `pkt_update_anchor` arrives as a separate inbound
    // call; B1 and B2 are the one pair of rows that isn't fused.
    record.set_state(State::OpenWait15);

    let reply = OpenAccept {
        anchor_tx: half_signed,
        redeem,
        receiver_addr: our_addr,
        receiver_pubkey: my_pubkey,
    };
    Ok((record, reply))
}

/// B2: the responder's side of an inbound `update_anchor` call.
pub fn respond_update_anchor(
    chain: &dyn ChainAdapter,
    keys: &NodeKeys,
    record: &mut ChannelRecord,
    request: UpdateAnchor,
) -> Result<(AnchorUpdateSig, Effects), ChannelError> {
    if *record.state() != State::OpenWait15 {
        return Err(ChannelError::ProtocolViolation {
            state: *record.state(),
            packet: "pkt_update_anchor",
        });
    }
    record.set_anchor_point(request.anchor_txid, 0);
    let anchor_point = OutPoint::new(request.anchor_txid, 0);

    let our_tx = our_commitment(record, anchor_point);
    signing::verify_mirror(
        chain,
        record.anchor_redeem(),
        &our_tx,
        record.their_pubkey(),
        &request.mirror_sig,
    )
    .map_err(ChannelError::from)?;
    record.set_their_sig(request.mirror_sig);

    let mirror_tx = their_commitment(record, anchor_point);
    let our_mirror_sig =
        signing::sign_commitment(chain, keys, record.anchor_redeem(), &mirror_tx);

    record.set_state(State::Normal);

    Ok((
        AnchorUpdateSig { mirror_sig: our_mirror_sig },
        Effects { channel_opened: true, ..Default::default() },
    ))
}

/// S1+S3+S4 fused: the sender's side of `cmd_send`. `propose_update`'s
/// reply is `pkt_update_accept`; a second outbound call (`receive`) carries
/// `pkt_update_signature` and completes the exchange.
pub fn originate_send(
    chain: &dyn ChainAdapter,
    keys: &NodeKeys,
    record: &mut ChannelRecord,
    anchor_point: OutPoint,
    amount: u64,
    call_propose: impl FnOnce(Update) -> Result<UpdateAccept, ChannelError>,
    call_receive: impl FnOnce(UpdateSignature) -> Result<(), ChannelError>,
) -> Result<(), ChannelError> {
    if *record.state() != State::Normal {
        return Err(ChannelError::ProtocolViolation { state: *record.state(), packet: "cmd_send" });
    }
    if amount == 0 {
        return Err(ChannelError::ProtocolViolation { state: *record.state(), packet: "cmd_send(0)" });
    }
    if amount > *record.our_balance() {
        return Err(ChannelError::InsufficientFunds(crate::channel::record::InsufficientBalance {
            have: *record.our_balance(),
            requested: amount,
        }));
    }

    let accept = call_propose(Update { amount })?;

    // Verify the signature covers the commitment that pays us
    // `our_balance + amount`.
    let mut projected = record.clone();
    projected.apply_send(amount).expect("checked above");
    let our_new_tx = our_commitment(&projected, anchor_point);
    signing::verify_mirror(
        chain,
        record.anchor_redeem(),
        &our_new_tx,
        record.their_pubkey(),
        &accept.mirror_sig,
    )
    .map_err(ChannelError::from)?;

    record.apply_send(amount).expect("checked above");
    record.set_their_sig(accept.mirror_sig);

    let their_new_tx = their_commitment(record, anchor_point);
    let our_mirror_sig =
        signing::sign_commitment(chain, keys, record.anchor_redeem(), &their_new_tx);

    call_receive(UpdateSignature { amount, mirror_sig: our_mirror_sig })?;
    Ok(())
}

/// S2: the receiver's side of an inbound `propose_update` call. Never
/// persists (§4.2: "DO NOT persist") — balances are projected, signed
/// over, and discarded.
pub fn respond_propose_update(
    chain: &dyn ChainAdapter,
    keys: &NodeKeys,
    record: &ChannelRecord,
    anchor_point: OutPoint,
    request: Update,
) -> Result<UpdateAccept, ChannelError> {
    if *record.state() != State::Normal {
        return Err(ChannelError::ProtocolViolation {
            state: *record.state(),
            packet: "pkt_update",
        });
    }
    if request.amount == 0 {
        return Err(ChannelError::ProtocolViolation {
            state: *record.state(),
            packet: "pkt_update(0)",
        });
    }
    let mut projected = record.clone();
    projected
        .apply_receive(request.amount)
        .map_err(ChannelError::from)?;

    let their_new_tx = their_commitment(&projected, anchor_point);
    let mirror_sig = signing::sign_commitment(chain, keys, record.anchor_redeem(), &their_new_tx);

    Ok(UpdateAccept { amount: request.amount, mirror_sig })
}

/// S4: the receiver's side of an inbound `receive` call, which actually
/// commits the balance change proposed (and projected) in S2.
pub fn respond_receive(
    chain: &dyn ChainAdapter,
    record: &mut ChannelRecord,
    anchor_point: OutPoint,
    request: UpdateSignature,
) -> Result<(), ChannelError> {
    if *record.state() != State::Normal {
        return Err(ChannelError::ProtocolViolation {
            state: *record.state(),
            packet: "pkt_update_signature",
        });
    }
    let mut projected = record.clone();
    projected
        .apply_receive(request.amount)
        .map_err(ChannelError::from)?;
    let our_new_tx = our_commitment(&projected, anchor_point);
    signing::verify_mirror(
        chain,
        record.anchor_redeem(),
        &our_new_tx,
        record.their_pubkey(),
        &request.mirror_sig,
    )
    .map_err(ChannelError::from)?;

    record.apply_receive(request.amount).expect("checked above");
    record.set_their_sig(request.mirror_sig);
    Ok(())
}

/// C1+C3 fused: the initiator's side of `cmd_close`.
pub fn originate_close(
    chain: &dyn ChainAdapter,
    keys: &NodeKeys,
    record: &ChannelRecord,
    anchor_point: OutPoint,
    call_close: impl FnOnce(Close) -> Result<Close, ChannelError>,
) -> Result<Effects, ChannelError> {
    if *record.state() != State::Normal {
        return Err(ChannelError::ProtocolViolation { state: *record.state(), packet: "cmd_close" });
    }
    let settlement = signing::build_settlement(
        anchor_point,
        *record.my_index(),
        *record.our_balance(),
        record.our_addr(),
        *record.their_balance(),
        record.their_addr(),
    );
    let our_sig = signing::sign_commitment(chain, keys, record.anchor_redeem(), &settlement);

    let reply = call_close(Close { settlement_sig: our_sig })?;

    // §9's open question: the peer's reply signature is combined exactly
    // once, in `my_index` order; returning it again in an ack would be a
    // no-op, not a second combination.
    let finalized = signing::finalize_commitment(
        settlement,
        *record.my_index(),
        our_sig,
        reply.settlement_sig,
        &record.pubkey_at_index0(),
        &record.pubkey_at_index1(),
    );
    chain.verify_script(
        &finalized.input[0].script_sig,
        &crate::anchor::anchor_address(record.anchor_redeem(), bitcoin::Network::Bitcoin)
            .script_pubkey(),
        &finalized,
        0,
    )?;
    chain.send_raw_transaction(&finalized)?;

    Ok(Effects { broadcast: Some(finalized), delete_record: true, ..Default::default() })
}

/// C2: the acceptor's side of an inbound `close_channel` call: assemble,
/// broadcast, and hand back our own settlement signature.
pub fn respond_close_channel(
    chain: &dyn ChainAdapter,
    keys: &NodeKeys,
    record: &ChannelRecord,
    anchor_point: OutPoint,
    request: Close,
) -> Result<(Close, Effects), ChannelError> {
    if *record.state() != State::Normal {
        return Err(ChannelError::ProtocolViolation { state: *record.state(), packet: "pkt_close" });
    }
    let settlement = signing::build_settlement(
        anchor_point,
        *record.my_index(),
        *record.our_balance(),
        record.our_addr(),
        *record.their_balance(),
        record.their_addr(),
    );
    let our_sig = signing::sign_commitment(chain, keys, record.anchor_redeem(), &settlement);

    let finalized = signing::finalize_commitment(
        settlement,
        *record.my_index(),
        our_sig,
        request.settlement_sig,
        &record.pubkey_at_index0(),
        &record.pubkey_at_index1(),
    );
    chain.verify_script(
        &finalized.input[0].script_sig,
        &crate::anchor::anchor_address(record.anchor_redeem(), bitcoin::Network::Bitcoin)
            .script_pubkey(),
        &finalized,
        0,
    )?;
    chain.send_raw_transaction(&finalized)?;

    Ok((
        Close { settlement_sig: our_sig },
        Effects { broadcast: Some(finalized), delete_record: true, ..Default::default() },
    ))
}

/// Builds a fully-signed, script-verified commitment transaction usable for
/// a unilateral close (§4.2's `get_commitment_transactions`), without
/// touching the channel's state machine.
pub fn finish_our_commitment(
    chain: &dyn ChainAdapter,
    keys: &NodeKeys,
    record: &ChannelRecord,
    anchor_point: OutPoint,
) -> Result<bitcoin::Transaction, ChannelError> {
    let their_sig = (*record.their_sig()).ok_or(ChannelError::InvalidSignature)?;
    let our_tx = our_commitment(record, anchor_point);
    let our_sig = signing::sign_commitment(chain, keys, record.anchor_redeem(), &our_tx);
    let finalized = signing::finalize_commitment(
        our_tx,
        *record.my_index(),
        our_sig,
        their_sig,
        &record.pubkey_at_index0(),
        &record.pubkey_at_index1(),
    );
    chain.verify_script(
        &finalized.input[0].script_sig,
        &crate::anchor::anchor_address(record.anchor_redeem(), bitcoin::Network::Bitcoin)
            .script_pubkey(),
        &finalized,
        0,
    )?;
    Ok(finalized)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::anchor::redeem_script;
    use crate::chain::mock::MockAdapter;
    use crate::keys::NodeKeys;

    fn fixture() -> (MockAdapter, NodeKeys, ChannelRecord, OutPoint) {
        let chain = MockAdapter::funded(1, 100_000_000);
        let alice = NodeKeys::generate();
        let bob = NodeKeys::generate();
        let redeem = redeem_script(
            &bitcoin::PublicKey::new(alice.public()),
            &bitcoin::PublicKey::new(bob.public()),
        );
        let mut record = ChannelRecord::new(
            PeerIdentity::new("http://bob"),
            0,
            redeem,
            50_000_000,
            50_000_000,
            bitcoin::Script::new(),
            bitcoin::Script::new(),
            bob.public(),
            alice.public(),
        );
        record.set_anchor_point(
            bitcoin::Txid::from_hash(bitcoin_hashes::sha256d::Hash::from_inner([7u8; 32])),
            0,
        );
        record.set_state(State::Normal);
        let anchor_point = record.anchor_point().as_ref().unwrap().as_outpoint();
        (chain, alice, record, anchor_point)
    }

    #[test]
    fn tampered_mirror_signature_is_rejected_without_mutating_balances() {
        let (chain, alice, mut record, anchor_point) = fixture();
        let before = (*record.our_balance(), *record.their_balance());

        // A signature produced over the wrong message can never verify
        // against the peer's pubkey for the real commitment.
        let bogus_msg = secp256k1::Message::from_slice(&[9u8; 32]).unwrap();
        let bogus_sig = crate::keys::SECP256K1.sign(&bogus_msg, alice.secret());

        let result =
            respond_receive(&chain, &mut record, anchor_point, UpdateSignature {
                amount: 1_000_000,
                mirror_sig: bogus_sig,
            });

        assert!(matches!(result, Err(ChannelError::InvalidSignature)));
        assert_eq!((*record.our_balance(), *record.their_balance()), before);
    }

    #[test]
    fn send_is_rejected_before_the_channel_reaches_normal() {
        let (chain, alice, mut record, anchor_point) = fixture();
        record.set_state(State::OpenWait15);

        let result = originate_send(
            &chain,
            &alice,
            &mut record,
            anchor_point,
            1_000_000,
            |_| panic!("must not call out before the state guard rejects"),
            |_| panic!("must not call out before the state guard rejects"),
        );

        assert!(matches!(
            result,
            Err(ChannelError::ProtocolViolation { state: State::OpenWait15, packet: "cmd_send" })
        ));
    }

    #[test]
    fn update_anchor_is_rejected_outside_open_wait_1_5() {
        let (chain, alice, mut record, _anchor_point) = fixture();
        record.set_state(State::Begin);

        let result = respond_update_anchor(
            &chain,
            &alice,
            &mut record,
            UpdateAnchor {
                anchor_txid: bitcoin::Txid::from_hash(
                    bitcoin_hashes::sha256d::Hash::from_inner([1u8; 32]),
                ),
                mirror_sig: crate::keys::SECP256K1.sign(
                    &secp256k1::Message::from_slice(&[2u8; 32]).unwrap(),
                    alice.secret(),
                ),
            },
        );

        assert!(matches!(
            result,
            Err(ChannelError::ProtocolViolation { state: State::Begin, packet: "pkt_update_anchor" })
        ));
    }

    #[test]
    fn close_is_rejected_before_the_channel_reaches_normal() {
        let (chain, alice, mut record, anchor_point) = fixture();
        record.set_state(State::Begin);

        let result =
            originate_close(&chain, &alice, &record, anchor_point, |_| {
                panic!("must not call out before the state guard rejects")
            });

        assert!(matches!(
            result,
            Err(ChannelError::ProtocolViolation { state: State::Begin, packet: "cmd_close" })
        ));
    }
}
