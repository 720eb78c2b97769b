//! Tests for inbound reassembly ordering, limits, and closure.

use std::num::NonZeroUsize;

use bytes::Bytes;
use rstest::{fixture, rstest};

use crate::{
    fragment::{AssemblyError, Overlap, Reassembler, TransferId},
    sequence::FragmentSeq,
};

#[fixture]
fn reassembler() -> Reassembler { Reassembler::new(NonZeroUsize::new(8).expect("non-zero")) }

fn push_data(reassembler: &mut Reassembler, id: u64, offset: u32, payload: &'static [u8]) {
    let outcome = reassembler
        .add_fragment(
            TransferId::new(id),
            FragmentSeq::new(offset),
            Bytes::from_static(payload),
            true,
        )
        .expect("data fragment accepted");
    assert!(outcome.is_none(), "data fragment must not close the transfer");
}

fn terminate(reassembler: &mut Reassembler, id: u64, offset: u32) -> crate::fragment::AssembledTransfer {
    reassembler
        .add_fragment(TransferId::new(id), FragmentSeq::new(offset), Bytes::new(), false)
        .expect("terminator accepted")
        .expect("terminator closes the transfer")
}

#[rstest]
fn concatenates_in_offset_order_despite_arrival_order(mut reassembler: Reassembler) {
    push_data(&mut reassembler, 1, 2, b"cc");
    push_data(&mut reassembler, 1, 0, b"aa");
    push_data(&mut reassembler, 1, 1, b"bb");

    let closed = terminate(&mut reassembler, 1, 3);

    assert_eq!(closed.transfer_id(), TransferId::new(1));
    assert_eq!(closed.payload().as_ref(), b"aabbcc");
    assert_eq!(closed.loss().packets_lost, 0);
    assert_eq!(closed.fragment_count(), 4);
    assert_eq!(reassembler.buffered_len(), 0);
}

#[rstest]
fn keeps_transfers_independent(mut reassembler: Reassembler) {
    push_data(&mut reassembler, 1, 0, b"one");
    push_data(&mut reassembler, 2, 0, b"two");
    assert_eq!(reassembler.buffered_len(), 2);

    let second = terminate(&mut reassembler, 2, 1);
    assert_eq!(second.payload().as_ref(), b"two");
    assert_eq!(reassembler.fragment_count(TransferId::new(1)), 1);
}

#[rstest]
fn closes_best_effort_across_gaps(mut reassembler: Reassembler) {
    push_data(&mut reassembler, 3, 0, b"a");
    push_data(&mut reassembler, 3, 1, b"b");
    push_data(&mut reassembler, 3, 3, b"d");
    push_data(&mut reassembler, 3, 4, b"e");

    let closed = terminate(&mut reassembler, 3, 5);

    assert_eq!(closed.payload().as_ref(), b"abde");
    assert_eq!(closed.loss().packets_lost, 1);
    assert_eq!(closed.loss().burst_lost, 1);
}

#[rstest]
fn conflicting_duplicate_keeps_first_payload(mut reassembler: Reassembler) {
    push_data(&mut reassembler, 4, 0, b"first");
    push_data(&mut reassembler, 4, 0, b"second");

    let closed = terminate(&mut reassembler, 4, 1);

    assert_eq!(closed.payload().as_ref(), b"first");
    assert_eq!(closed.loss().overlap(), Overlap::Conflicting);
    assert_eq!(closed.loss().packets_lost, 0);
}

#[rstest]
fn oversized_fragment_is_dropped_and_counted_as_gap(mut reassembler: Reassembler) {
    push_data(&mut reassembler, 5, 0, b"ok");
    let err = reassembler
        .add_fragment(
            TransferId::new(5),
            FragmentSeq::new(1),
            Bytes::from_static(b"far too long"),
            true,
        )
        .expect_err("oversized fragment must be rejected");
    assert!(matches!(
        err,
        AssemblyError::FragmentTooLarge { len: 12, .. }
    ));
    assert_eq!(reassembler.fragment_count(TransferId::new(5)), 1);

    let closed = terminate(&mut reassembler, 5, 2);
    assert_eq!(closed.payload().as_ref(), b"ok");
    assert_eq!(closed.loss().packets_lost, 1);
}

#[rstest]
fn oversized_first_fragment_still_opens_transfer(mut reassembler: Reassembler) {
    let err = reassembler
        .add_fragment(
            TransferId::new(6),
            FragmentSeq::new(0),
            Bytes::from_static(b"way beyond eight"),
            true,
        )
        .expect_err("oversized fragment must be rejected");
    assert!(matches!(err, AssemblyError::FragmentTooLarge { .. }));

    let closed = terminate(&mut reassembler, 6, 1);
    assert!(closed.payload().is_empty());
    assert_eq!(closed.loss().packets_lost, 1);
}

#[rstest]
fn terminator_without_fragments_is_an_error(mut reassembler: Reassembler) {
    let err = reassembler
        .add_fragment(TransferId::new(7), FragmentSeq::zero(), Bytes::new(), false)
        .expect_err("terminator without data must be rejected");
    assert!(matches!(
        err,
        AssemblyError::TerminatorWithoutData { transfer_id } if transfer_id == TransferId::new(7)
    ));
}

#[rstest]
fn closed_transfers_leave_nothing_behind(mut reassembler: Reassembler) {
    for id in 1..=64 {
        push_data(&mut reassembler, id, 0, b"x");
        terminate(&mut reassembler, id, 1);
    }
    push_data(&mut reassembler, 65, 0, b"y");
    reassembler.abandon(TransferId::new(65));

    assert_eq!(reassembler.buffered_len(), 0);
    let repeat =
        reassembler.add_fragment(TransferId::new(64), FragmentSeq::new(1), Bytes::new(), false);
    assert!(matches!(
        repeat,
        Err(AssemblyError::TerminatorWithoutData { transfer_id }) if transfer_id == TransferId::new(64)
    ));
}

#[rstest]
fn abandon_discards_buffered_fragments(mut reassembler: Reassembler) {
    push_data(&mut reassembler, 9, 0, b"a");
    push_data(&mut reassembler, 9, 1, b"b");

    assert_eq!(reassembler.abandon(TransferId::new(9)), Some(2));
    assert_eq!(reassembler.abandon(TransferId::new(9)), None);
    assert_eq!(reassembler.buffered_len(), 0);
}

#[rstest]
fn accepts_fragment_at_exact_bound(mut reassembler: Reassembler) {
    push_data(&mut reassembler, 10, 0, b"12345678");
    let closed = terminate(&mut reassembler, 10, 1);
    assert_eq!(closed.payload().len(), 8);
}
