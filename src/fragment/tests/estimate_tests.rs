//! Tests for gap counting and overlap classification.

use rstest::rstest;

use crate::{
    fragment::{
        Fragment,
        LossReport,
        Overlap,
        estimate::{assemble, count_gaps},
    },
    sequence::FragmentSeq,
};

fn fragments(offsets: &[u32]) -> Vec<Fragment> {
    offsets
        .iter()
        .map(|offset| Fragment::data(FragmentSeq::new(*offset), vec![u8::try_from(*offset % 256).expect("fits")]))
        .collect()
}

#[rstest]
#[case(&[0, 1, 2, 3], 0, 0)]
#[case(&[0, 1, 3, 4, 5], 1, 1)]
#[case(&[0, 5, 6], 4, 4)]
#[case(&[2, 3], 2, 2)]
#[case(&[0, 2, 3, 7, 8], 4, 3)]
#[case(&[0, 0, 1, 1, 2], 0, 0)]
fn counts_gaps(#[case] offsets: &[u32], #[case] lost: u32, #[case] burst: u32) {
    assert_eq!(count_gaps(&fragments(offsets)), (lost, burst));
}

#[test]
fn empty_list_has_no_loss() {
    assert_eq!(count_gaps(&[]), (0, 0));
}

#[test]
fn identical_duplicate_is_consistent_overlap() {
    let list = vec![
        Fragment::data(FragmentSeq::new(0), b"ab".as_slice()),
        Fragment::data(FragmentSeq::new(0), b"ab".as_slice()),
        Fragment::data(FragmentSeq::new(1), b"cd".as_slice()),
        Fragment::terminal(FragmentSeq::new(2), b"".as_slice()),
    ];

    let (buffer, report) = assemble(&list).expect("assemble");

    assert_eq!(buffer.as_ref(), b"abcd");
    assert_eq!(
        report,
        LossReport {
            packets_lost: 0,
            burst_lost: 0,
            duplicates: 1,
            conflicts: 0,
        }
    );
    assert_eq!(report.overlap(), Overlap::Consistent);
}

#[test]
fn differing_duplicate_is_conflicting_overlap() {
    let list = vec![
        Fragment::data(FragmentSeq::new(0), b"ab".as_slice()),
        Fragment::data(FragmentSeq::new(0), b"xy".as_slice()),
        Fragment::data(FragmentSeq::new(0), b"ab".as_slice()),
    ];

    let (buffer, report) = assemble(&list).expect("assemble");

    assert_eq!(buffer.as_ref(), b"ab");
    assert_eq!(report.duplicates, 2);
    assert_eq!(report.conflicts, 1);
    assert_eq!(report.overlap(), Overlap::Conflicting);
}

#[test]
fn terminator_sharing_an_offset_is_not_a_duplicate() {
    let list = vec![
        Fragment::data(FragmentSeq::new(0), b"ab".as_slice()),
        Fragment::terminal(FragmentSeq::new(0), b"".as_slice()),
    ];

    let (buffer, report) = assemble(&list).expect("assemble");

    assert_eq!(buffer.as_ref(), b"ab");
    assert_eq!(report.overlap(), Overlap::None);
}
