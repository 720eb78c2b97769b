//! Generated checks for sequence arithmetic and loss accounting.

use std::collections::BTreeSet;

use faxframe::{
    Engine,
    EndpointPair,
    UnitReport,
    sequence::{TransferOrigin, WrappingSeq, derive_fragment_seq},
};
use faxframe_testing::UnitScript;
use proptest::{
    collection::btree_set,
    prelude::{ProptestConfig, Strategy, any},
    prop_assert,
    prop_assert_eq,
    test_runner::{RngAlgorithm, TestRng, TestRunner},
};
use rstest::rstest;

fn deterministic_runner(cases: u32) -> TestRunner {
    let config = ProptestConfig {
        cases,
        ..ProptestConfig::default()
    };
    let rng = TestRng::deterministic_rng(RngAlgorithm::ChaCha);
    TestRunner::new_with_rng(config, rng)
}

fn endpoints() -> EndpointPair {
    EndpointPair::new(
        "192.0.2.1:4000".parse().expect("valid address"),
        "192.0.2.2:4002".parse().expect("valid address"),
    )
}

/// Offsets delivered for one transfer: always starts at 0, strictly rising.
fn delivered_offsets(max_offset: u16) -> impl Strategy<Value = Vec<u16>> {
    btree_set(1..=max_offset, 0..usize::from(max_offset)).prop_map(|rest| {
        let mut offsets: BTreeSet<u16> = rest;
        offsets.insert(0);
        offsets.into_iter().collect()
    })
}

fn longest_gap(offsets: &[u16], terminator: u16) -> u32 {
    offsets
        .iter()
        .copied()
        .chain([terminator])
        .collect::<Vec<_>>()
        .windows(2)
        .map(|pair| u32::from(pair[1] - pair[0] - 1))
        .max()
        .unwrap_or(0)
}

#[rstest]
#[case(256)]
fn consecutive_units_advance_one_offset_across_wrap(#[case] cases: u32) {
    let mut runner = deterministic_runner(cases);
    let strategy = (any::<u16>(), 1u16..600);

    runner
        .run(&strategy, |(start, len)| {
            let origin = TransferOrigin {
                start_seq: WrappingSeq::new(start),
                start_item: 0,
            };
            for step in 0..len {
                let seq = WrappingSeq::new(start.wrapping_add(step));
                let offset = derive_fragment_seq(origin, seq, 0, 0);
                prop_assert_eq!(offset.get(), u32::from(step));
            }
            Ok(())
        })
        .expect("offsets should advance by one per unit");
}

#[rstest]
#[case(64, 128)]
#[case(300, 64)]
fn loss_counts_every_missing_offset(#[case] max_offset: u16, #[case] cases: u32) {
    let mut runner = deterministic_runner(cases);
    let strategy = (any::<u16>(), delivered_offsets(max_offset));

    runner
        .run(&strategy, |(start, offsets)| {
            let terminator = offsets.last().copied().unwrap_or(0) + 1;
            let mut script = UnitScript::new(endpoints());
            let mut expected = Vec::new();
            for &offset in &offsets {
                let byte = u8::try_from(offset % 251).unwrap_or(0);
                expected.push(byte);
                script = script.t4(start.wrapping_add(offset), vec![byte]);
            }
            let units = script.terminator(start.wrapping_add(terminator)).build();

            let mut engine = Engine::default();
            let reports: Vec<UnitReport> = units.iter().map(|unit| engine.process(unit)).collect();
            let last = reports.last().expect("terminator report");
            prop_assert_eq!(last.completed.len(), 1);
            let transfer = &last.completed[0];

            let delivered = u32::try_from(offsets.len()).unwrap_or(u32::MAX);
            prop_assert_eq!(transfer.packets_lost(), u32::from(terminator) - delivered);
            prop_assert_eq!(transfer.burst_lost(), longest_gap(&offsets, terminator));
            prop_assert!(transfer.burst_lost() <= transfer.packets_lost());
            prop_assert_eq!(transfer.payload.as_ref(), expected.as_slice());
            Ok(())
        })
        .expect("loss accounting should match delivered offsets");
}

#[rstest]
#[case(96)]
fn shuffled_revisits_reproduce_reports(#[case] cases: u32) {
    let mut runner = deterministic_runner(cases);
    let strategy = (
        any::<u16>(),
        delivered_offsets(32),
        proptest::collection::vec(any::<proptest::sample::Index>(), 1..40),
    );

    runner
        .run(&strategy, |(start, offsets, picks)| {
            let mut script = UnitScript::new(endpoints());
            for &offset in &offsets {
                script = script.hdlc(start.wrapping_add(offset), b"x");
            }
            let terminator = offsets.last().copied().unwrap_or(0) + 1;
            let units = script.terminator(start.wrapping_add(terminator)).build();

            let mut engine = Engine::default();
            let first: Vec<UnitReport> = units.iter().map(|unit| engine.process(unit)).collect();
            for pick in picks {
                let index = pick.index(units.len());
                prop_assert_eq!(&engine.process(&units[index]), &first[index]);
            }
            Ok(())
        })
        .expect("revisits should reproduce first-visit reports");
}
