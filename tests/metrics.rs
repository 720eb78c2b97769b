#![cfg(feature = "metrics")]
//! Tests for `faxframe` metrics.
//!
//! These tests verify that counters update as expected using
//! `metrics_util::debugging::DebuggingRecorder`.

use faxframe::{Engine, EndpointPair, Unit};
use faxframe_testing::{UnitScript, endpoints};
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use rstest::rstest;

/// Creates a debugging recorder and snapshotter for metrics testing.
fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

fn counter_value(snapshotter: &Snapshotter, name: &str, label: Option<(&str, &str)>) -> u64 {
    snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .find_map(|(key, _, _, value)| {
            let matches_label = label.is_none_or(|(k, v)| {
                key.key()
                    .labels()
                    .any(|l| l.key() == k && l.value() == v)
            });
            match value {
                DebugValue::Counter(count) if key.key().name() == name && matches_label => {
                    Some(count)
                }
                _ => None,
            }
        })
        .unwrap_or(0)
}

fn lossy_capture(endpoints: EndpointPair) -> Vec<Unit> {
    UnitScript::new(endpoints)
        .terminator(7)
        .hdlc(100, b"a")
        .hdlc(102, b"c")
        .terminator(103)
        .reply()
        .hdlc(40, b"r")
        .build()
}

#[rstest]
fn first_visit_updates_counters(endpoints: EndpointPair) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        let mut engine = Engine::default();
        for unit in &lossy_capture(endpoints) {
            engine.process(unit);
        }
    });

    assert_eq!(
        counter_value(
            &snapshotter,
            faxframe::metrics::UNITS_PROCESSED,
            Some(("direction", "forward"))
        ),
        4
    );
    assert_eq!(
        counter_value(
            &snapshotter,
            faxframe::metrics::UNITS_PROCESSED,
            Some(("direction", "reverse"))
        ),
        1
    );
    assert_eq!(
        counter_value(&snapshotter, faxframe::metrics::TRANSFERS_COMPLETED, None),
        1
    );
    assert_eq!(
        counter_value(&snapshotter, faxframe::metrics::FRAGMENTS_LOST, None),
        1
    );
    assert_eq!(
        counter_value(
            &snapshotter,
            faxframe::metrics::ANOMALIES_TOTAL,
            Some(("kind", "terminator_without_data"))
        ),
        1
    );
}

#[rstest]
fn revisits_do_not_double_count(endpoints: EndpointPair) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    let units = lossy_capture(endpoints);
    metrics::with_local_recorder(&recorder, || {
        let mut engine = Engine::default();
        for _ in 0..3 {
            for unit in &units {
                engine.process(unit);
            }
        }
    });

    assert_eq!(
        counter_value(&snapshotter, faxframe::metrics::TRANSFERS_COMPLETED, None),
        1
    );
    assert_eq!(
        counter_value(
            &snapshotter,
            faxframe::metrics::UNITS_PROCESSED,
            Some(("direction", "forward"))
        ),
        4
    );
}

#[rstest]
#[case(1)]
#[case(3)]
fn anomaly_helper_counts(#[case] expected: u64) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        (0..expected).for_each(|_| faxframe::metrics::inc_anomalies("malformed"));
    });

    assert_eq!(
        counter_value(
            &snapshotter,
            faxframe::metrics::ANOMALIES_TOTAL,
            Some(("kind", "malformed"))
        ),
        expected
    );
}
