//! Metric helpers for `faxframe`.
//!
//! This module defines metric names and simple helper functions
//! wrapping the [`metrics`](https://docs.rs/metrics) crate. The engine
//! records each unit once, on its first visit.

use metrics::counter;

use crate::{engine::UnitReport, session::Direction};

/// Name of the counter tracking units processed on first visit.
pub const UNITS_PROCESSED: &str = "faxframe_units_processed_total";
/// Name of the counter tracking transfers closed by a terminator.
pub const TRANSFERS_COMPLETED: &str = "faxframe_transfers_completed_total";
/// Name of the counter accumulating missing fragments across transfers.
pub const FRAGMENTS_LOST: &str = "faxframe_fragments_lost_total";
/// Name of the counter tracking anomaly annotations.
pub const ANOMALIES_TOTAL: &str = "faxframe_anomalies_total";

/// Record a processed unit for the given direction.
pub fn inc_units(direction: Direction) {
    counter!(UNITS_PROCESSED, "direction" => direction.as_str()).increment(1);
}

/// Record a closed transfer.
pub fn inc_transfers() { counter!(TRANSFERS_COMPLETED).increment(1); }

/// Add `lost` missing fragments to the running total.
pub fn add_fragments_lost(lost: u32) { counter!(FRAGMENTS_LOST).increment(u64::from(lost)); }

/// Record an anomaly of the given kind.
pub fn inc_anomalies(kind: &'static str) {
    counter!(ANOMALIES_TOTAL, "kind" => kind).increment(1);
}

pub(crate) fn record_report(report: &UnitReport) {
    if let Some(direction) = report.direction {
        inc_units(direction);
    }
    for transfer in &report.completed {
        inc_transfers();
        add_fragments_lost(transfer.packets_lost());
    }
    for annotation in report.anomalies() {
        inc_anomalies(annotation.kind());
    }
}
