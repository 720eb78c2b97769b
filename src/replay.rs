//! Replay Guard.
//!
//! Units may be analysed more than once, for example by a two-pass pipeline
//! or when a capture is reloaded. The first visit's report is cached by
//! [`UnitId`]; later visits return the cached value and mutate nothing.

use std::collections::HashMap;

use crate::{engine::UnitReport, unit::UnitId};

/// Reports cached by unit.
#[derive(Debug, Default)]
pub struct ReplayCache {
    reports: HashMap<UnitId, UnitReport>,
}

impl ReplayCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Report produced on the first visit of `unit`.
    #[must_use]
    pub fn lookup(&self, unit: UnitId) -> Option<&UnitReport> { self.reports.get(&unit) }

    /// Whether `unit` has been processed before.
    #[must_use]
    pub fn is_visited(&self, unit: UnitId) -> bool { self.reports.contains_key(&unit) }

    /// Cache the first-visit report. An existing entry is never replaced.
    pub fn store(&mut self, report: UnitReport) {
        self.reports.entry(report.unit).or_insert(report);
    }

    /// Number of cached reports.
    #[must_use]
    pub fn len(&self) -> usize { self.reports.len() }

    /// Whether nothing has been cached.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.reports.is_empty() }
}
