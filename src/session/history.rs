//! Append-only record of direction states in capture order.
//!
//! A second analysis pass may visit units out of order and needs the state
//! each unit saw on its first visit. Snapshots are value copies appended to
//! an arena and indexed by [`UnitId`].

use std::collections::HashMap;

use super::{Direction, DirectionState, SessionKey};
use crate::unit::UnitId;

/// Direction state as it stood when a unit was first processed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    /// Unit the snapshot was taken for.
    pub unit: UnitId,
    /// Session the unit belonged to.
    pub session: SessionKey,
    /// Direction the unit travelled.
    pub direction: Direction,
    /// State before the unit mutated it.
    pub state: DirectionState,
}

/// Arena of snapshots with lookup by unit.
#[derive(Debug, Default)]
pub struct StateHistory {
    entries: Vec<Snapshot>,
    index: HashMap<UnitId, usize>,
}

impl StateHistory {
    /// Create an empty history.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Append a snapshot unless one already exists for its unit.
    ///
    /// Returns `false` when the unit was already recorded.
    pub fn record(&mut self, snapshot: Snapshot) -> bool {
        if self.index.contains_key(&snapshot.unit) {
            return false;
        }
        self.index.insert(snapshot.unit, self.entries.len());
        self.entries.push(snapshot);
        true
    }

    /// Snapshot recorded for `unit`.
    #[must_use]
    pub fn get(&self, unit: UnitId) -> Option<&Snapshot> {
        self.index.get(&unit).and_then(|position| self.entries.get(*position))
    }

    /// Snapshots in the order they were recorded.
    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> { self.entries.iter() }

    /// Number of recorded snapshots.
    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}
