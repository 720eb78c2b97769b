//! Builders for unit sequences.

use std::{net::SocketAddr, time::Duration};

use bytes::Bytes;
use faxframe::{DataItem, DataKind, EndpointPair, Unit, UnitId, WrappingSeq};
use rstest::fixture;

/// Endpoints used by most scenarios: initiator first.
#[allow(
    unused_braces,
    reason = "rustc false positive for single line rstest fixtures"
)]
#[fixture]
pub fn endpoints() -> EndpointPair {
    EndpointPair::new(
        SocketAddr::from(([192, 0, 2, 1], 4000)),
        SocketAddr::from(([192, 0, 2, 2], 4002)),
    )
}

/// Scripted capture of units travelling between one endpoint pair.
///
/// Units receive consecutive capture indices starting at 1 and timestamps
/// 20 ms apart, in the order they are scripted.
#[derive(Clone, Debug)]
pub struct UnitScript {
    endpoints: EndpointPair,
    next_id: u64,
    units: Vec<Unit>,
}

impl UnitScript {
    /// Start an empty script for units sent from `endpoints.src`.
    #[must_use]
    pub fn new(endpoints: EndpointPair) -> Self {
        Self {
            endpoints,
            next_id: 1,
            units: Vec::new(),
        }
    }

    /// Continue numbering capture indices from `id`.
    #[must_use]
    pub fn starting_at(mut self, id: u64) -> Self {
        self.next_id = id;
        self
    }

    /// Append a unit carrying `items` in the current direction.
    #[must_use]
    pub fn unit(mut self, seq: u16, items: Vec<DataItem>) -> Self {
        let id = self.next_id;
        self.next_id += 1;
        self.units.push(Unit {
            id: UnitId::new(id),
            endpoints: self.endpoints,
            timestamp: Duration::from_millis(id * 20),
            seq: WrappingSeq::new(seq),
            items,
        });
        self
    }

    /// Append a unit carrying one HDLC chunk.
    #[must_use]
    pub fn hdlc(self, seq: u16, payload: &'static [u8]) -> Self {
        self.unit(seq, vec![DataItem::data(DataKind::Hdlc, payload)])
    }

    /// Append a unit carrying one non-ECM image chunk.
    #[must_use]
    pub fn t4(self, seq: u16, payload: impl Into<Bytes>) -> Self {
        self.unit(seq, vec![DataItem::data(DataKind::T4NonEcm, payload)])
    }

    /// Append a unit carrying a good terminator.
    #[must_use]
    pub fn terminator(self, seq: u16) -> Self { self.unit(seq, vec![DataItem::terminator_ok()]) }

    /// Subsequent units travel the opposite way.
    #[must_use]
    pub fn reply(mut self) -> Self {
        self.endpoints = self.endpoints.reversed();
        self
    }

    /// Finish the script.
    #[must_use]
    pub fn build(self) -> Vec<Unit> { self.units }
}
