//! Per-direction reassembly state.
//!
//! Each [`Session`](super::Session) owns two [`DirectionState`]s that are
//! mutated independently. States are plain values: snapshots taken for the
//! history are copies, never aliases of the live state.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    fragment::{LossReport, TransferId},
    sequence::{FragmentSeq, TransferOrigin, WrappingSeq, derive_fragment_seq},
    unit::{DataKind, UnitId},
};

const HALF_WINDOW: u16 = 0x8000;

/// Which way a unit travelled relative to the session's initiator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// From the initiator to its peer.
    Forward,
    /// From the peer back to the initiator.
    Reverse,
}

impl Direction {
    /// Label used for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Reverse => "reverse",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Bookkeeping for the transfer currently being reassembled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferState {
    /// Correlation key used with the reassembler.
    pub transfer_id: TransferId,
    /// Unit that carried the first fragment.
    pub first_unit: UnitId,
    /// Wire position of the first fragment.
    pub origin: TransferOrigin,
    /// Extra data items packed into units of this transfer so far.
    pub extra_item_count: u32,
    /// Value of `extra_item_count` when the current unit began.
    pub unit_extra: u32,
    /// Capture-relative time of the first fragment.
    pub start_time: Duration,
    /// Flavour of the first fragment.
    pub data_kind: DataKind,
}

/// Mutable reassembly state for one direction of a session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionState {
    /// Active transfer, if any. At most one is open per direction.
    pub transfer: Option<TransferState>,
    /// Wrapping sequence of the last unit fully processed.
    pub last_seq: Option<WrappingSeq>,
    /// Wrapping sequence of the previous data item in the current unit.
    pub prev_data_seq: Option<WrappingSeq>,
    /// Missing fragments in the most recently closed transfer.
    pub packets_lost: u32,
    /// Largest run of missing fragments in the most recently closed transfer.
    pub burst_lost: u32,
    /// Newest wrapping sequence seen while idle since the last transfer
    /// closed. Data at or behind it belongs to a finished transfer.
    pub closed_through: Option<WrappingSeq>,
}

impl DirectionState {
    /// Whether no transfer is in progress.
    #[must_use]
    pub const fn is_idle(&self) -> bool { self.transfer.is_none() }

    /// Prepare for a new unit.
    ///
    /// Offsets inside a unit use the correction term as it stood when the
    /// unit began; items later in the same unit are already offset by their
    /// item index.
    pub fn begin_unit(&mut self) {
        self.prev_data_seq = None;
        if let Some(transfer) = self.transfer.as_mut() {
            transfer.unit_extra = transfer.extra_item_count;
        }
    }

    /// Open a transfer starting at the given wire position.
    pub fn begin_transfer(
        &mut self,
        transfer_id: TransferId,
        first_unit: UnitId,
        origin: TransferOrigin,
        start_time: Duration,
        data_kind: DataKind,
    ) {
        self.transfer = Some(TransferState {
            transfer_id,
            first_unit,
            origin,
            extra_item_count: 0,
            unit_extra: 0,
            start_time,
            data_kind,
        });
    }

    /// Position a data item inside the active transfer.
    ///
    /// Returns `None` when no transfer is active.
    pub fn place_data(&mut self, seq: WrappingSeq, item_index: u32) -> Option<FragmentSeq> {
        let repeats_unit = self.prev_data_seq == Some(seq);
        let transfer = self.transfer.as_mut()?;
        if repeats_unit {
            transfer.extra_item_count = transfer.extra_item_count.saturating_add(1);
        }
        let fragment_seq =
            derive_fragment_seq(transfer.origin, seq, item_index, transfer.unit_extra);
        self.prev_data_seq = Some(seq);
        Some(fragment_seq)
    }

    /// Position a terminator inside the active transfer.
    ///
    /// Returns `None` when no transfer is active.
    #[must_use]
    pub fn place_terminator(&self, seq: WrappingSeq, item_index: u32) -> Option<FragmentSeq> {
        let transfer = self.transfer.as_ref()?;
        Some(derive_fragment_seq(
            transfer.origin,
            seq,
            item_index,
            transfer.unit_extra,
        ))
    }

    /// Return to idle at `seq`, recording the closed transfer's loss if one
    /// was computed.
    pub fn finish_transfer(
        &mut self,
        seq: WrappingSeq,
        loss: Option<LossReport>,
    ) -> Option<TransferState> {
        if let Some(loss) = loss {
            self.packets_lost = loss.packets_lost;
            self.burst_lost = loss.burst_lost;
        }
        self.prev_data_seq = None;
        let transfer = self.transfer.take()?;
        self.closed_through = Some(seq);
        Some(transfer)
    }

    /// Whether data at `seq` is a late copy from a transfer that already
    /// closed.
    ///
    /// Only the backward half of the 16-bit window counts as late, so a new
    /// transfer starting after the close point is never rejected.
    #[must_use]
    pub fn is_stale(&self, seq: WrappingSeq) -> bool {
        self.is_idle()
            && self
                .closed_through
                .is_some_and(|closed| closed.distance_from(seq) < HALF_WINDOW)
    }

    /// Record that the unit carrying `seq` has been fully processed.
    ///
    /// While idle the close point follows newer units so the backward window
    /// never reaches past the most recent traffic.
    pub fn end_unit(&mut self, seq: WrappingSeq) {
        self.last_seq = Some(seq);
        let advanced = self
            .closed_through
            .is_some_and(|closed| seq.distance_from(closed) < HALF_WINDOW);
        if self.is_idle() && advanced {
            self.closed_through = Some(seq);
        }
    }
}
