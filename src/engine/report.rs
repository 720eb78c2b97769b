//! Per-unit results handed back to the host.
//!
//! Failures never escape [`Engine::process`](super::Engine::process); they
//! become [`Annotation`]s on the unit's [`UnitReport`].

use std::{fmt, num::NonZeroUsize, time::Duration};

use bytes::Bytes;

use crate::{
    fragment::{LossReport, Overlap, TransferId},
    sequence::{FragmentSeq, WrappingSeq},
    session::{Direction, SessionKey, SetupInfo},
    unit::{DataKind, EndpointPair, UnitId},
};

/// A structured note attached to a unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Annotation {
    /// A data item was buffered at `fragment_seq`.
    Fragment {
        /// Flavour of the buffered data.
        kind: DataKind,
        /// Transfer the fragment joined.
        transfer_id: TransferId,
        /// Offset of the fragment inside the transfer.
        fragment_seq: FragmentSeq,
        /// Wrapping-sequence distance from the unit that opened the transfer.
        seq_distance: u16,
    },
    /// Data arrived at or behind the point where the direction's last
    /// transfer closed and was ignored.
    StaleData {
        /// Flavour of the ignored data.
        kind: DataKind,
    },
    /// A terminator closed a transfer.
    Reassembled {
        /// Flavour of the closed transfer.
        kind: DataKind,
        /// Transfer that closed.
        transfer_id: TransferId,
        /// Missing fragments.
        packets_lost: u32,
        /// Largest run of missing fragments.
        burst_lost: u32,
    },
    /// Fragments of the closed transfer shared offsets.
    Overlap {
        /// Transfer the overlap was found in.
        transfer_id: TransferId,
        /// Whether any repeated offset carried different bytes.
        conflict: bool,
    },
    /// A terminator arrived with no transfer open and was not a
    /// retransmission of the previous unit.
    TerminatorWithoutData,
    /// A failed-check terminator discarded the open transfer.
    TransferAborted {
        /// Transfer that was discarded.
        transfer_id: TransferId,
        /// Number of fragments thrown away.
        fragments: usize,
    },
    /// A fragment exceeded the payload bound and was dropped.
    FragmentRejected {
        /// Transfer the fragment belonged to.
        transfer_id: TransferId,
        /// Offset the fragment would have occupied.
        fragment_seq: FragmentSeq,
        /// Payload length.
        len: usize,
        /// Configured bound.
        limit: NonZeroUsize,
    },
    /// The pending-fragment store could not grow; the rest of the unit was
    /// skipped.
    ResourceExhausted {
        /// Transfer being buffered.
        transfer_id: TransferId,
    },
    /// The unit could not be decoded and was rejected.
    Malformed {
        /// Decoder error message.
        reason: String,
    },
}

impl Annotation {
    /// Whether the annotation reports a protocol or processing problem.
    #[must_use]
    pub const fn is_anomaly(&self) -> bool {
        matches!(
            self,
            Self::TerminatorWithoutData
                | Self::FragmentRejected { .. }
                | Self::ResourceExhausted { .. }
                | Self::Malformed { .. }
                | Self::Overlap { conflict: true, .. }
        )
    }

    /// Stable label used for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Fragment { .. } => "fragment",
            Self::StaleData { .. } => "stale_data",
            Self::Reassembled { .. } => "reassembled",
            Self::Overlap { conflict: false, .. } => "overlap",
            Self::Overlap { conflict: true, .. } => "overlap_conflict",
            Self::TerminatorWithoutData => "terminator_without_data",
            Self::TransferAborted { .. } => "transfer_aborted",
            Self::FragmentRejected { .. } => "fragment_rejected",
            Self::ResourceExhausted { .. } => "resource_exhausted",
            Self::Malformed { .. } => "malformed",
        }
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fragment {
                kind: DataKind::Hdlc,
                fragment_seq,
                ..
            } => write!(f, "(HDLC fragment {fragment_seq})"),
            Self::Fragment {
                kind: DataKind::T4NonEcm,
                seq_distance,
                ..
            } => write!(f, "(t4-data fragment {seq_distance})"),
            Self::StaleData { kind } => {
                write!(f, "[late {} data after transfer close]", kind.label())
            }
            Self::Reassembled {
                kind,
                packets_lost,
                burst_lost,
                ..
            } => write!(
                f,
                "({} Reassembled: {packets_lost} pack lost, {burst_lost} pack burst lost)",
                kind.label()
            ),
            Self::Overlap {
                conflict: false, ..
            } => f.write_str("[fragment overlap]"),
            Self::Overlap { conflict: true, .. } => {
                f.write_str("[fragment overlap, conflicting data]")
            }
            Self::TerminatorWithoutData => {
                f.write_str("[RECEIVED END OF FRAGMENT W/OUT ANY FRAGMENT DATA]")
            }
            Self::TransferAborted {
                transfer_id,
                fragments,
            } => write!(
                f,
                "[transfer {transfer_id} aborted, {fragments} fragments discarded]"
            ),
            Self::FragmentRejected {
                fragment_seq,
                len,
                limit,
                ..
            } => write!(
                f,
                "[fragment {fragment_seq} dropped: {len} bytes exceeds {limit}]"
            ),
            Self::ResourceExhausted { transfer_id } => {
                write!(f, "[allocation failed buffering transfer {transfer_id}]")
            }
            Self::Malformed { reason } => write!(f, "[Malformed?] {reason}"),
        }
    }
}

/// A closed transfer ready for a downstream decoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedTransfer {
    /// Correlation key the fragments shared.
    pub transfer_id: TransferId,
    /// Unit that carried the first fragment.
    pub first_unit: UnitId,
    /// Unit whose terminator closed the transfer.
    pub closed_in: UnitId,
    /// Direction the transfer travelled.
    pub direction: Direction,
    /// Flavour of the transfer's data.
    pub data_kind: DataKind,
    /// Capture-relative time of the first fragment.
    pub start_time: Duration,
    /// Reassembled bytes.
    pub payload: Bytes,
    /// Loss and overlap statistics.
    pub loss: LossReport,
    /// Fragments buffered, terminator and duplicates included.
    pub fragment_count: usize,
}

impl CompletedTransfer {
    /// Missing fragments.
    #[must_use]
    pub const fn packets_lost(&self) -> u32 { self.loss.packets_lost }

    /// Largest run of missing fragments.
    #[must_use]
    pub const fn burst_lost(&self) -> u32 { self.loss.burst_lost }

    /// Overlap classification.
    #[must_use]
    pub const fn overlap(&self) -> Overlap { self.loss.overlap() }

    /// Human-readable loss comment, present only when fragments were lost.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use bytes::Bytes;
    /// use faxframe::{
    ///     engine::CompletedTransfer,
    ///     fragment::{LossReport, TransferId},
    ///     session::Direction,
    ///     unit::{DataKind, UnitId},
    /// };
    ///
    /// let transfer = CompletedTransfer {
    ///     transfer_id: TransferId::new(1),
    ///     first_unit: UnitId::new(1),
    ///     closed_in: UnitId::new(9),
    ///     direction: Direction::Forward,
    ///     data_kind: DataKind::T4NonEcm,
    ///     start_time: Duration::ZERO,
    ///     payload: Bytes::new(),
    ///     loss: LossReport {
    ///         packets_lost: 4,
    ///         burst_lost: 3,
    ///         ..LossReport::default()
    ///     },
    ///     fragment_count: 5,
    /// };
    /// assert_eq!(
    ///     transfer.loss_summary().as_deref(),
    ///     Some("Pack lost: 4, Pack burst lost: 3")
    /// );
    /// ```
    #[must_use]
    pub fn loss_summary(&self) -> Option<String> {
        (self.loss.packets_lost > 0).then(|| {
            format!(
                "Pack lost: {}, Pack burst lost: {}",
                self.loss.packets_lost, self.loss.burst_lost
            )
        })
    }
}

/// Everything the engine learned from one unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitReport {
    /// Unit the report describes.
    pub unit: UnitId,
    /// Endpoints the unit travelled between.
    pub endpoints: EndpointPair,
    /// Session the unit was routed to; `None` for rejected units.
    pub session: Option<SessionKey>,
    /// Direction within the session; `None` for rejected units.
    pub direction: Option<Direction>,
    /// Wrapping sequence; `None` when the unit could not be decoded.
    pub seq: Option<WrappingSeq>,
    /// Negotiation details of the session, when known.
    pub setup: Option<SetupInfo>,
    /// The unit repeated the previous unit's sequence number.
    pub is_retransmission: bool,
    /// Notes in the order they were produced.
    pub annotations: Vec<Annotation>,
    /// Transfers closed by this unit.
    pub completed: Vec<CompletedTransfer>,
}

impl UnitReport {
    pub(crate) fn new(unit: UnitId, endpoints: EndpointPair) -> Self {
        Self {
            unit,
            endpoints,
            session: None,
            direction: None,
            seq: None,
            setup: None,
            is_retransmission: false,
            annotations: Vec::new(),
            completed: Vec::new(),
        }
    }

    /// Whether the unit should be counted by statistics consumers.
    ///
    /// Retransmissions, rejected units, and terminators without data are
    /// excluded.
    #[must_use]
    pub fn is_reportable(&self) -> bool {
        !self.is_retransmission
            && !self.annotations.iter().any(|annotation| {
                matches!(
                    annotation,
                    Annotation::Malformed { .. } | Annotation::TerminatorWithoutData
                )
            })
    }

    /// Annotations that report problems.
    pub fn anomalies(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter().filter(|annotation| annotation.is_anomaly())
    }

    /// One-line description in the style of a packet list info column.
    #[must_use]
    pub fn info(&self) -> String {
        let mut info = match self.seq {
            Some(seq) => format!("Seq={seq}"),
            None => String::from("Seq=?"),
        };
        for annotation in &self.annotations {
            info.push(' ');
            info.push_str(&annotation.to_string());
        }
        info
    }
}
