//! Per-unit control flow.
//!
//! Every inbound unit passes through the Replay Guard, is routed to its
//! session and direction, has each data item positioned by the sequence
//! arithmetic, and feeds the reassembler. Terminators close transfers and
//! hand the reassembled bytes plus loss statistics back in the unit's
//! [`UnitReport`].
//!
//! Processing is strictly sequential: each unit runs to completion before
//! the next is considered, and units must be supplied in capture order on
//! their first visit for the sequence arithmetic to hold.

mod report;

use std::ops::ControlFlow;

use bytes::Bytes;
pub use report::{Annotation, CompletedTransfer, UnitReport};
use tracing::{debug, warn};

use crate::{
    config::EngineConfig,
    fragment::{AssemblyError, Overlap, Reassembler, TransferId},
    replay::ReplayCache,
    sequence::{TransferOrigin, WrappingSeq},
    session::{
        Direction,
        DirectionState,
        SessionStore,
        SetupInfo,
        Snapshot,
        StateHistory,
    },
    unit::{DataKind, EndpointPair, ItemKind, RawUnit, Unit, UnitDecoder, UnitId},
};

/// Hook for the downstream decoder of reassembled transfers.
///
/// Closures taking `&CompletedTransfer` implement this trait.
pub trait TransferConsumer {
    /// Receive a closed transfer.
    fn consume(&mut self, transfer: &CompletedTransfer);
}

impl<F> TransferConsumer for F
where
    F: FnMut(&CompletedTransfer),
{
    fn consume(&mut self, transfer: &CompletedTransfer) { self(transfer) }
}

/// Reassembly and loss-tracking engine.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use faxframe::{
///     engine::Engine,
///     sequence::WrappingSeq,
///     unit::{DataItem, DataKind, EndpointPair, Unit, UnitId},
/// };
///
/// let pair = EndpointPair::new(
///     "10.0.0.1:4000".parse().expect("addr"),
///     "10.0.0.2:5000".parse().expect("addr"),
/// );
/// let unit = |id: u64, seq: u16, item: DataItem| {
///     Unit::new(UnitId::new(id), pair, Duration::ZERO, WrappingSeq::new(seq)).with_item(item)
/// };
///
/// let mut engine = Engine::default();
/// engine.process(&unit(1, 10, DataItem::data(DataKind::Hdlc, &b"\xff\x03"[..])));
/// engine.process(&unit(2, 11, DataItem::data(DataKind::Hdlc, &b"\x80"[..])));
/// let report = engine.process(&unit(3, 12, DataItem::terminator_ok()));
///
/// let transfer = &report.completed[0];
/// assert_eq!(transfer.payload.as_ref(), b"\xff\x03\x80");
/// assert_eq!(transfer.packets_lost(), 0);
/// ```
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    sessions: SessionStore,
    reassembler: Reassembler,
    replay: ReplayCache,
    history: StateHistory,
    next_transfer_id: TransferId,
}

impl Default for Engine {
    fn default() -> Self { Self::new(EngineConfig::default()) }
}

impl Engine {
    /// Create an engine with the given configuration.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            sessions: SessionStore::new(),
            reassembler: Reassembler::new(config.max_fragment_len),
            replay: ReplayCache::new(),
            history: StateHistory::new(),
            next_transfer_id: TransferId::new(1),
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig { &self.config }

    /// Session store backing the engine.
    #[must_use]
    pub const fn sessions(&self) -> &SessionStore { &self.sessions }

    /// Number of transfers still waiting for a terminator.
    #[must_use]
    pub fn open_transfers(&self) -> usize { self.reassembler.buffered_len() }

    /// Whether `unit` has already been processed.
    #[must_use]
    pub fn is_visited(&self, unit: UnitId) -> bool { self.replay.is_visited(unit) }

    /// Direction state as it stood before `unit` was first processed.
    ///
    /// Returns `None` when the unit was never processed or history is
    /// disabled.
    #[must_use]
    pub fn state_at(&self, unit: UnitId) -> Option<&Snapshot> { self.history.get(unit) }

    /// Record how the session between `endpoints` was negotiated.
    ///
    /// Units from `unit` onwards are routed to a fresh session carrying the
    /// setup details.
    pub fn register_setup(
        &mut self,
        endpoints: EndpointPair,
        method: impl Into<String>,
        unit: UnitId,
    ) {
        self.sessions.register_setup(
            endpoints,
            SetupInfo {
                method: method.into(),
                unit,
            },
        );
    }

    /// Process a decoded unit.
    ///
    /// A revisited unit returns its first-visit report and leaves all state
    /// untouched.
    pub fn process(&mut self, unit: &Unit) -> UnitReport {
        if let Some(cached) = self.replay.lookup(unit.id) {
            debug!("unit revisited: unit={}", unit.id);
            return cached.clone();
        }
        let report = self.first_visit(unit);
        self.finish(report)
    }

    /// Process a decoded unit and hand every transfer it closed to
    /// `consumer`.
    ///
    /// Revisited units deliver their cached transfers again so a consumer
    /// rebuilding its view from scratch sees the same input on every pass.
    pub fn process_with<C>(&mut self, unit: &Unit, consumer: &mut C) -> UnitReport
    where
        C: TransferConsumer + ?Sized,
    {
        let report = self.process(unit);
        for transfer in &report.completed {
            consumer.consume(transfer);
        }
        report
    }

    /// Decode and process a raw unit.
    ///
    /// A decode failure rejects only this unit: the report carries
    /// [`Annotation::Malformed`] and no session state changes.
    pub fn process_raw<D>(&mut self, raw: &RawUnit, decoder: &D) -> UnitReport
    where
        D: UnitDecoder + ?Sized,
    {
        if let Some(cached) = self.replay.lookup(raw.id) {
            return cached.clone();
        }
        match raw.decode_with(decoder) {
            Ok(unit) => self.process(&unit),
            Err(err) => {
                warn!("malformed unit rejected: unit={}, error={err}", raw.id);
                let mut report = UnitReport::new(raw.id, raw.endpoints);
                report.annotations.push(Annotation::Malformed {
                    reason: err.to_string(),
                });
                self.finish(report)
            }
        }
    }

    fn finish(&mut self, report: UnitReport) -> UnitReport {
        #[cfg(feature = "metrics")]
        crate::metrics::record_report(&report);
        self.replay.store(report.clone());
        report
    }

    fn first_visit(&mut self, unit: &Unit) -> UnitReport {
        let session = self.sessions.lookup_or_create(unit.endpoints, unit.id);
        let key = session.key();
        let direction = session.direction_of(unit.endpoints);
        let mut report = UnitReport::new(unit.id, unit.endpoints);
        report.session = Some(key);
        report.direction = Some(direction);
        report.seq = Some(unit.seq);
        report.setup = session.setup().cloned();

        let state = session.state_mut(direction);
        if self.config.record_history {
            self.history.record(Snapshot {
                unit: unit.id,
                session: key,
                direction,
                state: state.clone(),
            });
        }
        report.is_retransmission = state.last_seq == Some(unit.seq);
        state.begin_unit();
        let stale = state.is_stale(unit.seq);

        let mut pass = UnitPass {
            reassembler: &mut self.reassembler,
            next_transfer_id: &mut self.next_transfer_id,
            state,
            unit,
            direction,
            stale,
            report,
        };
        for (position, item) in unit.items.iter().enumerate() {
            let item_index = u32::try_from(position).unwrap_or(u32::MAX);
            let flow = match item.kind {
                ItemKind::Data(kind) => pass.ingest_data(kind, item_index, &item.payload),
                ItemKind::TerminatorOk => pass.close_transfer(item_index, &item.payload),
                ItemKind::TerminatorBad => {
                    pass.abort_transfer();
                    ControlFlow::Continue(())
                }
                ItemKind::NonData => ControlFlow::Continue(()),
            };
            if flow.is_break() {
                break;
            }
        }
        pass.state.end_unit(unit.seq);
        pass.report
    }
}

/// Borrowed working set for a single unit's first visit.
struct UnitPass<'a> {
    reassembler: &'a mut Reassembler,
    next_transfer_id: &'a mut TransferId,
    state: &'a mut DirectionState,
    unit: &'a Unit,
    direction: Direction,
    stale: bool,
    report: UnitReport,
}

impl UnitPass<'_> {
    fn seq(&self) -> WrappingSeq { self.unit.seq }

    fn active_transfer_id(&mut self, kind: DataKind, item_index: u32) -> TransferId {
        if let Some(transfer) = self.state.transfer.as_ref() {
            return transfer.transfer_id;
        }
        let transfer_id = *self.next_transfer_id;
        *self.next_transfer_id = transfer_id.next();
        self.state.begin_transfer(
            transfer_id,
            self.unit.id,
            TransferOrigin {
                start_seq: self.seq(),
                start_item: item_index,
            },
            self.unit.timestamp,
            kind,
        );
        debug!(
            "transfer started: transfer_id={transfer_id}, unit={}, seq={}, item={item_index}, \
             direction={}",
            self.unit.id,
            self.seq(),
            self.direction
        );
        transfer_id
    }

    fn ingest_data(&mut self, kind: DataKind, item_index: u32, payload: &Bytes) -> ControlFlow<()> {
        if self.stale {
            debug!(
                "late data after transfer close ignored: unit={}, seq={}, direction={}",
                self.unit.id,
                self.seq(),
                self.direction
            );
            self.report.annotations.push(Annotation::StaleData { kind });
            return ControlFlow::Continue(());
        }
        let transfer_id = self.active_transfer_id(kind, item_index);
        let seq_distance = self
            .state
            .transfer
            .as_ref()
            .map_or(0, |transfer| self.seq().distance_from(transfer.origin.start_seq));
        let Some(fragment_seq) = self.state.place_data(self.seq(), item_index) else {
            return ControlFlow::Continue(());
        };
        match self
            .reassembler
            .add_fragment(transfer_id, fragment_seq, payload.clone(), true)
        {
            Ok(_) => {
                self.report.annotations.push(Annotation::Fragment {
                    kind,
                    transfer_id,
                    fragment_seq,
                    seq_distance,
                });
                ControlFlow::Continue(())
            }
            Err(err) => self.record_error(err),
        }
    }

    fn close_transfer(&mut self, item_index: u32, payload: &Bytes) -> ControlFlow<()> {
        let seq = self.seq();
        let Some(fragment_seq) = self.state.place_terminator(seq, item_index) else {
            if !self.report.is_retransmission {
                warn!(
                    "terminator without fragment data: unit={}, seq={seq}, direction={}",
                    self.unit.id, self.direction
                );
                self.report.annotations.push(Annotation::TerminatorWithoutData);
            }
            return ControlFlow::Continue(());
        };
        let Some(transfer) = self.state.finish_transfer(self.seq(), None) else {
            return ControlFlow::Continue(());
        };

        let closing = match self.reassembler.add_fragment(
            transfer.transfer_id,
            fragment_seq,
            payload.clone(),
            false,
        ) {
            Err(err @ AssemblyError::FragmentTooLarge { .. }) => {
                // Oversized terminator bytes are dropped; the transfer still closes.
                let _ = self.record_error(err);
                self.reassembler
                    .add_fragment(transfer.transfer_id, fragment_seq, Bytes::new(), false)
            }
            other => other,
        };
        let assembled = match closing {
            Ok(Some(assembled)) => assembled,
            Ok(None) => return ControlFlow::Continue(()),
            Err(AssemblyError::TerminatorWithoutData { .. }) => {
                self.report.annotations.push(Annotation::TerminatorWithoutData);
                return ControlFlow::Continue(());
            }
            Err(err) => return self.record_error(err),
        };

        let loss = assembled.loss();
        self.state.packets_lost = loss.packets_lost;
        self.state.burst_lost = loss.burst_lost;
        self.report.annotations.push(Annotation::Reassembled {
            kind: transfer.data_kind,
            transfer_id: transfer.transfer_id,
            packets_lost: loss.packets_lost,
            burst_lost: loss.burst_lost,
        });
        match loss.overlap() {
            Overlap::None => {}
            overlap => self.report.annotations.push(Annotation::Overlap {
                transfer_id: transfer.transfer_id,
                conflict: overlap == Overlap::Conflicting,
            }),
        }
        let fragment_count = assembled.fragment_count();
        self.report.completed.push(CompletedTransfer {
            transfer_id: transfer.transfer_id,
            first_unit: transfer.first_unit,
            closed_in: self.unit.id,
            direction: self.direction,
            data_kind: transfer.data_kind,
            start_time: transfer.start_time,
            payload: assembled.into_payload(),
            loss,
            fragment_count,
        });
        ControlFlow::Continue(())
    }

    fn abort_transfer(&mut self) {
        let Some(transfer) = self.state.finish_transfer(self.seq(), None) else {
            return;
        };
        let fragments = self.reassembler.abandon(transfer.transfer_id).unwrap_or(0);
        debug!(
            "transfer aborted: transfer_id={}, fragments={fragments}, unit={}",
            transfer.transfer_id, self.unit.id
        );
        self.report.annotations.push(Annotation::TransferAborted {
            transfer_id: transfer.transfer_id,
            fragments,
        });
    }

    fn record_error(&mut self, err: AssemblyError) -> ControlFlow<()> {
        match err {
            AssemblyError::FragmentTooLarge {
                transfer_id,
                fragment_seq,
                len,
                limit,
            } => {
                self.report.annotations.push(Annotation::FragmentRejected {
                    transfer_id,
                    fragment_seq,
                    len,
                    limit,
                });
                ControlFlow::Continue(())
            }
            AssemblyError::TerminatorWithoutData { .. } => {
                self.report.annotations.push(Annotation::TerminatorWithoutData);
                ControlFlow::Continue(())
            }
            AssemblyError::Allocation {
                transfer_id,
                source,
            } => {
                warn!(
                    "unit processing stopped: unit={}, transfer_id={transfer_id}, error={source}",
                    self.unit.id
                );
                self.report
                    .annotations
                    .push(Annotation::ResourceExhausted { transfer_id });
                ControlFlow::Break(())
            }
        }
    }
}
