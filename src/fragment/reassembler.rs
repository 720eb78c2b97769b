//! Inbound helper that stitches fragments back into complete transfers.
//!
//! [`Reassembler`] buffers fragment payloads keyed by [`TransferId`] in an
//! offset-ordered pending list. Fragments may arrive in any order and may
//! repeat an offset; nothing is concatenated until a terminator closes the
//! transfer, at which point [`estimate`](super::estimate) walks the list to
//! produce the contiguous buffer and its loss statistics.

use std::{
    collections::{HashMap, TryReserveError},
    num::NonZeroUsize,
};

use bytes::Bytes;
use tracing::{debug, trace, warn};

use super::{AssemblyError, LossReport, TransferId, estimate};
use crate::sequence::FragmentSeq;

/// One buffered chunk of a transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment {
    /// Position of the chunk inside the transfer.
    pub fragment_seq: FragmentSeq,
    /// Chunk bytes; empty for a pure terminator.
    pub payload: Bytes,
    /// Whether this fragment closed the transfer.
    pub is_terminal: bool,
}

impl Fragment {
    /// A data chunk at `fragment_seq`.
    #[must_use]
    pub fn data(fragment_seq: FragmentSeq, payload: impl Into<Bytes>) -> Self {
        Self {
            fragment_seq,
            payload: payload.into(),
            is_terminal: false,
        }
    }

    /// A closing marker at `fragment_seq`.
    #[must_use]
    pub fn terminal(fragment_seq: FragmentSeq, payload: impl Into<Bytes>) -> Self {
        Self {
            fragment_seq,
            payload: payload.into(),
            is_terminal: true,
        }
    }
}

#[derive(Debug, Default)]
struct PendingTransfer {
    fragments: Vec<Fragment>,
}

impl PendingTransfer {
    /// Insert after any fragments already buffered at the same offset so the
    /// first-seen copy stays first.
    fn insert(&mut self, fragment: Fragment) -> Result<(), TryReserveError> {
        self.fragments.try_reserve(1)?;
        let position = self
            .fragments
            .partition_point(|buffered| buffered.fragment_seq <= fragment.fragment_seq);
        self.fragments.insert(position, fragment);
        Ok(())
    }
}

/// Container for a closed, reassembled transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssembledTransfer {
    transfer_id: TransferId,
    payload: Bytes,
    loss: LossReport,
    fragment_count: usize,
}

impl AssembledTransfer {
    /// Identifier shared by the fragments that formed this transfer.
    #[must_use]
    pub const fn transfer_id(&self) -> TransferId { self.transfer_id }

    /// Borrow the reassembled bytes.
    #[must_use]
    pub fn payload(&self) -> &Bytes { &self.payload }

    /// Consume the transfer, returning the owned bytes.
    #[must_use]
    pub fn into_payload(self) -> Bytes { self.payload }

    /// Loss and overlap statistics computed at closure.
    #[must_use]
    pub const fn loss(&self) -> LossReport { self.loss }

    /// Number of fragments buffered, terminator and duplicates included.
    #[must_use]
    pub const fn fragment_count(&self) -> usize { self.fragment_count }
}

/// Stateful fragment reassembler keyed by transfer.
///
/// # Examples
///
/// ```
/// use std::num::NonZeroUsize;
///
/// use bytes::Bytes;
/// use faxframe::{
///     fragment::{Reassembler, TransferId},
///     sequence::FragmentSeq,
/// };
///
/// let mut reassembler = Reassembler::new(NonZeroUsize::new(64).expect("non-zero"));
/// let id = TransferId::new(1);
/// let first = reassembler
///     .add_fragment(id, FragmentSeq::new(0), Bytes::from_static(b"fax"), true)
///     .expect("fragment accepted");
/// assert!(first.is_none());
/// let closed = reassembler
///     .add_fragment(id, FragmentSeq::new(1), Bytes::new(), false)
///     .expect("terminator accepted")
///     .expect("terminator closes the transfer");
/// assert_eq!(closed.payload().as_ref(), b"fax");
/// assert_eq!(closed.loss().packets_lost, 0);
/// ```
#[derive(Debug)]
pub struct Reassembler {
    max_fragment_len: NonZeroUsize,
    pending: HashMap<TransferId, PendingTransfer>,
}

impl Reassembler {
    /// Create a reassembler that drops fragments longer than `max_fragment_len`.
    #[must_use]
    pub fn new(max_fragment_len: NonZeroUsize) -> Self {
        Self {
            max_fragment_len,
            pending: HashMap::new(),
        }
    }

    /// Buffer a fragment, closing the transfer when `more_fragments` is false.
    ///
    /// Returns `Ok(Some(_))` when the fragment closed the transfer and
    /// `Ok(None)` while it stays open. Nothing is kept once a transfer closes,
    /// so identifiers must not be reused; late data is filtered by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::FragmentTooLarge`] when the payload exceeds the
    /// configured bound; the fragment is dropped but the transfer stays open.
    /// Returns [`AssemblyError::TerminatorWithoutData`] when a terminator names
    /// a transfer that never received a fragment, and
    /// [`AssemblyError::Allocation`] when the pending store cannot grow.
    pub fn add_fragment(
        &mut self,
        transfer_id: TransferId,
        fragment_seq: FragmentSeq,
        payload: Bytes,
        more_fragments: bool,
    ) -> Result<Option<AssembledTransfer>, AssemblyError> {
        if payload.len() > self.max_fragment_len.get() {
            warn!(
                "fragment dropped: transfer_id={transfer_id}, fragment_seq={fragment_seq}, \
                 len={}, limit={}",
                payload.len(),
                self.max_fragment_len
            );
            self.pending.entry(transfer_id).or_default();
            return Err(AssemblyError::FragmentTooLarge {
                transfer_id,
                fragment_seq,
                len: payload.len(),
                limit: self.max_fragment_len,
            });
        }

        if more_fragments {
            trace!("fragment buffered: transfer_id={transfer_id}, fragment_seq={fragment_seq}");
            return self
                .pending
                .entry(transfer_id)
                .or_default()
                .insert(Fragment::data(fragment_seq, payload))
                .map(|()| None)
                .map_err(|source| AssemblyError::Allocation {
                    transfer_id,
                    source,
                });
        }

        let Some(mut partial) = self.pending.remove(&transfer_id) else {
            return Err(AssemblyError::TerminatorWithoutData { transfer_id });
        };
        partial
            .insert(Fragment::terminal(fragment_seq, payload))
            .map_err(|source| AssemblyError::Allocation {
                transfer_id,
                source,
            })?;
        let (payload, loss) =
            estimate::assemble(&partial.fragments).map_err(|source| AssemblyError::Allocation {
                transfer_id,
                source,
            })?;
        debug!(
            "transfer reassembled: transfer_id={transfer_id}, len={}, packets_lost={}, \
             burst_lost={}",
            payload.len(),
            loss.packets_lost,
            loss.burst_lost
        );
        Ok(Some(AssembledTransfer {
            transfer_id,
            payload,
            loss,
            fragment_count: partial.fragments.len(),
        }))
    }

    /// Discard a transfer without assembling it.
    ///
    /// Returns the number of fragments dropped, or `None` when the transfer
    /// had nothing buffered.
    pub fn abandon(&mut self, transfer_id: TransferId) -> Option<usize> {
        let dropped = self.pending.remove(&transfer_id)?.fragments.len();
        debug!("transfer abandoned: transfer_id={transfer_id}, fragments={dropped}");
        Some(dropped)
    }

    /// Number of transfers currently buffering fragments.
    #[must_use]
    pub fn buffered_len(&self) -> usize { self.pending.len() }

    /// Number of fragments buffered for `transfer_id`.
    #[must_use]
    pub fn fragment_count(&self, transfer_id: TransferId) -> usize {
        self.pending
            .get(&transfer_id)
            .map_or(0, |partial| partial.fragments.len())
    }
}
