//! Error types emitted by the fragment layer.
//!
//! Every variant is local to a single fragment or unit: none of them abort
//! the transfer they belong to or touch other transfers.

use std::{collections::TryReserveError, num::NonZeroUsize};

use thiserror::Error;

use super::TransferId;
use crate::sequence::FragmentSeq;

/// Errors produced by [`Reassembler`](crate::fragment::Reassembler).
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// The fragment payload exceeds the configured bound and was dropped.
    #[error(
        "fragment {fragment_seq} of transfer {transfer_id} too large: {len} bytes exceeds \
         {limit}"
    )]
    FragmentTooLarge {
        /// Transfer the fragment belonged to.
        transfer_id: TransferId,
        /// Offset of the dropped fragment.
        fragment_seq: FragmentSeq,
        /// Payload length of the dropped fragment.
        len: usize,
        /// Configured per-fragment bound.
        limit: NonZeroUsize,
    },
    /// A terminator arrived for a transfer that never buffered a fragment.
    #[error("terminator for transfer {transfer_id} without any fragment data")]
    TerminatorWithoutData {
        /// Transfer the terminator referenced.
        transfer_id: TransferId,
    },
    /// The pending-fragment store could not grow.
    #[error("allocation failed while buffering transfer {transfer_id}: {source}")]
    Allocation {
        /// Transfer being buffered or assembled.
        transfer_id: TransferId,
        /// Underlying allocator failure.
        #[source]
        source: TryReserveError,
    },
}
