//! Loss and overlap estimation for closed transfers.
//!
//! The logical transfer has no declared length, so loss is inferred from the
//! holes in the buffered offset sequence. Each offset counts as one logical
//! fragment regardless of its byte length.

use std::collections::TryReserveError;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::Fragment;
use crate::sequence::FragmentSeq;

/// How fragments sharing an offset compared with each other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Overlap {
    /// Every offset was seen at most once.
    #[default]
    None,
    /// Repeated offsets carried identical bytes (pure retransmission).
    Consistent,
    /// At least one repeated offset carried different bytes.
    Conflicting,
}

/// Loss statistics computed when a transfer closes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LossReport {
    /// Total number of missing offsets below the highest observed offset.
    pub packets_lost: u32,
    /// Size of the largest single run of missing offsets.
    pub burst_lost: u32,
    /// Number of fragments that repeated an already buffered offset.
    pub duplicates: u32,
    /// Number of repeated fragments whose bytes differed from the kept copy.
    pub conflicts: u32,
}

impl LossReport {
    /// Summarise the duplicate counters.
    #[must_use]
    pub const fn overlap(&self) -> Overlap {
        if self.conflicts > 0 {
            Overlap::Conflicting
        } else if self.duplicates > 0 {
            Overlap::Consistent
        } else {
            Overlap::None
        }
    }
}

/// Walk offset-ordered fragments and count the holes between them.
///
/// Fragments repeating an offset never count as loss.
///
/// # Examples
///
/// ```
/// use faxframe::{
///     fragment::{Fragment, estimate::count_gaps},
///     sequence::FragmentSeq,
/// };
/// let fragments: Vec<_> = [0_u32, 5, 6]
///     .into_iter()
///     .map(|offset| Fragment::data(FragmentSeq::new(offset), b"x".as_slice()))
///     .collect();
/// assert_eq!(count_gaps(&fragments), (4, 4));
/// ```
#[must_use]
pub fn count_gaps(fragments: &[Fragment]) -> (u32, u32) {
    let mut cursor = FragmentSeq::zero();
    let mut packets_lost = 0_u32;
    let mut burst_lost = 0_u32;
    for fragment in fragments {
        let offset = fragment.fragment_seq;
        if offset > cursor {
            let gap = offset.get() - cursor.get();
            packets_lost = packets_lost.saturating_add(gap);
            burst_lost = burst_lost.max(gap);
        }
        cursor = cursor.max(offset.successor());
    }
    (packets_lost, burst_lost)
}

/// Concatenate fragments in offset order and compute their loss report.
///
/// The first-seen payload of each offset is kept. Later fragments at the
/// same offset are compared against it; empty fragments (terminators) are
/// never compared.
///
/// # Errors
///
/// Returns the allocator's error when the output buffer cannot be reserved.
pub fn assemble(fragments: &[Fragment]) -> Result<(Bytes, LossReport), TryReserveError> {
    let (packets_lost, burst_lost) = count_gaps(fragments);
    let mut report = LossReport {
        packets_lost,
        burst_lost,
        ..LossReport::default()
    };

    let mut kept: Vec<&Fragment> = Vec::new();
    kept.try_reserve(fragments.len())?;
    for fragment in fragments {
        match kept.last() {
            Some(first) if first.fragment_seq == fragment.fragment_seq => {
                if fragment.payload.is_empty() {
                    continue;
                }
                report.duplicates = report.duplicates.saturating_add(1);
                if first.payload != fragment.payload {
                    report.conflicts = report.conflicts.saturating_add(1);
                }
            }
            _ => kept.push(fragment),
        }
    }

    let size = kept.iter().map(|fragment| fragment.payload.len()).sum();
    let mut buffer: Vec<u8> = Vec::new();
    buffer.try_reserve_exact(size)?;
    for fragment in kept {
        buffer.extend_from_slice(&fragment.payload);
    }
    Ok((Bytes::from(buffer), report))
}
