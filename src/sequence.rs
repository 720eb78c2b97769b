//! Wrap-aware sequence arithmetic.
//!
//! UDPTL units carry a 16-bit sequence counter that wraps to zero, and a
//! single unit may pack several data items. Neither value alone positions a
//! fragment inside a transfer, so [`derive_fragment_seq`] combines the
//! counter, the item position, and an accumulated correction term into a
//! monotonic [`FragmentSeq`] space.

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// 16-bit wrapping sequence number carried by every unit.
///
/// # Examples
///
/// ```
/// use faxframe::sequence::WrappingSeq;
/// let last = WrappingSeq::new(u16::MAX);
/// assert_eq!(last.next(), WrappingSeq::new(0));
/// assert_eq!(WrappingSeq::new(1).distance_from(last), 2);
/// ```
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    From,
    Into,
    Serialize,
    Deserialize,
)]
#[display("{_0:05}")]
pub struct WrappingSeq(u16);

impl WrappingSeq {
    /// Construct a sequence number from its wire value.
    #[must_use]
    pub const fn new(value: u16) -> Self { Self(value) }

    /// Return the wire value.
    #[must_use]
    pub const fn get(self) -> u16 { self.0 }

    /// Number of forward steps from `start` to `self`, modulo 2^16.
    #[must_use]
    pub const fn distance_from(self, start: Self) -> u16 { self.0.wrapping_sub(start.0) }

    /// The sequence number that follows `self` on the wire.
    #[must_use]
    pub const fn next(self) -> Self { Self(self.0.wrapping_add(1)) }
}

/// Zero-based offset of a fragment within its transfer.
///
/// Loss is counted in these units rather than in bytes.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    From,
    Into,
    Serialize,
    Deserialize,
)]
#[display("{_0}")]
pub struct FragmentSeq(u32);

impl FragmentSeq {
    /// Construct an offset from a raw value.
    #[must_use]
    pub const fn new(value: u32) -> Self { Self(value) }

    /// The first offset of every transfer.
    #[must_use]
    pub const fn zero() -> Self { Self(0) }

    /// Return the raw offset.
    #[must_use]
    pub const fn get(self) -> u32 { self.0 }

    /// The offset immediately after `self`, saturating at `u32::MAX`.
    #[must_use]
    pub const fn successor(self) -> Self { Self(self.0.saturating_add(1)) }
}

/// Where the active transfer began on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOrigin {
    /// Wrapping sequence of the unit carrying the first fragment.
    pub start_seq: WrappingSeq,
    /// Item position of the first fragment inside that unit.
    pub start_item: u32,
}

/// Map a wire position onto the transfer's fragment-sequence space.
///
/// `extra_item_count` is the number of additional data items packed into
/// earlier units of the transfer; it keeps offsets collision-free when units
/// carry more than one fragment.
///
/// # Examples
///
/// ```
/// use faxframe::sequence::{FragmentSeq, TransferOrigin, WrappingSeq, derive_fragment_seq};
/// let origin = TransferOrigin {
///     start_seq: WrappingSeq::new(65_535),
///     start_item: 0,
/// };
/// assert_eq!(
///     derive_fragment_seq(origin, WrappingSeq::new(1), 0, 0),
///     FragmentSeq::new(2)
/// );
/// ```
#[must_use]
pub fn derive_fragment_seq(
    origin: TransferOrigin,
    seq: WrappingSeq,
    item_index: u32,
    extra_item_count: u32,
) -> FragmentSeq {
    let offset = if seq == origin.start_seq {
        extra_item_count
            .saturating_add(item_index)
            .saturating_sub(origin.start_item)
    } else {
        u32::from(seq.distance_from(origin.start_seq))
            .saturating_add(extra_item_count)
            .saturating_add(item_index)
    };
    FragmentSeq::new(offset)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn origin(start_seq: u16, start_item: u32) -> TransferOrigin {
        TransferOrigin {
            start_seq: WrappingSeq::new(start_seq),
            start_item,
        }
    }

    #[rstest]
    #[case(10, 0, 10, 0, 0, 0)]
    #[case(10, 0, 11, 0, 0, 1)]
    #[case(10, 0, 13, 1, 0, 4)]
    #[case(10, 2, 10, 3, 0, 1)]
    #[case(10, 2, 11, 0, 1, 2)]
    #[case(65_534, 0, 65_535, 0, 0, 1)]
    #[case(65_534, 0, 0, 0, 0, 2)]
    #[case(65_534, 0, 1, 0, 0, 3)]
    fn derives_offsets(
        #[case] start_seq: u16,
        #[case] start_item: u32,
        #[case] seq: u16,
        #[case] item_index: u32,
        #[case] extra: u32,
        #[case] expected: u32,
    ) {
        let derived = derive_fragment_seq(
            origin(start_seq, start_item),
            WrappingSeq::new(seq),
            item_index,
            extra,
        );
        assert_eq!(derived, FragmentSeq::new(expected));
    }

    #[test]
    fn item_before_transfer_start_clamps_to_zero() {
        let derived = derive_fragment_seq(origin(7, 3), WrappingSeq::new(7), 1, 0);
        assert_eq!(derived, FragmentSeq::zero());
    }

    #[test]
    fn wrapping_seq_displays_zero_padded() {
        assert_eq!(WrappingSeq::new(42).to_string(), "00042");
    }
}
