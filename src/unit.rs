//! Input model consumed by the reassembly engine.
//!
//! The transport-framing collaborator supplies discrete units and the
//! decoding collaborator turns their bytes into a wrapping sequence number
//! plus an ordered list of typed data items. Both collaborators live outside
//! this crate; [`UnitDecoder`] is the seam for the latter.

use std::{fmt, io, net::SocketAddr, time::Duration};

use bytes::Bytes;
use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::sequence::WrappingSeq;

/// Capture-order index of a unit.
///
/// Indices are assigned by the host in arrival order and are unique for the
/// lifetime of an [`Engine`](crate::engine::Engine).
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
#[display("{_0}")]
pub struct UnitId(u64);

impl UnitId {
    /// Create a new identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self { Self(value) }

    /// Return the inner index.
    #[must_use]
    pub const fn get(self) -> u64 { self.0 }
}

/// Ordered pair of endpoints a unit travelled between.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointPair {
    /// Sending endpoint.
    pub src: SocketAddr,
    /// Receiving endpoint.
    pub dst: SocketAddr,
}

impl EndpointPair {
    /// Create a pair from sender and receiver addresses.
    #[must_use]
    pub const fn new(src: SocketAddr, dst: SocketAddr) -> Self { Self { src, dst } }

    /// The same pair seen from the opposite direction.
    #[must_use]
    pub const fn reversed(self) -> Self {
        Self {
            src: self.dst,
            dst: self.src,
        }
    }
}

impl fmt::Display for EndpointPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.src, self.dst)
    }
}

/// Flavour of fragment data carried by a data item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataKind {
    /// HDLC frame bytes (T.30 control signalling).
    Hdlc,
    /// Non-ECM T.4 image data.
    T4NonEcm,
}

impl DataKind {
    /// Short label used in fragment annotations.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hdlc => "HDLC",
            Self::T4NonEcm => "t4-data",
        }
    }
}

/// Classification of a single data item inside a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    /// A chunk of the logical byte stream.
    Data(DataKind),
    /// The transfer ended and its content is believed good.
    TerminatorOk,
    /// The transfer ended with a bad check sequence, or the signal dropped.
    TerminatorBad,
    /// Signalling that carries no transfer content.
    NonData,
}

impl ItemKind {
    /// Map a T.38 `Data-Field` `field-type` value onto an item kind.
    ///
    /// Returns `None` for values outside the defined enumeration.
    ///
    /// # Examples
    ///
    /// ```
    /// use faxframe::unit::{DataKind, ItemKind};
    /// assert_eq!(ItemKind::from_field_type(0), Some(ItemKind::Data(DataKind::Hdlc)));
    /// assert_eq!(ItemKind::from_field_type(7), Some(ItemKind::TerminatorOk));
    /// assert_eq!(ItemKind::from_field_type(12), None);
    /// ```
    #[must_use]
    pub const fn from_field_type(field_type: u8) -> Option<Self> {
        match field_type {
            0 => Some(Self::Data(DataKind::Hdlc)),
            6 => Some(Self::Data(DataKind::T4NonEcm)),
            2 | 4 | 7 => Some(Self::TerminatorOk),
            1 | 3 | 5 => Some(Self::TerminatorBad),
            8..=11 => Some(Self::NonData),
            _ => None,
        }
    }

    /// Whether the item contributes a fragment to the active transfer.
    #[must_use]
    pub const fn is_data(self) -> bool { matches!(self, Self::Data(_)) }
}

/// One typed item of a unit's data field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataItem {
    /// Item classification.
    pub kind: ItemKind,
    /// Raw item bytes; empty for terminators.
    pub payload: Bytes,
}

impl DataItem {
    /// A data chunk of the given kind.
    #[must_use]
    pub fn data(kind: DataKind, payload: impl Into<Bytes>) -> Self {
        Self {
            kind: ItemKind::Data(kind),
            payload: payload.into(),
        }
    }

    /// A terminator reporting a good transfer.
    #[must_use]
    pub fn terminator_ok() -> Self {
        Self {
            kind: ItemKind::TerminatorOk,
            payload: Bytes::new(),
        }
    }

    /// A terminator reporting a failed transfer.
    #[must_use]
    pub fn terminator_bad() -> Self {
        Self {
            kind: ItemKind::TerminatorBad,
            payload: Bytes::new(),
        }
    }

    /// Signalling without transfer content.
    #[must_use]
    pub fn non_data(payload: impl Into<Bytes>) -> Self {
        Self {
            kind: ItemKind::NonData,
            payload: payload.into(),
        }
    }
}

/// A decoded unit ready for reassembly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Capture-order index.
    pub id: UnitId,
    /// Endpoints the unit travelled between.
    pub endpoints: EndpointPair,
    /// Capture-relative arrival time.
    pub timestamp: Duration,
    /// Wrapping sequence number.
    pub seq: WrappingSeq,
    /// Data items in wire order.
    pub items: Vec<DataItem>,
}

impl Unit {
    /// Create a unit without items.
    #[must_use]
    pub fn new(
        id: UnitId,
        endpoints: EndpointPair,
        timestamp: Duration,
        seq: WrappingSeq,
    ) -> Self {
        Self {
            id,
            endpoints,
            timestamp,
            seq,
            items: Vec::new(),
        }
    }

    /// Append an item, returning the unit.
    #[must_use]
    pub fn with_item(mut self, item: DataItem) -> Self {
        self.items.push(item);
        self
    }
}

/// An undecoded unit as delivered by the transport-framing collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawUnit {
    /// Capture-order index.
    pub id: UnitId,
    /// Endpoints the unit travelled between.
    pub endpoints: EndpointPair,
    /// Capture-relative arrival time.
    pub timestamp: Duration,
    /// Undecoded unit bytes.
    pub bytes: Bytes,
}

/// Fields the decoding collaborator extracts from a unit's bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedUnit {
    /// Wrapping sequence number.
    pub seq: WrappingSeq,
    /// Data items in wire order.
    pub items: Vec<DataItem>,
}

/// Hook trait for the wire-format decoder.
///
/// Implementations parse only the sequence number and the data field; the
/// engine owns everything from there on.
///
/// # Examples
///
/// ```
/// use faxframe::{
///     sequence::WrappingSeq,
///     unit::{DecodedUnit, UnitDecoder},
/// };
///
/// struct SeqOnly;
///
/// impl UnitDecoder for SeqOnly {
///     fn decode(&self, bytes: &[u8]) -> Result<DecodedUnit, std::io::Error> {
///         let [hi, lo, ..] = bytes else {
///             return Err(std::io::Error::new(
///                 std::io::ErrorKind::UnexpectedEof,
///                 "sequence number truncated",
///             ));
///         };
///         Ok(DecodedUnit {
///             seq: WrappingSeq::new(u16::from_be_bytes([*hi, *lo])),
///             items: Vec::new(),
///         })
///     }
/// }
///
/// assert!(SeqOnly.decode(&[0x01]).is_err());
/// ```
pub trait UnitDecoder {
    /// Decode the sequence number and data items from `bytes`.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` when the bytes are truncated or carry values
    /// outside their declared bounds.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedUnit, io::Error>;
}

impl RawUnit {
    /// Run `decoder` over the raw bytes, producing a [`Unit`].
    ///
    /// # Errors
    ///
    /// Propagates the decoder's error unchanged.
    pub fn decode_with<D: UnitDecoder + ?Sized>(&self, decoder: &D) -> Result<Unit, io::Error> {
        let DecodedUnit { seq, items } = decoder.decode(&self.bytes)?;
        Ok(Unit {
            id: self.id,
            endpoints: self.endpoints,
            timestamp: self.timestamp,
            seq,
            items,
        })
    }
}
