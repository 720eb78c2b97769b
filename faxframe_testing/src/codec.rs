//! Minimal wire format for exercising [`UnitDecoder`] seams.
//!
//! Layout: a big-endian `u16` sequence number, a `u8` item count, then for
//! each item its `field-type` byte, a big-endian `u16` length, and the
//! payload bytes.

use std::io;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use faxframe::{
    DataItem,
    DataKind,
    ItemKind,
    WrappingSeq,
    unit::{DecodedUnit, UnitDecoder},
};

/// Decoder for the test wire format.
#[derive(Clone, Copy, Debug, Default)]
pub struct FieldCodec;

const fn field_type(kind: ItemKind) -> u8 {
    match kind {
        ItemKind::Data(DataKind::Hdlc) => 0,
        ItemKind::Data(DataKind::T4NonEcm) => 6,
        ItemKind::TerminatorOk => 2,
        ItemKind::TerminatorBad => 3,
        ItemKind::NonData => 8,
    }
}

fn truncated(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, format!("{what} truncated"))
}

/// Encode a unit in the test wire format.
///
/// # Panics
///
/// Panics if there are more than 255 items or an item exceeds 65535 bytes.
#[must_use]
pub fn encode_unit(seq: u16, items: &[DataItem]) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_u16(seq);
    buf.put_u8(u8::try_from(items.len()).expect("item count fits in u8"));
    for item in items {
        buf.put_u8(field_type(item.kind));
        buf.put_u16(u16::try_from(item.payload.len()).expect("item length fits in u16"));
        buf.put_slice(&item.payload);
    }
    buf.freeze()
}

impl UnitDecoder for FieldCodec {
    fn decode(&self, mut bytes: &[u8]) -> Result<DecodedUnit, io::Error> {
        if bytes.remaining() < 3 {
            return Err(truncated("unit header"));
        }
        let seq = WrappingSeq::new(bytes.get_u16());
        let count = bytes.get_u8();
        let mut items = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            if bytes.remaining() < 3 {
                return Err(truncated("item header"));
            }
            let raw_type = bytes.get_u8();
            let kind = ItemKind::from_field_type(raw_type).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unknown field type {raw_type}"),
                )
            })?;
            let len = usize::from(bytes.get_u16());
            if bytes.remaining() < len {
                return Err(truncated("item payload"));
            }
            items.push(DataItem {
                kind,
                payload: bytes.copy_to_bytes(len),
            });
        }
        Ok(DecodedUnit { seq, items })
    }
}
