//! Capture traces: a replayable sequence of setup events and decoded units.
//!
//! Traces are written with `bincode`'s standard configuration through its
//! serde bridge, one length-prefixed vector of [`TraceRecord`]s per file.

use bincode::{
    config,
    error::{DecodeError, EncodeError},
    serde::{decode_from_slice, encode_to_vec},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    engine::{Engine, UnitReport},
    session::SetupInfo,
    unit::{EndpointPair, Unit},
};

/// One entry of a capture trace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceRecord {
    /// A session negotiation observed between `endpoints`.
    Setup {
        /// Endpoints the session was negotiated for.
        endpoints: EndpointPair,
        /// How and where it was negotiated.
        info: SetupInfo,
    },
    /// A decoded unit.
    Unit(Unit),
}

/// Errors raised while reading or writing traces.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The records could not be encoded.
    #[error("failed to encode trace: {0}")]
    Encode(#[from] EncodeError),
    /// The bytes are not a valid trace.
    #[error("failed to decode trace: {0}")]
    Decode(#[from] DecodeError),
    /// Bytes remained after the last record.
    #[error("trace has {remaining} trailing bytes")]
    TrailingBytes {
        /// Unconsumed byte count.
        remaining: usize,
    },
}

/// Encode `records` as a trace.
///
/// # Errors
///
/// Returns [`TraceError::Encode`] when a record cannot be serialized.
pub fn write_trace(records: &[TraceRecord]) -> Result<Vec<u8>, TraceError> {
    Ok(encode_to_vec(records, config::standard())?)
}

/// Decode a trace produced by [`write_trace`].
///
/// # Errors
///
/// Returns [`TraceError::Decode`] for malformed input and
/// [`TraceError::TrailingBytes`] when the buffer holds more than one trace.
pub fn read_trace(bytes: &[u8]) -> Result<Vec<TraceRecord>, TraceError> {
    let (records, consumed): (Vec<TraceRecord>, usize) =
        decode_from_slice(bytes, config::standard())?;
    match bytes.len().saturating_sub(consumed) {
        0 => Ok(records),
        remaining => Err(TraceError::TrailingBytes { remaining }),
    }
}

/// Apply one record to `engine`.
///
/// Returns the unit's report, or `None` for setup records.
pub fn feed(engine: &mut Engine, record: &TraceRecord) -> Option<UnitReport> {
    match record {
        TraceRecord::Setup { endpoints, info } => {
            engine.register_setup(*endpoints, info.method.clone(), info.unit);
            None
        }
        TraceRecord::Unit(unit) => Some(engine.process(unit)),
    }
}
