#![doc(html_root_url = "https://docs.rs/faxframe/latest")]
//! Public API for the `faxframe` library.
//!
//! This crate reassembles fax transfers that were split across
//! sequence-numbered T.38 units, tolerating loss, duplication, and sequence
//! wraparound, and reports per-transfer loss statistics. Results are
//! idempotent: revisiting a unit reproduces its first-visit report.

pub mod config;
pub mod engine;
pub mod fragment;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod replay;
pub mod sequence;
pub mod session;
pub mod trace;
pub mod unit;

pub use config::EngineConfig;
pub use engine::{Annotation, CompletedTransfer, Engine, TransferConsumer, UnitReport};
pub use fragment::{AssemblyError, LossReport, Overlap, Reassembler, TransferId};
pub use sequence::{FragmentSeq, WrappingSeq};
pub use session::{Direction, SessionKey, SetupInfo};
pub use unit::{DataItem, DataKind, EndpointPair, ItemKind, RawUnit, Unit, UnitDecoder, UnitId};
