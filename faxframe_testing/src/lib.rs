//! Test utilities for driving a [`faxframe::Engine`] with scripted units.
//!
//! ```rust
//! use faxframe::Engine;
//! use faxframe_testing::UnitScript;
//!
//! let units = UnitScript::new(faxframe_testing::endpoints())
//!     .hdlc(10, b"\xff\x03")
//!     .terminator(11)
//!     .build();
//! let mut engine = Engine::default();
//! let reports: Vec<_> = units.iter().map(|unit| engine.process(unit)).collect();
//! assert_eq!(reports[1].completed[0].payload.as_ref(), b"\xff\x03");
//! ```

pub mod codec;
pub mod logging;
pub mod script;

pub use codec::{FieldCodec, encode_unit};
pub use logging::{LoggerHandle, logger};
pub use script::{UnitScript, endpoints};
