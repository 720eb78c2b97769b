//! Fragment buffering, reassembly, and loss estimation.
//!
//! Fragments are keyed by [`TransferId`] and positioned by their derived
//! offset. Closing a transfer concatenates the first-seen payload at each
//! offset and walks the offsets for gaps and duplicates.

pub mod error;
pub mod estimate;
pub mod id;
pub mod reassembler;

pub use error::AssemblyError;
pub use estimate::{LossReport, Overlap};
pub use id::TransferId;
pub use reassembler::{AssembledTransfer, Fragment, Reassembler};
