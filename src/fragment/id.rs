use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Correlation key shared by the fragments of one transfer.
///
/// The wire format carries no transfer identifier, so the engine allocates
/// these from a one-up counter when a transfer begins.
///
/// # Examples
///
/// ```
/// use faxframe::fragment::TransferId;
/// let id = TransferId::new(42);
/// assert_eq!(id.get(), 42);
/// assert_eq!(id.next(), TransferId::new(43));
/// ```
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into, Serialize, Deserialize,
)]
#[display("{_0}")]
pub struct TransferId(u64);

impl TransferId {
    /// Create a new identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self { Self(value) }

    /// Return the inner numeric identifier.
    #[must_use]
    pub const fn get(self) -> u64 { self.0 }

    /// The identifier allocated after `self`.
    #[must_use]
    pub const fn next(self) -> Self { Self(self.0.wrapping_add(1)) }
}
