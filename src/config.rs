//! Engine configuration.
//!
//! Hosts may embed [`EngineConfig`] in their own configuration files; it
//! derives `serde` traits for that purpose.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// Largest `field-data` octet string a T.38 data item can carry.
pub const DEFAULT_MAX_FRAGMENT_LEN: NonZeroUsize = NonZeroUsize::MIN.saturating_add(65_534);

/// Settings that bound per-fragment resource usage and history retention.
///
/// # Examples
///
/// ```
/// use std::num::NonZeroUsize;
///
/// use faxframe::config::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_max_fragment_len(NonZeroUsize::new(512).expect("non-zero"))
///     .with_history(false);
/// assert_eq!(config.max_fragment_len.get(), 512);
/// assert!(!config.record_history);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fragments with longer payloads are dropped and counted as loss.
    pub max_fragment_len: NonZeroUsize,
    /// Keep a snapshot of each unit's direction state for later lookup.
    pub record_history: bool,
}

impl EngineConfig {
    /// Replace the per-fragment payload bound.
    #[must_use]
    pub const fn with_max_fragment_len(mut self, max_fragment_len: NonZeroUsize) -> Self {
        self.max_fragment_len = max_fragment_len;
        self
    }

    /// Enable or disable per-unit state snapshots.
    #[must_use]
    pub const fn with_history(mut self, record_history: bool) -> Self {
        self.record_history = record_history;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_fragment_len: DEFAULT_MAX_FRAGMENT_LEN,
            record_history: true,
        }
    }
}
