//! Command line interface for the `faxframe` trace replayer.
//!
//! Shared with the build script, which renders the man page from it.

use std::{num::NonZeroUsize, path::PathBuf};

use clap::Parser;

/// Command line arguments for the `faxframe` binary.
#[derive(Debug, Parser)]
#[command(
    name = "faxframe",
    version,
    about = "Reassemble fax transfers from a recorded T.38 unit trace"
)]
pub struct Cli {
    /// Trace file written by `faxframe::trace::write_trace`.
    pub trace: PathBuf,

    /// Largest fragment payload accepted, in bytes.
    #[arg(long, default_value = "65535")]
    pub max_fragment_len: NonZeroUsize,

    /// Number of passes over the trace; later passes replay cached results.
    #[arg(long, default_value_t = 1)]
    pub passes: u8,

    /// Skip recording per-unit state snapshots.
    #[arg(long)]
    pub no_history: bool,

    /// Print every unit, not only those that closed a transfer or raised
    /// an anomaly.
    #[arg(short, long)]
    pub verbose: bool,
}
