//! Command line interface for the `segments` binary.
//!
//! `split` fragments a payload read from stdin; `join` reassembles fragments
//! read line by line from stdin.

use std::num::{NonZeroU32, NonZeroUsize};

use clap::{Parser, Subcommand};

/// Command line arguments for the `segments` binary.
#[derive(Debug, Parser)]
#[command(
    name = "segments",
    version,
    about = "Split payloads into fragments and join them back together"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Operation to perform.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Read a UTF-8 payload from stdin and print one JSON fragment per line.
    Split {
        /// Correlation identifier shared by every fragment.
        #[arg(short, long)]
        id: String,
        /// Maximum encoded size of a single fragment in bytes.
        #[arg(short = 'm', long, default_value_t = 200)]
        max_bytes: usize,
    },
    /// Read JSON fragments from stdin and print each reassembled message.
    Join {
        /// Seconds a partial message may stay idle before it is discarded.
        #[arg(short, long, default_value_t = 30)]
        timeout_secs: u64,
        /// Seconds between sweeps for idle partial messages.
        #[arg(short, long, default_value_t = 1)]
        sweep_interval_secs: u64,
        /// Reject messages declaring more fragments than this. Unbounded when
        /// omitted.
        #[arg(long)]
        max_fragments: Option<NonZeroU32>,
        /// Discard messages buffering more payload bytes than this. Unbounded
        /// when omitted.
        #[arg(long)]
        max_message_size: Option<NonZeroUsize>,
    },
}
