//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Channel presence occupancy analyzer.
///
/// Derives presence intervals and coverage statistics for the publisher
/// and subscriber roles of a tracked channel over a bounded window.
#[derive(Debug, Parser)]
#[command(name = "occ", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Analyze presence coverage over a window.
    Analyze {
        /// Window start (RFC 3339 or epoch milliseconds).
        #[arg(long)]
        start: String,

        /// Window end, exclusive (RFC 3339 or epoch milliseconds).
        #[arg(long)]
        end: String,

        /// Channel to fetch history for. Required unless --input is given.
        #[arg(long)]
        channel: Option<String>,

        /// Read events from a local JSON file instead of the history service.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Split the window into consecutive sub-windows of this many minutes.
        #[arg(long)]
        split_minutes: Option<i64>,

        /// Count presence still open when the event data ends, up to the
        /// window end. By default such trailing presence is dropped.
        #[arg(long)]
        include_open: bool,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}
