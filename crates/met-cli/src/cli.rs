//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Module engagement tracker.
///
/// Replays recorded page event logs through the engagement engine to
/// inspect, aggregate or transmit the reports a live session would send.
#[derive(Debug, Parser)]
#[command(name = "met", version, about, long_about = None)]
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
    /// Replay an event log and print the generated reports as JSONL.
    Replay {
        /// Path to the event log, or `-` for stdin.
        log: PathBuf,

        /// Visitor ID to report under (defaults to config, then random).
        #[arg(long)]
        visitor: Option<String>,

        /// Session ID to report under (defaults to a generated one).
        #[arg(long)]
        session: Option<String>,

        /// Pretty-print each report instead of one line per report.
        #[arg(long)]
        pretty: bool,
    },

    /// Replay an event log and print per-module engagement totals.
    Summary {
        /// Path to the event log, or `-` for stdin.
        log: PathBuf,

        /// Output machine-readable JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Replay an event log and transmit every report to the backend.
    Send {
        /// Path to the event log, or `-` for stdin.
        log: PathBuf,

        /// Backend base URL (defaults to config).
        #[arg(long)]
        endpoint: Option<String>,

        /// Visitor ID (defaults to config).
        #[arg(long)]
        visitor: Option<String>,
    },
}
