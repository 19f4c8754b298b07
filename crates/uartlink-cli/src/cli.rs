//! Command-line interface definitions and parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan for the bridge hardware, link it, and stream its frames
    Stream {
        /// Scan window in seconds before giving up
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Save the captured stream to a trace file on exit
        #[arg(long)]
        export: bool,
    },
    /// Open the system Bluetooth settings for a manual radio reset
    Settings,
    /// Show where configuration is read from
    ConfigPath,
}
