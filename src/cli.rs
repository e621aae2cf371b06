//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Fetch a URL and print its structured response descriptor as JSON.
///
/// Bodies larger than the in-memory threshold, or of unknown length, are
/// spooled to a temporary file that is removed when the command exits.
#[derive(Parser, Debug)]
#[command(name = "response-mapper")]
#[command(author, version, about)]
pub struct Args {
    /// URL to request
    pub url: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Largest body (in bytes) kept in memory; larger bodies are spooled (max 1 GiB)
    #[arg(long = "max-in-memory", value_name = "BYTES", value_parser = clap::value_parser!(u64).range(0..=1_073_741_824))]
    pub max_in_memory: Option<u64>,

    /// Directory for spool files (default: system temp dir)
    #[arg(long, value_name = "DIR")]
    pub spool_dir: Option<PathBuf>,

    /// Connect timeout in seconds (1-3600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: Option<u64>,

    /// Overall request timeout in seconds (1-3600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: Option<u64>,

    /// Write the raw response body to this file
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print single-line JSON instead of pretty output
    #[arg(long)]
    pub compact: bool,

    /// Config file (default: $XDG_CONFIG_HOME/response-mapper/config.toml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
