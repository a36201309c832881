//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// RGB-D Export - synchronized RGB-D dataset export from recorded sensor logs
#[derive(Parser, Debug)]
#[command(
    name = "rgbd-export",
    author,
    version,
    about = "Export synchronized RGB-D datasets from recorded sensor logs",
    long_about = "Plays a recorded sensor log once, aligns colour, depth, calibration and\n\
                  (optionally) pose records by receive time, and writes each synchronized\n\
                  frame to a dataset on disk."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "RGBD_EXPORT_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "RGBD_EXPORT_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export a dataset from a recorded log
    Export(ExportArgs),

    /// Validate an export job file without running it
    Validate(ValidateArgs),

    /// List the streams of a recorded log
    Info(InfoArgs),
}

/// Arguments for the `export` command
///
/// Flags override values from `--config`.
#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Recorded log directory
    pub log: Option<PathBuf>,

    /// Colour image stream
    #[arg(short = 'c', long = "colour", visible_alias = "color", alias = "topic_colour")]
    pub colour: Option<String>,

    /// Depth image stream
    #[arg(short = 'd', long, alias = "topic_depth")]
    pub depth: Option<String>,

    /// Camera info stream
    #[arg(short = 'i', long, alias = "topic_info")]
    pub info: Option<String>,

    /// Camera pose stream (optional)
    #[arg(short = 'p', long, alias = "topic_pose")]
    pub pose: Option<String>,

    /// Export format
    #[arg(short = 'f', long, env = "RGBD_EXPORT_FORMAT")]
    pub format: Option<String>,

    /// Export destination (must not exist)
    #[arg(short = 'e', long = "export")]
    pub export_path: Option<PathBuf>,

    /// Time range in seconds since the first record: START END
    #[arg(short = 'r', long, num_args = 2, value_names = ["START", "END"])]
    pub range: Option<Vec<f64>>,

    /// Per-stream queue size
    #[arg(long = "sync-queue-size", alias = "sync_queue_size")]
    pub sync_queue_size: Option<usize>,

    /// Synchronization tolerance in seconds
    #[arg(long = "sync-slop", alias = "sync_slop")]
    pub sync_slop: Option<f64>,

    /// Export job file (TOML or JSON)
    #[arg(long, env = "RGBD_EXPORT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "RGBD_EXPORT_METRICS_PORT")]
    pub metrics_port: u16,

    /// Print the merged job and exit without exporting
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to the export job file to validate
    #[arg(short, long, default_value = "export.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Recorded log directory
    pub log: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
