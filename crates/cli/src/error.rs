//! Error types for CLI operations.

use std::path::PathBuf;

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {}", .path.display())]
    ConfigNotFound { path: PathBuf },

    /// Recorded log not found
    #[error("Recorded log not found: {}", .path.display())]
    LogNotFound { path: PathBuf },

    /// Neither a flag nor the job file provides a value
    #[error("missing {what}: pass {flag} or set it in --config")]
    MissingOption {
        what: &'static str,
        flag: &'static str,
    },

    /// `--range` needs exactly START and END
    #[error("--range expects START END, got {count} value(s)")]
    InvalidRange { count: usize },

    /// Export did not run to completion
    #[error("Export interrupted after {frames} frame(s)")]
    Interrupted { frames: u64 },
}

impl CliError {
    pub fn missing(what: &'static str, flag: &'static str) -> Self {
        Self::MissingOption { what, flag }
    }
}
