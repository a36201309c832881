//! Layered error definitions
//!
//! Categorized by source: configuration / decode / format / consistency / resource

use std::path::PathBuf;

use thiserror::Error;

/// Coarse error category, used by callers that only need to know how a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Detected before streaming starts, nothing was written
    Configuration,
    /// An encoded payload whose format cannot be determined
    Format,
    /// Cross-stream invariant violated inside a tuple
    Consistency,
    /// Filesystem / storage failure
    Resource,
    /// Anything else (decode failures, ordering violations)
    Other,
}

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Requested stream does not exist (or has an unresolvable type)
    #[error("stream '{stream}' not found (available: {})", .available.join(", "))]
    UnknownStream {
        stream: String,
        available: Vec<String>,
    },

    /// Export format selector not recognised
    #[error("unknown export format '{format}'")]
    UnknownExportFormat { format: String },

    /// Export destination already exists, refusing to overwrite
    #[error("path '{}' exists already", .path.display())]
    DestinationExists { path: PathBuf },

    // ===== Data Errors =====
    /// Raw record bytes could not be deserialized
    #[error("failed to decode record on stream '{stream}': {message}")]
    Decode { stream: String, message: String },

    /// Encoded image blob of unknown format
    #[error("cannot determine {what} format: {message}")]
    Format { what: String, message: String },

    /// Cross-stream consistency violation
    #[error("inconsistent tuple: {message}")]
    Consistency { message: String },

    /// Timestamp went backwards within a stream under strict ordering
    #[error("out-of-order record on stream '{stream}': {timestamp_ns}ns < last {last_ns}ns")]
    OutOfOrder {
        stream: String,
        timestamp_ns: i64,
        last_ns: i64,
    },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create unknown stream error with the list of streams that do exist
    pub fn unknown_stream<I, S>(stream: impl Into<String>, available: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::UnknownStream {
            stream: stream.into(),
            available: available.into_iter().map(Into::into).collect(),
        }
    }

    /// Create decode error
    pub fn decode(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create format error
    pub fn format(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Format {
            what: what.into(),
            message: message.into(),
        }
    }

    /// Create consistency error
    pub fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency {
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Error category
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigParse { .. }
            | Self::ConfigValidation { .. }
            | Self::UnknownStream { .. }
            | Self::UnknownExportFormat { .. }
            | Self::DestinationExists { .. } => ErrorKind::Configuration,
            Self::Format { .. } => ErrorKind::Format,
            Self::Consistency { .. } => ErrorKind::Consistency,
            Self::Io(_) | Self::SinkWrite { .. } => ErrorKind::Resource,
            Self::Decode { .. } | Self::OutOfOrder { .. } | Self::Other(_) => ErrorKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_stream_lists_available() {
        let err = ContractError::unknown_stream("/pose", ["/rgb", "/depth"]);
        assert_eq!(
            err.to_string(),
            "stream '/pose' not found (available: /rgb, /depth)"
        );
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            ContractError::DestinationExists {
                path: PathBuf::from("/tmp/x")
            }
            .kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            ContractError::format("colour", "no magic").kind(),
            ErrorKind::Format
        );
        assert_eq!(
            ContractError::consistency("frame ids differ").kind(),
            ErrorKind::Consistency
        );
        let io = std::io::Error::other("disk full");
        assert_eq!(ContractError::from(io).kind(), ErrorKind::Resource);
    }
}
