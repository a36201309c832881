//! Sink factory

use std::path::Path;

use contracts::{ContractError, DatasetSink, ExportFormat};
use tracing::debug;

use crate::sinks::{IclSink, LogSink};

/// Sink boxed for use from a blocking task
pub type BoxedSink = Box<dyn DatasetSink + Send>;

/// Create the sink for an export format
///
/// # Errors
/// Sink construction failures (e.g. `DestinationExists`)
pub fn create_sink(format: ExportFormat, path: &Path) -> Result<BoxedSink, ContractError> {
    debug!(format = %format, path = %path.display(), "creating sink");
    Ok(match format {
        ExportFormat::Icl => Box::new(IclSink::create(path)?),
        ExportFormat::Log => Box::new(LogSink::new("log")),
    })
}
