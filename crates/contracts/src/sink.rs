//! DatasetSink trait - Exporter output interface
//!
//! Defines the abstract interface for dataset sinks.

use crate::{ContractError, RgbdFrame};

/// Dataset output trait
///
/// All sink implementations must implement this trait. The playback driver
/// calls it from a single thread, in tuple emission order.
pub trait DatasetSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Persist one frame
    ///
    /// The first call additionally persists calibration metadata.
    ///
    /// # Errors
    /// Format, consistency or resource errors; all are fatal for the run
    fn write_rgbd(&mut self, frame: &RgbdFrame) -> Result<(), ContractError>;

    /// Flush and close every open resource
    ///
    /// Called exactly once per run by the driver; implementations must
    /// tolerate repeated calls.
    fn finalize(&mut self) -> Result<(), ContractError>;
}

impl<S: DatasetSink + ?Sized> DatasetSink for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn write_rgbd(&mut self, frame: &RgbdFrame) -> Result<(), ContractError> {
        (**self).write_rgbd(frame)
    }

    fn finalize(&mut self) -> Result<(), ContractError> {
        (**self).finalize()
    }
}
