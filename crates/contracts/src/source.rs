//! RecordSource / RecordDecoder traits - log access abstraction
//!
//! Container decoding and message deserialization live behind these two
//! seams so the playback driver never sees a concrete log format.

use serde::{Deserialize, Serialize};

use crate::{ContractError, RawRecord, Record, StreamId};

/// One stream available in a log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Stream (topic) name
    pub name: StreamId,
    /// Type descriptor as stored in the log, e.g. `sensor_msgs/msg/Image`
    pub type_name: String,
}

/// Linear, time-ordered access to a recorded log
///
/// Records are delivered in non-decreasing global timestamp order.
pub trait RecordSource {
    /// All streams in the log
    fn streams(&self) -> Vec<StreamDescriptor>;

    /// Only deliver records of the given streams from now on
    ///
    /// # Errors
    /// Unknown stream names
    fn restrict_to(&mut self, streams: &[StreamId]) -> Result<(), ContractError>;

    /// Whether another record is available
    fn has_next(&self) -> bool;

    /// Read the next record in source order, `None` at end of log
    fn read_next(&mut self) -> Result<Option<RawRecord>, ContractError>;

    /// Position the source on the first record with `timestamp >= timestamp_ns`
    fn seek(&mut self, timestamp_ns: i64) -> Result<(), ContractError>;
}

/// Deserialization of raw record bytes into typed payloads
pub trait RecordDecoder {
    fn decode(&self, raw: RawRecord) -> Result<Record, ContractError>;
}

impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    fn streams(&self) -> Vec<StreamDescriptor> {
        (**self).streams()
    }

    fn restrict_to(&mut self, streams: &[StreamId]) -> Result<(), ContractError> {
        (**self).restrict_to(streams)
    }

    fn has_next(&self) -> bool {
        (**self).has_next()
    }

    fn read_next(&mut self) -> Result<Option<RawRecord>, ContractError> {
        (**self).read_next()
    }

    fn seek(&mut self, timestamp_ns: i64) -> Result<(), ContractError> {
        (**self).seek(timestamp_ns)
    }
}
