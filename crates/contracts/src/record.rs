//! Record - RecordSource 输出
//!
//! 原始记录与解码后的记录。

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{
    nanos_to_seconds, CameraInfoMsg, CompressedImageMsg, Header, ImageMsg, PoseStampedMsg,
    StreamId,
};

/// One undecoded record as read from the log
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub stream: StreamId,
    pub data: Bytes,
    /// Log receive time (nanoseconds)
    pub timestamp_ns: i64,
}

impl RawRecord {
    pub fn new(stream: impl Into<StreamId>, data: impl Into<Bytes>, timestamp_ns: i64) -> Self {
        Self {
            stream: stream.into(),
            data: data.into(),
            timestamp_ns,
        }
    }
}

/// Decoded record payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Payload {
    Image(ImageMsg),
    CompressedImage(CompressedImageMsg),
    CameraInfo(CameraInfoMsg),
    Pose(PoseStampedMsg),
    /// Opaque bytes (fallback)
    Raw(Bytes),
}

impl Payload {
    /// Message header, if the payload carries one
    pub fn header(&self) -> Option<&Header> {
        match self {
            Self::Image(msg) => Some(&msg.header),
            Self::CompressedImage(msg) => Some(&msg.header),
            Self::CameraInfo(msg) => Some(&msg.header),
            Self::Pose(msg) => Some(&msg.header),
            Self::Raw(_) => None,
        }
    }

    /// Short variant name for logs and error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Image(_) => "image",
            Self::CompressedImage(_) => "compressed_image",
            Self::CameraInfo(_) => "camera_info",
            Self::Pose(_) => "pose",
            Self::Raw(_) => "raw",
        }
    }
}

/// Decoded record, immutable once read
///
/// Owned by the synchronizer queue it is inserted into until emitted or evicted.
#[derive(Debug, Clone)]
pub struct Record {
    pub stream: StreamId,
    /// Log receive time (nanoseconds), the clock used for matching
    pub timestamp_ns: i64,
    pub payload: Payload,
}

impl Record {
    pub fn new(stream: impl Into<StreamId>, timestamp_ns: i64, payload: Payload) -> Self {
        Self {
            stream: stream.into(),
            timestamp_ns,
            payload,
        }
    }

    /// Record carrying opaque bytes, mostly useful in tests
    pub fn raw(stream: impl Into<StreamId>, timestamp_ns: i64) -> Self {
        Self::new(stream, timestamp_ns, Payload::Raw(Bytes::new()))
    }

    /// Timestamp in fractional seconds
    #[inline]
    pub fn seconds(&self) -> f64 {
        nanos_to_seconds(self.timestamp_ns)
    }
}
