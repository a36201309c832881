//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the exporter.
//! Business crates depend on this crate only, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Records carry the log receive time in integer nanoseconds (`timestamp_ns`)
//! - A tuple's representative time is the primary stream's record time
//! - Playback windows are expressed in seconds relative to the first record of the log

mod blueprint;
mod error;
mod message;
mod record;
mod rgbd;
mod sink;
mod source;
mod stream_id;
mod sync;
mod sync_engine_config;

pub use blueprint::*;
pub use error::*;
pub use message::*;
pub use record::*;
pub use rgbd::*;
pub use sink::DatasetSink;
pub use source::{RecordDecoder, RecordSource, StreamDescriptor};
pub use stream_id::StreamId;
pub use sync::*;
pub use sync_engine_config::*;

/// Nanoseconds per second, used for every `f64 seconds <-> i64 ns` conversion.
pub const NANOS_PER_SEC: f64 = 1e9;

/// Convert fractional seconds to integer nanoseconds (rounded to nearest).
#[inline]
pub fn seconds_to_nanos(seconds: f64) -> i64 {
    (seconds * NANOS_PER_SEC).round() as i64
}

/// Convert integer nanoseconds to fractional seconds.
#[inline]
pub fn nanos_to_seconds(nanos: i64) -> f64 {
    nanos as f64 / NANOS_PER_SEC
}
