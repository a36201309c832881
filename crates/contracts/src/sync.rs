//! SyncTuple - Synchronizer output
//!
//! Synchronized tuple data structure and the playback window.

use serde::{Deserialize, Serialize};

use crate::{nanos_to_seconds, seconds_to_nanos, Record};

/// One synchronized set of records, one per matched stream
///
/// Emitted exactly once; the synchronizer keeps no reference afterwards.
#[derive(Debug, Clone)]
pub struct SyncTuple {
    /// Tuple sequence number (monotonically increasing, starts at 1)
    pub tuple_id: u64,

    /// Representative time: the primary stream's record timestamp (ns)
    pub t_sync_ns: i64,

    /// Max - min timestamp over the required members (ns)
    pub spread_ns: i64,

    /// Members in configuration order; optional streams only when matched
    pub records: Vec<Record>,
}

impl SyncTuple {
    /// Member record for a stream
    pub fn record(&self, stream: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.stream == stream)
    }

    /// Representative time in seconds
    pub fn t_sync(&self) -> f64 {
        nanos_to_seconds(self.t_sync_ns)
    }

    /// Spread in seconds
    pub fn spread(&self) -> f64 {
        nanos_to_seconds(self.spread_ns)
    }
}

/// Optional `[start, end)` playback window in seconds since the first record
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackWindow {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl PlaybackWindow {
    /// Unbounded window
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Window `[start, end)`
    pub fn between(start: f64, end: f64) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn start_ns(&self) -> Option<i64> {
        self.start.map(seconds_to_nanos)
    }

    pub fn end_ns(&self) -> Option<i64> {
        self.end.map(seconds_to_nanos)
    }

    /// Whether a record at normalized time `t_ns` lies before the window
    pub fn is_before(&self, t_ns: i64) -> bool {
        self.start_ns().is_some_and(|start| t_ns < start)
    }

    /// Whether a record at normalized time `t_ns` is at or past the (exclusive) end
    pub fn is_past(&self, t_ns: i64) -> bool {
        self.end_ns().is_some_and(|end| t_ns >= end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_bounds() {
        let window = PlaybackWindow::between(5.0, 10.0);
        assert!(window.is_before(4_999_999_999));
        assert!(!window.is_before(5_000_000_000));
        assert!(!window.is_past(9_999_999_999));
        assert!(window.is_past(10_000_000_000));
    }

    #[test]
    fn test_unbounded_window() {
        let window = PlaybackWindow::unbounded();
        assert!(!window.is_before(i64::MIN));
        assert!(!window.is_past(i64::MAX));
    }

    #[test]
    fn test_tuple_lookup() {
        let tuple = SyncTuple {
            tuple_id: 1,
            t_sync_ns: 1_000_000_000,
            spread_ns: 0,
            records: vec![Record::raw("/rgb", 1_000_000_000), Record::raw("/depth", 1_000_000_000)],
        };
        assert!(tuple.record("/depth").is_some());
        assert!(tuple.record("/pose").is_none());
        assert_eq!(tuple.t_sync(), 1.0);
    }
}
