//! Playback statistics.

use std::time::Duration;

use observability::TupleMetricsAggregator;
use sync_engine::SyncStats;

use crate::driver::PlaybackState;

/// Statistics from a playback run
#[derive(Debug, Clone, Default)]
pub struct PlaybackStats {
    /// Records read from the source
    pub records_read: u64,

    /// Records read but outside the window start
    pub records_skipped: u64,

    /// Records inserted into the synchronizer
    pub records_inserted: u64,

    /// Tuples emitted by the synchronizer
    pub tuples_emitted: u64,

    /// Tuples handed to the sink successfully
    pub tuples_written: u64,

    /// Seeks issued to the source
    pub seeks: u64,

    /// Timestamp of the first record (ns)
    pub origin_ns: Option<i64>,

    /// Normalized time of the last inserted record (ns)
    pub last_normalized_ns: Option<i64>,

    /// State the driver ended in
    pub final_state: PlaybackState,

    /// Stopped through the cancel flag
    pub cancelled: bool,

    /// Wall-clock duration of the run
    pub duration: Duration,

    /// Synchronizer counters at the end of the run
    pub sync: SyncStats,

    /// Tuple metrics aggregator
    pub tuple_metrics: TupleMetricsAggregator,
}

impl PlaybackStats {
    /// Tuples written per wall-clock second
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.tuples_written as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of inserted records that ended up in a tuple (percent)
    pub fn match_rate(&self) -> f64 {
        let members: u64 = self.tuple_metrics.member_counts.values().sum();
        if self.records_inserted > 0 {
            members as f64 / self.records_inserted as f64 * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Playback Statistics ===\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Records read: {}", self.records_read);
        println!("   ├─ Records skipped: {}", self.records_skipped);
        println!("   ├─ Records inserted: {}", self.records_inserted);
        println!("   ├─ Tuples written: {}", self.tuples_written);
        println!("   ├─ FPS: {:.2}", self.fps());
        println!("   └─ Final state: {:?}{}", self.final_state, if self.cancelled { " (cancelled)" } else { "" });

        let summary = self.tuple_metrics.summary();

        println!("\nSynchronizer");
        println!("   ├─ Records dropped (queue full): {}", self.sync.records_dropped);
        println!("   ├─ Records evicted (stale): {}", self.sync.records_stale);
        println!("   ├─ Out-of-order records: {}", self.sync.records_out_of_order);
        println!("   ├─ Left buffered: {}", self.sync.records_buffered);
        println!("   ├─ Match rate: {:.2}%", self.match_rate());
        println!("   ├─ Spread (ms): {}", summary.spread_ms);
        println!("   └─ Interval (ms): {}", summary.interval_ms);

        if !summary.member_counts.is_empty() {
            println!("\nStream coverage");
            for (stream, count) in &summary.member_counts {
                println!("   ├─ {}: {} ({:.2}%)", stream, count, summary.coverage(stream));
            }
        }

        println!();
    }
}
