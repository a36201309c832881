//! PlaybackDriver - single pass over a recorded log
//!
//! ```text
//! NotStarted -> Seeking -> Streaming -> Draining -> Finished
//! ```
//!
//! One record is fully processed (read, normalize, insert, match, write)
//! before the next one is read.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use contracts::{
    ContractError, PlaybackWindow, RawRecord, RecordDecoder, RecordSource, StreamId,
};
use observability::TupleMetricsAggregator;
use sync_engine::Synchronizer;
use tracing::{debug, info, instrument, trace, warn};

use crate::sink::TupleSink;
use crate::stats::PlaybackStats;

/// Driver state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    NotStarted,
    /// Waiting for the first record to position the source on the window start
    Seeking,
    Streaming,
    /// Reading stopped, sink not yet finalized
    Draining,
    Finished,
}

/// Cooperative stop request shared with signal handlers
///
/// Checked before every read; the sink is still finalized after a stop.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of processing one record
enum Step {
    Continue,
    Stop,
}

/// Drives a RecordSource through a Synchronizer into a TupleSink
#[derive(Debug)]
pub struct PlaybackDriver {
    window: PlaybackWindow,
    cancel: Option<CancelFlag>,
    state: PlaybackState,
}

impl PlaybackDriver {
    pub fn new(window: PlaybackWindow) -> Self {
        Self {
            window,
            cancel: None,
            state: PlaybackState::NotStarted,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn window(&self) -> &PlaybackWindow {
        &self.window
    }

    /// Play the log once
    ///
    /// The sink is finalized exactly once on every path, including errors
    /// and cancellation. When both the stream loop and finalize fail, the
    /// stream error is returned.
    ///
    /// # Errors
    /// Unknown streams, decode failures, synchronizer errors, sink errors,
    /// or a second call on the same driver.
    #[instrument(
        name = "playback_run",
        skip_all,
        fields(sink = %sink.name(), start = ?self.window.start, end = ?self.window.end)
    )]
    pub fn run<S, D, T>(
        &mut self,
        source: &mut S,
        decoder: &D,
        synchronizer: &mut Synchronizer,
        sink: &mut T,
    ) -> Result<PlaybackStats, ContractError>
    where
        S: RecordSource + ?Sized,
        D: RecordDecoder + ?Sized,
        T: TupleSink + ?Sized,
    {
        if self.state != PlaybackState::NotStarted {
            return Err(ContractError::Other(format!(
                "playback driver already ran (state {:?})",
                self.state
            )));
        }

        // Stream selection happens before any sink output
        let streams: Vec<StreamId> = synchronizer.config().stream_ids().cloned().collect();
        source.restrict_to(&streams)?;

        let started = Instant::now();
        let mut stats = PlaybackStats::default();
        let mut aggregator = TupleMetricsAggregator::new();

        self.state = if self.window.start.is_some() {
            PlaybackState::Seeking
        } else {
            PlaybackState::Streaming
        };
        info!(streams = streams.len(), "playback started");

        let streamed = self.stream(
            source,
            decoder,
            synchronizer,
            sink,
            &mut stats,
            &mut aggregator,
        );

        self.state = PlaybackState::Draining;
        let finalized = sink.finalize();
        self.state = PlaybackState::Finished;

        stats.final_state = self.state;
        stats.duration = started.elapsed();
        stats.sync = synchronizer.stats();
        stats.tuple_metrics = aggregator;

        if let Err(e) = &finalized {
            warn!(sink = %sink.name(), error = %e, "sink finalize failed");
        }
        streamed.and(finalized)?;

        info!(
            records_read = stats.records_read,
            records_inserted = stats.records_inserted,
            tuples = stats.tuples_written,
            cancelled = stats.cancelled,
            "playback finished"
        );
        Ok(stats)
    }

    fn stream<S, D, T>(
        &mut self,
        source: &mut S,
        decoder: &D,
        synchronizer: &mut Synchronizer,
        sink: &mut T,
        stats: &mut PlaybackStats,
        aggregator: &mut TupleMetricsAggregator,
    ) -> Result<(), ContractError>
    where
        S: RecordSource + ?Sized,
        D: RecordDecoder + ?Sized,
        T: TupleSink + ?Sized,
    {
        loop {
            if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
                info!(records_read = stats.records_read, "playback cancelled");
                stats.cancelled = true;
                return Ok(());
            }

            let Some(raw) = source.read_next()? else {
                debug!("end of log");
                return Ok(());
            };
            stats.records_read += 1;

            match self.process(raw, source, decoder, synchronizer, sink, stats, aggregator)? {
                Step::Continue => {}
                Step::Stop => return Ok(()),
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn process<S, D, T>(
        &mut self,
        raw: RawRecord,
        source: &mut S,
        decoder: &D,
        synchronizer: &mut Synchronizer,
        sink: &mut T,
        stats: &mut PlaybackStats,
        aggregator: &mut TupleMetricsAggregator,
    ) -> Result<Step, ContractError>
    where
        S: RecordSource + ?Sized,
        D: RecordDecoder + ?Sized,
        T: TupleSink + ?Sized,
    {
        let origin = *stats.origin_ns.get_or_insert(raw.timestamp_ns);

        if self.state == PlaybackState::Seeking {
            self.state = PlaybackState::Streaming;
            if let Some(start_ns) = self.window.start_ns().filter(|&s| s > 0) {
                let target = origin.saturating_add(start_ns);
                debug!(origin_ns = origin, target_ns = target, "seeking to window start");
                source.seek(target)?;
                stats.seeks += 1;
                // normalized time 0 is before a positive start
                stats.records_skipped += 1;
                observability::record_record_read(&raw.stream, false);
                return Ok(Step::Continue);
            }
        }

        let t_ns = raw.timestamp_ns - origin;
        if self.window.is_before(t_ns) {
            // coarse seek
            trace!(stream = %raw.stream, t_ns, "record before window start");
            stats.records_skipped += 1;
            observability::record_record_read(&raw.stream, false);
            return Ok(Step::Continue);
        }
        if self.window.is_past(t_ns) {
            debug!(stream = %raw.stream, t_ns, "window end reached");
            self.state = PlaybackState::Draining;
            return Ok(Step::Stop);
        }

        let record = decoder.decode(raw)?;
        observability::record_record_read(&record.stream, true);
        stats.records_inserted += 1;
        stats.last_normalized_ns = Some(t_ns);

        let stream = record.stream.clone();
        let tuple = synchronizer.push(record)?;
        if let Some(depth) = synchronizer.queue_len(&stream) {
            observability::record_queue_depth(&stream, depth);
        }

        if let Some(tuple) = tuple {
            stats.tuples_emitted += 1;
            observability::record_tuple_metrics(&tuple);
            aggregator.update(&tuple);
            trace!(tuple_id = tuple.tuple_id, t_sync_ns = tuple.t_sync_ns, "tuple emitted");
            sink.accept(tuple)?;
            stats.tuples_written += 1;
        }

        Ok(Step::Continue)
    }
}
