//! Approximate-time synchronizer.
//!
//! Pivot-anchored nearest-neighbour join over per-stream bounded queues:
//! every insert tries the records of the updated stream as anchors, pairs each
//! anchor with the closest record of every other stream and keeps the
//! candidate with the smallest spread. A candidate within the slop is emitted,
//! its members are consumed and everything older than them is evicted.

use std::collections::HashMap;
use std::fmt;

use contracts::{
    ContractError, OrderPolicy, Record, StreamId, StreamSpec, SyncEngineConfig, SyncTuple,
};
use tracing::{debug, instrument, trace, warn};

use crate::queue::{Entry, StreamQueue};

/// Callback invoked with every emitted tuple by [`Synchronizer::insert`]
pub type TupleCallback = Box<dyn FnMut(SyncTuple) + Send>;

/// Counters describing a synchronizer run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Tuples emitted
    pub tuples_emitted: u64,
    /// Records lost to queue overflow
    pub records_dropped: u64,
    /// Records evicted because a newer record of their stream was consumed
    pub records_stale: u64,
    /// Records that arrived out of order within their stream
    pub records_out_of_order: u64,
    /// Records currently buffered over all queues
    pub records_buffered: usize,
}

struct StreamSlot {
    spec: StreamSpec,
    queue: StreamQueue,
}

/// Best candidate tuple found for one match attempt
struct Candidate {
    spread_ns: i64,
    members: Vec<Option<Entry>>,
}

/// Multi-stream approximate-time synchronizer
pub struct Synchronizer {
    config: SyncEngineConfig,
    /// Slots in configuration order
    slots: Vec<StreamSlot>,
    /// Stream id -> slot index
    lookup: HashMap<StreamId, usize>,
    /// Slot index of the primary stream
    primary: usize,
    slop_ns: i64,
    tuple_counter: u64,
    stale_evicted: u64,
    last_emitted_ns: Option<i64>,
    callback: Option<TupleCallback>,
}

impl fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synchronizer")
            .field("streams", &self.lookup.len())
            .field("primary", &self.slots[self.primary].spec.id)
            .field("slop_ns", &self.slop_ns)
            .field("tuples", &self.tuple_counter)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

impl Synchronizer {
    /// Create a synchronizer for the configured streams
    ///
    /// # Errors
    /// No required stream, duplicate stream ids, zero queue size or an
    /// invalid slop.
    pub fn new(config: SyncEngineConfig) -> Result<Self, ContractError> {
        if config.queue_size == 0 {
            return Err(ContractError::config_validation(
                "sync.queue_size",
                "queue_size must be >= 1",
            ));
        }
        if !config.slop_s.is_finite() || config.slop_s < 0.0 {
            return Err(ContractError::config_validation(
                "sync.slop",
                format!("slop must be a finite value >= 0, got {}", config.slop_s),
            ));
        }

        let mut lookup = HashMap::with_capacity(config.streams.len());
        let mut slots = Vec::with_capacity(config.streams.len());
        for (idx, spec) in config.streams.iter().enumerate() {
            if lookup.insert(spec.id.clone(), idx).is_some() {
                return Err(ContractError::config_validation(
                    format!("sync.streams[{idx}]"),
                    format!("duplicate stream '{}'", spec.id),
                ));
            }
            slots.push(StreamSlot {
                spec: spec.clone(),
                queue: StreamQueue::new(config.queue_size),
            });
        }

        let primary = slots
            .iter()
            .position(|slot| slot.spec.required)
            .ok_or_else(|| {
                ContractError::config_validation("sync.streams", "at least one required stream")
            })?;

        let slop_ns = config.slop_ns();
        debug!(
            streams = slots.len(),
            primary = %slots[primary].spec.id,
            queue_size = config.queue_size,
            slop_s = config.slop_s,
            "synchronizer configured"
        );

        Ok(Self {
            config,
            slots,
            lookup,
            primary,
            slop_ns,
            tuple_counter: 0,
            stale_evicted: 0,
            last_emitted_ns: None,
            callback: None,
        })
    }

    /// Register the callback used by [`insert`](Self::insert)
    pub fn register_callback<F>(&mut self, callback: F)
    where
        F: FnMut(SyncTuple) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    /// Insert a record and hand any resulting tuple to the registered callback
    pub fn insert(&mut self, record: Record) -> Result<(), ContractError> {
        if let Some(tuple) = self.push(record)? {
            match self.callback.as_mut() {
                Some(callback) => callback(tuple),
                None => warn!(
                    tuple_id = tuple.tuple_id,
                    "tuple emitted without a registered callback"
                ),
            }
        }
        Ok(())
    }

    /// Insert a record into its stream's queue and try to emit a tuple
    ///
    /// Returns `Some(SyncTuple)` if a synchronized tuple can be produced.
    ///
    /// # Errors
    /// The record's stream is not configured, or it goes back in time under
    /// [`OrderPolicy::Reject`].
    #[instrument(
        level = "trace",
        name = "synchronizer_push",
        skip(self, record),
        fields(stream = %record.stream, timestamp_ns = record.timestamp_ns)
    )]
    pub fn push(&mut self, record: Record) -> Result<Option<SyncTuple>, ContractError> {
        let idx = self.slot_index(&record.stream)?;
        self.check_order(idx, &record)?;

        let slot = &mut self.slots[idx];
        if let Some(evicted) = slot.queue.push(record) {
            debug!(
                stream = %slot.spec.id,
                timestamp_ns = evicted.timestamp_ns,
                capacity = slot.queue.capacity(),
                "queue full, dropped oldest record"
            );
            metrics::counter!(
                "sync_records_dropped_total",
                "stream" => slot.spec.id.to_string()
            )
            .increment(1);
        }

        Ok(self.try_match(idx))
    }

    fn slot_index(&self, stream: &StreamId) -> Result<usize, ContractError> {
        self.lookup.get(stream).copied().ok_or_else(|| {
            ContractError::unknown_stream(
                stream.as_str(),
                self.slots.iter().map(|s| s.spec.id.to_string()),
            )
        })
    }

    fn check_order(&self, idx: usize, record: &Record) -> Result<(), ContractError> {
        let Some(last_ns) = self.slots[idx].queue.last_timestamp() else {
            return Ok(());
        };
        if record.timestamp_ns >= last_ns {
            return Ok(());
        }

        match self.config.order_policy {
            OrderPolicy::Reject => Err(ContractError::OutOfOrder {
                stream: record.stream.to_string(),
                timestamp_ns: record.timestamp_ns,
                last_ns,
            }),
            OrderPolicy::BestEffort => {
                warn!(
                    stream = %record.stream,
                    timestamp_ns = record.timestamp_ns,
                    last_ns,
                    "out-of-order record buffered"
                );
                Ok(())
            }
        }
    }

    fn all_required_have_data(&self) -> bool {
        self.slots
            .iter()
            .filter(|slot| slot.spec.required)
            .all(|slot| !slot.queue.is_empty())
    }

    /// Try to produce a tuple after `updated` received a record
    #[instrument(name = "synchronizer_try_match", level = "trace", skip(self))]
    fn try_match(&mut self, updated: usize) -> Option<SyncTuple> {
        if !self.all_required_have_data() {
            return None;
        }

        // An optional stream never drives a match on its own.
        let anchor_idx = if self.slots[updated].spec.required {
            updated
        } else {
            self.primary
        };

        let mut best = self.best_candidate(anchor_idx)?;
        if best.spread_ns > self.slop_ns {
            trace!(
                spread_ns = best.spread_ns,
                slop_ns = self.slop_ns,
                "best candidate outside slop"
            );
            return None;
        }

        self.attach_optional(anchor_idx, &mut best);
        Some(self.emit(best))
    }

    /// Search every anchor of `anchor_idx` for the minimal-spread candidate
    fn best_candidate(&self, anchor_idx: usize) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;

        for anchor in self.slots[anchor_idx].queue.entries() {
            let mut members = vec![None; self.slots.len()];
            members[anchor_idx] = Some(anchor);
            let (mut lo, mut hi) = (anchor.timestamp_ns, anchor.timestamp_ns);

            for (idx, slot) in self.slots.iter().enumerate() {
                if idx == anchor_idx || !slot.spec.required {
                    continue;
                }
                let entry = slot.queue.closest_to(anchor.timestamp_ns)?;
                lo = lo.min(entry.timestamp_ns);
                hi = hi.max(entry.timestamp_ns);
                members[idx] = Some(entry);
            }

            let spread_ns = hi - lo;
            if best.as_ref().map_or(true, |b| spread_ns < b.spread_ns) {
                best = Some(Candidate { spread_ns, members });
            }
        }

        best
    }

    /// Attach optional-stream members that keep the tuple within the slop
    fn attach_optional(&self, anchor_idx: usize, candidate: &mut Candidate) {
        let Some(anchor) = candidate.members[anchor_idx] else {
            return;
        };
        let (lo, hi) = Self::bounds(&candidate.members);

        for (idx, slot) in self.slots.iter().enumerate() {
            if slot.spec.required {
                continue;
            }
            let Some(entry) = slot.queue.closest_to(anchor.timestamp_ns) else {
                continue;
            };
            let spread = hi.max(entry.timestamp_ns) - lo.min(entry.timestamp_ns);
            if spread <= self.slop_ns {
                candidate.members[idx] = Some(entry);
            } else {
                trace!(stream = %slot.spec.id, spread_ns = spread, "optional member outside slop");
            }
        }
    }

    fn bounds(members: &[Option<Entry>]) -> (i64, i64) {
        members
            .iter()
            .flatten()
            .fold((i64::MAX, i64::MIN), |(lo, hi), e| {
                (lo.min(e.timestamp_ns), hi.max(e.timestamp_ns))
            })
    }

    /// Consume the members of `candidate`, evict stale records, build the tuple
    #[instrument(name = "synchronizer_emit", level = "debug", skip_all)]
    fn emit(&mut self, candidate: Candidate) -> SyncTuple {
        let (tuple_min, _) = Self::bounds(&candidate.members);
        let t_sync_ns = candidate.members[self.primary]
            .map(|e| e.timestamp_ns)
            .unwrap_or(tuple_min);

        let mut records = Vec::with_capacity(self.slots.len());
        let mut stale = 0usize;
        for (slot, member) in self.slots.iter_mut().zip(&candidate.members) {
            let threshold = match member {
                Some(entry) => {
                    if let Some(record) = slot.queue.take(*entry) {
                        records.push(record);
                    }
                    entry.timestamp_ns
                }
                None => tuple_min,
            };
            stale += slot.queue.drop_older_than(threshold);
        }

        self.tuple_counter += 1;
        self.stale_evicted += stale as u64;

        if let Some(last) = self.last_emitted_ns {
            if t_sync_ns < last {
                warn!(t_sync_ns, last, "tuple emitted out of order");
            }
        }
        self.last_emitted_ns = Some(t_sync_ns);

        self.record_tuple_metrics(candidate.spread_ns, stale, records.len());
        debug!(
            tuple_id = self.tuple_counter,
            t_sync_ns,
            spread_ns = candidate.spread_ns,
            members = records.len(),
            stale,
            "tuple emitted"
        );

        SyncTuple {
            tuple_id: self.tuple_counter,
            t_sync_ns,
            spread_ns: candidate.spread_ns,
            records,
        }
    }

    fn record_tuple_metrics(&self, spread_ns: i64, stale: usize, members: usize) {
        metrics::counter!("sync_tuples_total").increment(1);
        metrics::histogram!("sync_tuple_spread_ms").record(spread_ns as f64 / 1e6);
        metrics::histogram!("sync_tuple_members").record(members as f64);
        if stale > 0 {
            metrics::counter!("sync_records_stale_total").increment(stale as u64);
        }
    }

    /// Number of records buffered for a stream
    pub fn queue_len(&self, stream: &str) -> Option<usize> {
        self.lookup.get(stream).map(|&idx| self.slots[idx].queue.len())
    }

    /// Timestamp of the oldest record buffered for a stream
    pub fn oldest_buffered(&self, stream: &str) -> Option<i64> {
        self.lookup
            .get(stream)
            .and_then(|&idx| self.slots[idx].queue.oldest_timestamp())
    }

    /// Get tuple counter
    pub fn tuple_count(&self) -> u64 {
        self.tuple_counter
    }

    /// Configuration this synchronizer was built from
    pub fn config(&self) -> &SyncEngineConfig {
        &self.config
    }

    /// Primary stream id
    pub fn primary(&self) -> &StreamId {
        &self.slots[self.primary].spec.id
    }

    /// Aggregated counters
    pub fn stats(&self) -> SyncStats {
        self.slots.iter().fold(
            SyncStats {
                tuples_emitted: self.tuple_counter,
                records_stale: self.stale_evicted,
                ..Default::default()
            },
            |mut acc, slot| {
                acc.records_dropped += slot.queue.dropped_count();
                acc.records_out_of_order += slot.queue.out_of_order_count();
                acc.records_buffered += slot.queue.len();
                acc
            },
        )
    }
}
