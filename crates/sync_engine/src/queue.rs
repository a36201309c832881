//! Per-stream bounded record queue.
//!
//! Uses index-based separation:
//! - HeapRb stores lightweight metadata (timestamp + insertion seq + slab key)
//! - Slab stores the actual Record
//!
//! Candidate search and eviction only move metadata, never image payloads.

use std::fmt;

use contracts::Record;
use ringbuf::{traits::*, HeapRb};
use slab::Slab;

/// Lightweight handle to a buffered record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Entry {
    pub timestamp_ns: i64,
    /// Insertion sequence within this queue, used as the last tie-breaker
    pub seq: u64,
    slab_key: usize,
}

/// Bounded per-stream queue with drop-oldest overflow
pub(crate) struct StreamQueue {
    /// Ring buffer of metadata in insertion order
    index: HeapRb<Entry>,
    /// Actual record storage
    storage: Slab<Record>,
    capacity: usize,
    next_seq: u64,
    dropped_count: u64,
    out_of_order_count: u64,
    last_timestamp: Option<i64>,
}

impl fmt::Debug for StreamQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamQueue")
            .field("len", &self.index.occupied_len())
            .field("capacity", &self.capacity)
            .field("dropped", &self.dropped_count)
            .finish()
    }
}

impl StreamQueue {
    /// Create a queue holding at most `capacity` records, never fewer than one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            index: HeapRb::new(capacity),
            storage: Slab::with_capacity(capacity),
            capacity,
            next_seq: 0,
            dropped_count: 0,
            out_of_order_count: 0,
            last_timestamp: None,
        }
    }

    /// Push a record, evicting and returning the oldest one if the queue is full
    pub fn push(&mut self, record: Record) -> Option<Record> {
        let timestamp_ns = record.timestamp_ns;

        if self.last_timestamp.is_some_and(|last| timestamp_ns < last) {
            self.out_of_order_count += 1;
        }
        self.last_timestamp = Some(timestamp_ns);

        let evicted = if self.index.is_full() {
            self.dropped_count += 1;
            self.index
                .try_pop()
                .map(|old| self.storage.remove(old.slab_key))
        } else {
            None
        };

        let slab_key = self.storage.insert(record);
        let entry = Entry {
            timestamp_ns,
            seq: self.next_seq,
            slab_key,
        };
        self.next_seq += 1;
        if let Err(rejected) = self.index.try_push(entry) {
            self.storage.remove(rejected.slab_key);
        }

        evicted
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.occupied_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Timestamp of the most recently pushed record
    #[inline]
    pub fn last_timestamp(&self) -> Option<i64> {
        self.last_timestamp
    }

    /// Buffered entries in insertion order
    pub(crate) fn entries(&self) -> impl Iterator<Item = Entry> + '_ {
        self.index.iter().copied()
    }

    /// Entry whose timestamp is closest to `target`
    ///
    /// Ties go to the earlier timestamp, then to the earlier insertion.
    pub(crate) fn closest_to(&self, target: i64) -> Option<Entry> {
        self.index.iter().copied().min_by_key(|e| {
            (
                e.timestamp_ns.abs_diff(target),
                e.timestamp_ns,
                e.seq,
            )
        })
    }

    /// Remove a specific entry and hand back its record
    pub(crate) fn take(&mut self, entry: Entry) -> Option<Record> {
        let mut found = false;
        let remaining: Vec<Entry> = self
            .index
            .pop_iter()
            .filter(|e| {
                if e.slab_key == entry.slab_key && e.seq == entry.seq {
                    found = true;
                    false
                } else {
                    true
                }
            })
            .collect();

        for e in remaining {
            let _ = self.index.try_push(e);
        }

        found.then(|| self.storage.remove(entry.slab_key))
    }

    /// Drop every record strictly older than `timestamp_ns`, returning how many went
    pub fn drop_older_than(&mut self, timestamp_ns: i64) -> usize {
        let mut removed = 0;
        let remaining: Vec<Entry> = self
            .index
            .pop_iter()
            .filter(|e| {
                if e.timestamp_ns >= timestamp_ns {
                    true
                } else {
                    self.storage.remove(e.slab_key);
                    removed += 1;
                    false
                }
            })
            .collect();

        for e in remaining {
            let _ = self.index.try_push(e);
        }

        removed
    }

    /// Oldest buffered timestamp
    pub fn oldest_timestamp(&self) -> Option<i64> {
        self.index.iter().map(|e| e.timestamp_ns).min()
    }

    /// Records lost to overflow
    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }

    /// Records that arrived with a timestamp older than their predecessor
    #[inline]
    pub fn out_of_order_count(&self) -> u64 {
        self.out_of_order_count
    }
}
