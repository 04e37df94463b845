//! Timestamp-ordering buffer: the sort window the consumer uses to merge
//! records from many rings into one (best-effort) global order.
//! Grounded on `hogl::tsobuf` / `engine::{process_rings_tso, flush_tso,
//! flush_full_tso}` in `engine.cc`.
//!
//! One deliberate departure from the original: a `tsobuf::entry` there
//! carries a ring index tag plus a raw record pointer, resolved back to a
//! ring through the engine's index array. That array can be rebuilt (a
//! ring added or removed) while older entries are still sitting in the
//! leftover margin, which would leave a stale tag pointing at the wrong
//! slot in a reordered index. This port sidesteps the hazard entirely by
//! having each entry hold its own `Arc<Ring>` clone and name directly;
//! per-ring sequence bookkeeping in the engine loop is keyed by name, not
//! index position, so a rebuild never invalidates an in-flight entry.
//!
//! What IS carried over unchanged from the original: once a record has
//! been scanned into the TSO, the engine advances the ring's `head` past
//! it at the end of the iteration regardless of whether the TSO has
//! actually flushed it yet (the 1/8-capacity leftover margin exists
//! specifically to bound how many scanned-but-unflushed records are
//! outstanding at once). A slot whose TSO entry is still buffered could,
//! in principle, be overwritten by the producer before it's flushed; the
//! original accepts this as a bounded-staleness tradeoff rather than a
//! hard safety guarantee, and so does this port.

use std::sync::Arc;

use ringlog_core::{Ring, Timestamp};

pub(crate) struct TsoEntry {
    pub(crate) ring: Arc<Ring>,
    pub(crate) name: String,
    pub(crate) slot: usize,
    pub(crate) timestamp: Timestamp,
}

pub(crate) struct TsoBuffer {
    entries: Vec<TsoEntry>,
    capacity: usize,
}

impl TsoBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity.min(4096)), capacity }
    }

    pub(crate) fn push(&mut self, entry: TsoEntry) {
        self.entries.push(entry);
    }

    pub(crate) fn is_full(&self) -> bool {
        self.capacity > 0 && self.entries.len() >= self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    fn sort(&mut self) {
        self.entries.sort_by_key(|e| e.timestamp);
    }

    /// Earliest timestamp currently buffered, after sorting. Used to pick
    /// a timestamp for the tso-full marker.
    pub(crate) fn min_timestamp(&mut self) -> Option<Timestamp> {
        self.sort();
        self.entries.first().map(|e| e.timestamp)
    }

    /// Sort the buffer and pop the earliest `n` entries (or all of them,
    /// whichever is fewer), in timestamp order.
    pub(crate) fn drain_sorted(&mut self, n: usize) -> Vec<TsoEntry> {
        self.sort();
        let n = n.min(self.entries.len());
        self.entries.drain(..n).collect()
    }

    /// How many entries the end-of-iteration margin flush should pop,
    /// leaving `capacity / 8` behind to absorb next-iteration stragglers.
    pub(crate) fn margin_drain_count(&self) -> usize {
        let keep = self.capacity / 8;
        self.entries.len().saturating_sub(keep)
    }
}
