//! Ring index: the priority-sorted snapshot the engine thread drains each
//! iteration, rebuilt lazily from the shared ring map. Grounded on
//! `engine::rebuild_ring_index` / `engine::ring_index` in `engine.cc`.

use std::collections::HashMap;
use std::sync::Arc;

use ringlog_core::Ring;

pub(crate) struct RingIndexEntry {
    pub(crate) ring: Arc<Ring>,
    pub(crate) name: String,
    /// Raw slot index one past the last record scanned this iteration;
    /// `None` until the scan pass sets it. Committed (`head` advanced)
    /// once per iteration after the TSO margin flush.
    pub(crate) last_processed: Option<usize>,
}

/// Priority-sorted view of the engine's ring map. Rebuilt only when the
/// map changes (`Shared::ring_index_dirty`), never on every poll —
/// rebuilding is a `try_lock`, so a busy map just means one more iteration
/// on the stale index.
#[derive(Default)]
pub(crate) struct RingIndex {
    pub(crate) entries: Vec<RingIndexEntry>,
}

impl RingIndex {
    /// Replace the index with a fresh snapshot of `rings`, sorted by
    /// descending priority. Per-ring sequence expectations live in a
    /// separate name-keyed map in the engine loop state, not here, so a
    /// rebuild never loses or misattributes that bookkeeping.
    pub(crate) fn rebuild(&mut self, rings: &HashMap<String, Arc<Ring>>) {
        let mut entries: Vec<RingIndexEntry> = rings
            .iter()
            .map(|(name, ring)| RingIndexEntry { ring: Arc::clone(ring), name: name.clone(), last_processed: None })
            .collect();
        entries.sort_by(|a, b| b.ring.prio().cmp(&a.ring.prio()));
        self.entries = entries;
    }
}
