//! Single-producer / single-consumer circular record buffer.
//!
//! Generalizes the unbounded-sequence-number SPSC design in the teacher's
//! `ring.rs` (cache-aligned atomics, acquire/release fence discipline) to
//! the spec's wrapped power-of-two index with one reserved slot, plus the
//! flags, per-ring seqnum/dropcnt counters, refcount-adjacent machinery,
//! and blocking mode a log ring needs that a plain SPSC queue does not.
//!
//! Refcounting: rather than re-deriving the teacher's atomic refcount by
//! hand, a `Ring` is always held behind `Arc<Ring>`; `Arc::strong_count`
//! *is* the spec's refcount (each producer tls and the engine's ring map
//! hold one clone). `IMMORTAL` is implemented by the engine keeping one
//! extra permanent clone alive in a keep-alive list rather than by
//! special-casing `release()`, since Rust's `Arc` has no "ignore this
//! drop" hook to hang that logic on.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use crossbeam_utils::CachePadded;

use crate::config::{RingFlags, RingOptions};
use crate::record::Record;
use crate::timesource::{SystemTimesource, Timesource};

/// Fixed 128-bit tag embedded at a known offset so a postmortem scanner
/// could locate live rings in a memory image (scanning itself is out of
/// scope here, per spec.md §1).
pub const RING_MAGIC: u128 = 0x5249_4e47_4275_6621_5249_4e47_4275_6621;

/// How long a `BLOCKING` push waits on the condition variable between
/// rechecking for space or shutdown.
const BLOCKING_POLL: Duration = Duration::from_micros(100);

/// A single-producer / single-consumer ring of log records.
pub struct Ring {
    magic: u128,
    name: String,
    flags: RingFlags,
    prio: u16,
    capacity: usize,
    mask: usize,
    slots: Box<[UnsafeCell<Record>]>,
    tail: CachePadded<AtomicUsize>,
    head: CachePadded<AtomicUsize>,
    seqnum: AtomicU64,
    dropcnt: AtomicU64,
    producer_mutex: Option<Mutex<()>>,
    blocking: (Mutex<()>, Condvar),
    timesource: Mutex<Arc<dyn Timesource>>,
    killed: Arc<AtomicBool>,
}

// SAFETY: Record is Send; the SPSC protocol below ensures no two threads
// ever alias a slot without an intervening Acquire/Release pair.
unsafe impl Send for Ring {}
unsafe impl Sync for Ring {}

impl Ring {
    /// Construct a new ring. `killed` is the engine's shutdown flag: a
    /// `BLOCKING` push wakes and gives up once it is set, rather than
    /// waiting forever past engine teardown.
    #[must_use]
    pub fn new(name: impl Into<String>, options: RingOptions, killed: Arc<AtomicBool>) -> Arc<Self> {
        let capacity = options.rounded_capacity();
        let mask = capacity - 1;
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(Record::new(options.record_tailroom)))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Arc::new(Self {
            magic: RING_MAGIC,
            name: name.into(),
            flags: options.flags,
            prio: options.prio,
            capacity,
            mask,
            slots,
            tail: CachePadded::new(AtomicUsize::new(0)),
            head: CachePadded::new(AtomicUsize::new(0)),
            seqnum: AtomicU64::new(0),
            dropcnt: AtomicU64::new(0),
            producer_mutex: options.flags.contains(RingFlags::SHARED).then(|| Mutex::new(())),
            blocking: (Mutex::new(()), Condvar::new()),
            timesource: Mutex::new(Arc::new(SystemTimesource)),
            killed,
        })
    }

    #[must_use]
    pub const fn magic(&self) -> u128 {
        self.magic
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn flags(&self) -> RingFlags {
        self.flags
    }

    #[must_use]
    pub const fn prio(&self) -> u16 {
        self.prio
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn size(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Relaxed);
        tail.wrapping_sub(head) & self.mask
    }

    /// Free slots, honoring the one reserved slot.
    #[must_use]
    pub fn room(&self) -> usize {
        self.capacity - self.size() - 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tail.load(Ordering::Relaxed) == self.head.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        (tail + 1) & self.mask == head
    }

    #[must_use]
    pub fn dropcnt(&self) -> u64 {
        self.dropcnt.load(Ordering::Relaxed)
    }

    /// Returns the pre-increment value; stored into the record header by
    /// the caller.
    #[inline]
    pub fn inc_seqnum(&self) -> u64 {
        self.seqnum.fetch_add(1, Ordering::Relaxed)
    }

    #[must_use]
    pub fn timesource(&self) -> Arc<dyn Timesource> {
        Arc::clone(&self.timesource.lock().unwrap_or_else(std::sync::PoisonError::into_inner))
    }

    pub fn set_timesource(&self, ts: Arc<dyn Timesource>) {
        *self.timesource.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = ts;
    }

    /// Clear indices, seqnum, and dropcnt. Only safe with no concurrent
    /// producer, e.g. right after construction or before a `REUSABLE`
    /// ring is handed to a new owner.
    pub fn reset(&self) {
        self.tail.store(0, Ordering::Relaxed);
        self.head.store(0, Ordering::Relaxed);
        self.seqnum.store(0, Ordering::Relaxed);
        self.dropcnt.store(0, Ordering::Relaxed);
    }

    // ------------------------------------------------------------------
    // Producer side
    // ------------------------------------------------------------------

    /// Claim the tail slot for in-place writing. Returns `None` if the
    /// ring is full and not `BLOCKING` (the slot is lost and `dropcnt`
    /// increments), or if the engine has been killed while waiting in
    /// `BLOCKING` mode.
    pub fn push_begin(&self) -> Option<PushGuard<'_>> {
        let shared_guard = self
            .flags
            .contains(RingFlags::SHARED)
            .then(|| self.lock_producer());
        self.push_begin_with(shared_guard)
    }

    /// Claim the tail slot without taking the `SHARED` producer mutex, even
    /// if the ring has that flag set. Sound only when the caller has
    /// already serialized concurrent producers some other way (e.g. a
    /// batched multi-record post under one external lock) — the spec's
    /// `post_unlocked` entry point exists for exactly that case.
    pub fn push_begin_unlocked(&self) -> Option<PushGuard<'_>> {
        self.push_begin_with(None)
    }

    fn push_begin_with<'a>(&'a self, shared_guard: Option<MutexGuard<'a, ()>>) -> Option<PushGuard<'a>> {
        let tail = self.tail.load(Ordering::Relaxed);
        loop {
            let next_tail = (tail + 1) & self.mask;
            let head = self.head.load(Ordering::Acquire);
            if next_tail != head {
                return Some(PushGuard { ring: self, index: tail, _shared: shared_guard });
            }

            if !self.flags.contains(RingFlags::BLOCKING) {
                self.dropcnt.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            if self.killed.load(Ordering::Relaxed) {
                return None;
            }

            let (lock, cvar) = &self.blocking;
            let guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let _ = cvar.wait_timeout(guard, BLOCKING_POLL);
        }
    }

    fn lock_producer(&self) -> MutexGuard<'_, ()> {
        self.producer_mutex
            .as_ref()
            .expect("SHARED ring always has a producer mutex")
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // Consumer side
    // ------------------------------------------------------------------

    /// `(head, tail)` snapshot with an acquire fence on `tail` so the
    /// records in `[head, tail)` are safely observable.
    #[must_use]
    pub fn consumer_snapshot(&self) -> (usize, usize) {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        (head, tail)
    }

    /// Borrow the record at a raw index (masked internally). Only valid
    /// for indices within a snapshot's `[head, tail)` range.
    #[must_use]
    pub fn record_at(&self, idx: usize) -> &Record {
        // SAFETY: the consumer is the only reader of slots in [head, tail),
        // and the caller is required to pass an index from that range.
        unsafe { &*self.slots[idx & self.mask].get() }
    }

    /// Mutably borrow the record at a raw index — used by the engine to
    /// build *fake* special records in place before formatting, and by
    /// the producer-adjacent helpers that populate a just-claimed slot.
    #[must_use]
    pub fn record_at_mut(&self, idx: usize) -> &mut Record {
        // SAFETY: see `record_at`; the engine thread is the sole writer
        // of already-published slots during its own formatting pass.
        unsafe { &mut *self.slots[idx & self.mask].get() }
    }

    /// Advance `head` to `new_head` (store-release) and wake any
    /// `BLOCKING` producer waiting for room.
    pub fn commit_pop(&self, new_head: usize) {
        self.head.store(new_head & self.mask, Ordering::Release);
        let (lock, cvar) = &self.blocking;
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        cvar.notify_all();
    }
}

/// RAII handle to a claimed-but-not-yet-published slot, mirroring the
/// teacher's `Reservation` — write through `Deref`/`DerefMut`, then
/// `commit()` to publish.
pub struct PushGuard<'a> {
    ring: &'a Ring,
    index: usize,
    _shared: Option<MutexGuard<'a, ()>>,
}

impl PushGuard<'_> {
    #[must_use]
    pub fn slot_index(&self) -> usize {
        self.index
    }

    /// Publish the record with a store-release on `tail`.
    pub fn commit(self) {
        let next = (self.index + 1) & self.ring.mask;
        self.ring.tail.store(next, Ordering::Release);
    }
}

impl std::ops::Deref for PushGuard<'_> {
    type Target = Record;
    fn deref(&self) -> &Record {
        self.ring.record_at(self.index)
    }
}

impl std::ops::DerefMut for PushGuard<'_> {
    fn deref_mut(&mut self) -> &mut Record {
        self.ring.record_at_mut(self.index)
    }
}
