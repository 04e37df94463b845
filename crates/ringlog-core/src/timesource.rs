//! Pluggable 64-bit nanosecond clock.
//!
//! The engine holds exactly one timesource; every ring caches a raw pointer
//! to it so that producers can stamp records without an indirection through
//! the engine. Ordering is total but not required to be wall-clock accurate
//! — the engine enforces per-ring monotonicity independently (see
//! `ringlog-engine`'s TSO stamping step).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// 64-bit nanoseconds since an arbitrary epoch defined by the timesource.
pub type Timestamp = u64;

/// A named callable returning a timestamp.
///
/// Implementations must be `Send + Sync`: the engine calls `now()` from its
/// own thread but the trait object is shared (via the engine's stored
/// `Arc`) with every ring's cached pointer.
pub trait Timesource: Send + Sync + fmt::Debug {
    /// Human-readable name, used only for diagnostics and the best-effort
    /// timesource-change notice the engine injects into the output.
    fn name(&self) -> &str;

    /// Return the current timestamp. Not required to be monotonic; the
    /// engine corrects for that per ring.
    fn now(&self) -> Timestamp;
}

/// Default timesource: wall-clock nanoseconds since the Unix epoch.
#[derive(Debug, Default)]
pub struct SystemTimesource;

impl Timesource for SystemTimesource {
    fn name(&self) -> &str {
        "system"
    }

    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    }
}

/// A timesource returning a constant value, useful for deterministic tests
/// (scenario 3 in the testable-properties list: switching to a clock that
/// always returns zero).
#[derive(Debug)]
pub struct FixedTimesource {
    value: Timestamp,
}

impl FixedTimesource {
    pub const fn new(value: Timestamp) -> Self {
        Self { value }
    }
}

impl Timesource for FixedTimesource {
    fn name(&self) -> &str {
        "fixed"
    }

    fn now(&self) -> Timestamp {
        self.value
    }
}

/// A timesource driven by an atomic counter, useful for tests that need a
/// strictly increasing but caller-controlled clock.
#[derive(Debug, Default)]
pub struct CountingTimesource {
    next: AtomicU64,
}

impl CountingTimesource {
    pub const fn new(start: Timestamp) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl Timesource for CountingTimesource {
    fn name(&self) -> &str {
        "counting"
    }

    fn now(&self) -> Timestamp {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
