//! Debug assertion macros for ring buffer and TSO invariants.
//!
//! Active only in debug builds (`#[cfg(debug_assertions)]`); zero overhead
//! in release builds.

/// `size + room + 1 == capacity`, both indices within `[0, capacity)`.
macro_rules! debug_assert_ring_shape {
    ($size:expr, $room:expr, $capacity:expr) => {
        debug_assert!(
            $size + $room + 1 == $capacity,
            "INV-RING-01 violated: size {} + room {} + 1 != capacity {}",
            $size,
            $room,
            $capacity
        )
    };
}

/// Per-ring seqnum only increases.
macro_rules! debug_assert_seqnum_monotonic {
    ($old:expr, $new:expr) => {
        debug_assert!(
            $new > $old,
            "INV-SEQ-01 violated: seqnum went from {} to {}",
            $old,
            $new
        )
    };
}

/// Head never advances past tail.
macro_rules! debug_assert_head_not_past_tail {
    ($head:expr, $tail:expr) => {
        debug_assert!(
            $head <= $tail,
            "INV-RING-02 violated: head {} advanced past tail {}",
            $head,
            $tail
        )
    };
}

/// Engine-visible per-ring timestamps strictly increase.
macro_rules! debug_assert_ts_monotonic {
    ($prev:expr, $new:expr) => {
        debug_assert!(
            $new > $prev,
            "INV-TS-01 violated: engine-visible timestamp went from {} to {}",
            $prev,
            $new
        )
    };
}

/// TSO never holds more entries than its capacity.
macro_rules! debug_assert_tso_bounded {
    ($len:expr, $capacity:expr) => {
        debug_assert!(
            $len <= $capacity,
            "INV-TSO-01 violated: {} entries exceed capacity {}",
            $len,
            $capacity
        )
    };
}

pub(crate) use debug_assert_head_not_past_tail;
pub(crate) use debug_assert_ring_shape;
pub(crate) use debug_assert_seqnum_monotonic;
pub(crate) use debug_assert_ts_monotonic;
pub(crate) use debug_assert_tso_bounded;
