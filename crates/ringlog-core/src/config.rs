//! Plain configuration aggregates for rings, the engine, and file output.
//!
//! No config-file crate: every option struct is a `Copy` aggregate built in
//! code, with `const fn` constructors that `assert!` on out-of-range
//! values — invalid configuration is a setup-time failure, not a
//! recoverable `Result`, per the spec's error taxonomy.

use crate::mask::Mask;

/// Ring option flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RingFlags(u8);

impl RingFlags {
    /// Serialize producers with the ring's mutex.
    pub const SHARED: Self = Self(1 << 0);
    /// Ignore the final `release()`; never deallocated.
    pub const IMMORTAL: Self = Self(1 << 1);
    /// Another thread-local may claim the same name once refcount ≤ 2.
    pub const REUSABLE: Self = Self(1 << 2);
    /// A full ring blocks the producer instead of dropping.
    pub const BLOCKING: Self = Self(1 << 3);

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for RingFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Ring construction options.
#[derive(Debug, Clone, Copy)]
pub struct RingOptions {
    /// Rounded up to the next power of two (one slot reserved).
    pub capacity: usize,
    /// 0..9999, higher drains first.
    pub prio: u16,
    pub flags: RingFlags,
    /// Bytes of tailroom reserved per record slot for compound arguments.
    pub record_tailroom: usize,
}

impl RingOptions {
    #[must_use]
    pub const fn new(capacity: usize, prio: u16, flags: RingFlags, record_tailroom: usize) -> Self {
        assert!(prio <= 9999, "prio must be in 0..=9999");
        Self { capacity, prio, flags, record_tailroom }
    }

    /// Capacity rounded up to a power of two, with one slot reserved so
    /// that `head == tail` unambiguously means empty. Capacity 1 rounds up
    /// to 2.
    #[must_use]
    pub const fn rounded_capacity(&self) -> usize {
        let want = if self.capacity < 2 { 2 } else { self.capacity + 1 };
        want.next_power_of_two()
    }
}

impl Default for RingOptions {
    fn default() -> Self {
        Self::new(4096, 0, RingFlags::empty(), 256)
    }
}

/// Engine feature bitset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineFeatures(u8);

impl EngineFeatures {
    pub const DISABLE_TSO: Self = Self(1 << 0);

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// CPU scheduling hints applied from within the thread being configured
/// (engine thread, file-rotation helper thread).
#[derive(Debug, Clone, Default)]
pub struct SchedParam {
    pub policy: Option<String>,
    pub priority: Option<i32>,
    /// Raw affinity string, e.g. `"0,2-3"`; parsed by the `affinity`
    /// feature (requires `libc`). Ignored if the feature is disabled.
    pub cpu_affinity: Option<String>,
}

/// Engine construction options.
#[derive(Clone)]
pub struct EngineOptions {
    pub default_mask: Mask,
    pub polling_interval_usec: u64,
    /// Entry count; 0 disables TSO outright (equivalent to
    /// `features.contains(DISABLE_TSO)`).
    pub tso_buffer_capacity: usize,
    pub features: EngineFeatures,
    pub schedparam: SchedParam,
    pub internal_ring_capacity: usize,
}

impl EngineOptions {
    #[must_use]
    pub fn tso_enabled(&self) -> bool {
        self.tso_buffer_capacity > 0 && !self.features.contains(EngineFeatures::DISABLE_TSO)
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        let mut default_mask = Mask::new();
        default_mask
            .add(".*:^(INFO|WARN|ERROR|FATAL)$")
            .expect("default mask literal is a fixed, valid regex");
        Self {
            default_mask,
            polling_interval_usec: 10_000,
            tso_buffer_capacity: 4096,
            features: EngineFeatures::empty(),
            schedparam: SchedParam::default(),
            internal_ring_capacity: 256,
        }
    }
}

/// File output construction options.
#[derive(Debug, Clone)]
pub struct FileOutputOptions {
    pub perms: u32,
    pub max_size: u64,
    pub max_count: u32,
    pub buffer_capacity: usize,
    pub schedparam: SchedParam,
}

impl Default for FileOutputOptions {
    fn default() -> Self {
        Self {
            perms: 0o666,
            max_size: 1024 * 1024 * 1024,
            max_count: 128,
            buffer_capacity: 8192,
            schedparam: SchedParam::default(),
        }
    }
}
