//! Core types shared by every other `ringlog` crate: the packed record
//! layout, the lock-free single-producer/single-consumer ring, the
//! area/section filter and its regex-driven mask, and the pluggable
//! timesource.
//!
//! Nothing in this crate touches a byte sink or a formatter — those are
//! `ringlog-sink` and `ringlog-format`, kept separate the way the
//! original library keeps `ostrbuf`/`format` independent of `record`.

mod backoff;
pub mod area;
pub mod arg;
pub mod config;
mod invariants;
pub mod mask;
pub mod record;
pub mod ring;
pub mod timesource;

pub use area::{Area, AreaError};
pub use arg::{Arg, ArgTag, XdumpDescriptor};
pub use backoff::Backoff;
pub use config::{EngineFeatures, EngineOptions, FileOutputOptions, RingFlags, RingOptions, SchedParam};
pub use mask::{Mask, MaskError};
pub use record::{DecodedArg, Record, NARGS, SPECIAL_SECTION};
pub use ring::{PushGuard, Ring, RING_MAGIC};
pub use timesource::{CountingTimesource, FixedTimesource, SystemTimesource, Timesource, Timestamp};
