//! Facade: the producer API surface a caller actually uses, wiring
//! `ringlog-core`'s ring/area/mask types to `ringlog-engine`'s consumer
//! and `ringlog-sink`/`ringlog-format`'s output stack.
//!
//! A typical caller calls [`activate`] once near process start, keeping
//! the returned [`DeactivateGuard`] alive for as long as it wants to log,
//! then uses [`Engine::add_area`]/[`Engine::add_ring`] (via
//! [`default_engine`] or a directly held `Arc<Engine>`) and [`post`] /
//! [`post_unlocked`] on the hot path.

mod default_engine;
mod post;
mod producer;

pub use default_engine::{activate, deactivate, default_engine, DeactivateGuard, Output};
pub use post::{post, post_unlocked};
pub use producer::Producer;

pub use ringlog_core::{
    Arg, ArgTag, Area, AreaError, DecodedArg, EngineFeatures, EngineOptions, FileOutputOptions, Mask, MaskError,
    PushGuard, Record, Ring, RingFlags, RingOptions, SchedParam, SystemTimesource, Timesource, Timestamp,
};
pub use ringlog_engine::{Engine, EngineStats, EngineStatsSnapshot, RegistryError};
pub use ringlog_fileout::{FileOutput, RotateError};
pub use ringlog_format::{decode, DecodeError, DecodedRecord, DecodedWireArg, FormatData, Formatter, RawFormatter, TextFormatter, WireVersion};
pub use ringlog_sink::{FdSink, NullSink, Sink, SinkError, TeeSink};
