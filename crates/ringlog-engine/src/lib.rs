//! Consumer engine: the background thread that drains every registered
//! ring, merges records into timestamp order, and feeds them to a
//! formatter and sink.

mod engine;
mod registry;
mod special;
mod tso;

pub use engine::{Engine, EngineStats, EngineStatsSnapshot, RegistryError};
