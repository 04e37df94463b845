//! Buffered output sinks for formatted log bytes.
//!
//! Mirrors the original library's `ostrbuf` hierarchy: a `Sink` accumulates
//! bytes in a fixed-capacity buffer and only calls into the underlying
//! transport (`do_flush`) when the buffer would overflow or on an explicit
//! `flush()`. A sink that hits a write error latches into a permanently
//! failed state — there is no way to clear it, matching the original's
//! "failed streams cannot be reused" contract. This crate never formats
//! records; it only moves bytes that `ringlog-format` already produced.

mod buffer;
mod fd;
mod null;
mod tee;

pub use buffer::{Sink, SinkError};
pub use fd::FdSink;
pub use null::NullSink;
pub use tee::TeeSink;
