//! Rotating file output.
//!
//! Grounded on the original's `output_file`: a write path that appends to
//! the current chunk and asks a background helper thread to rotate once
//! the chunk exceeds `max_size`, plus a stable symlink that always points
//! at the chunk currently being written. The helper thread is a plain
//! `std::thread` woken by a `Condvar`, not async, because file rotation is
//! inherently a blocking filesystem operation done off the hot write path.

mod naming;
mod rotate;

pub use rotate::{FileOutput, RotateError};
