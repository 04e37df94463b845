//! Sink that discards everything — used to mute an area/ring without
//! special-casing "no output" at the engine level.

use crate::buffer::BufferedCore;
use crate::Sink;

pub struct NullSink {
    core: BufferedCore,
}

impl NullSink {
    #[must_use]
    pub fn new() -> Self {
        Self { core: BufferedCore::new(0) }
    }

    /// Construct a `NullSink` that is already in the failed state, useful
    /// for tests that want a guaranteed-latched sink without a real I/O
    /// error.
    #[must_use]
    pub fn failed(err: impl Into<String>) -> Self {
        let mut core = BufferedCore::new(0);
        core.mark_failed(err);
        Self { core }
    }
}

impl Default for NullSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for NullSink {
    fn push(&mut self, _data: &[u8]) {}

    fn flush(&mut self) {
        self.core.reset();
    }

    fn failed(&self) -> bool {
        self.core.is_failed()
    }

    fn error(&self) -> Option<&str> {
        self.core.error_message()
    }
}
