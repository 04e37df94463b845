//! The `Sink` trait and the buffering logic shared by every implementation.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("sink write failed: {0}")]
    WriteFailed(String),
}

/// An output sink that buffers bytes and flushes them to some underlying
/// transport once the buffer fills or on demand.
///
/// Implementors provide `do_flush`; everything else (the buffering
/// discipline, the latched failure flag) is handled by the blanket
/// `BufferedSink` helper each concrete sink embeds.
pub trait Sink: Send {
    /// Append bytes to the sink, flushing first if they would not fit.
    fn push(&mut self, data: &[u8]);

    /// Flush any buffered bytes to the underlying transport.
    fn flush(&mut self);

    /// True once a write to the underlying transport has failed. A failed
    /// sink never recovers; every subsequent `push`/`flush` is a no-op.
    fn failed(&self) -> bool;

    /// Human-readable cause of the failure, if any.
    fn error(&self) -> Option<&str>;
}

/// Buffering core embedded by every concrete `Sink`. Not itself a `Sink` —
/// concrete sinks hold one of these plus whatever state `do_flush` needs
/// (an fd, a peer sink, ...) and implement the trait by delegating into it.
pub(crate) struct BufferedCore {
    data: Vec<u8>,
    capacity: usize,
    failed: bool,
    error: Option<String>,
}

impl BufferedCore {
    pub(crate) fn new(capacity: usize) -> Self {
        Self { data: Vec::with_capacity(capacity), capacity, failed: false, error: None }
    }

    pub(crate) fn new_failed(err: impl Into<String>) -> Self {
        Self { data: Vec::new(), capacity: 0, failed: true, error: Some(err.into()) }
    }

    pub(crate) fn room(&self) -> usize {
        self.capacity.saturating_sub(self.data.len())
    }

    pub(crate) fn reset(&mut self) {
        self.data.clear();
    }

    pub(crate) fn buffered(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn is_failed(&self) -> bool {
        self.failed
    }

    pub(crate) fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Record a catastrophic failure: permanently latches the sink.
    pub(crate) fn mark_failed(&mut self, err: impl Into<String>) {
        self.failed = true;
        self.error = Some(err.into());
        self.data.clear();
        self.capacity = 0;
    }

    fn do_copy(&mut self, data: &[u8]) {
        self.data.extend_from_slice(data);
    }

    /// Append `data`, calling `do_flush` first if it would overflow the
    /// buffer. No-op once `failed`.
    pub(crate) fn push(&mut self, data: &[u8], mut do_flush: impl FnMut(&mut Self, &[u8])) {
        if self.failed {
            return;
        }
        if data.len() > self.room() {
            do_flush(self, data);
        } else {
            self.do_copy(data);
        }
    }

    /// Flush buffered bytes (and optionally new bytes that wouldn't fit).
    /// No-op once `failed`.
    pub(crate) fn flush(&mut self, data: &[u8], mut do_flush: impl FnMut(&mut Self, &[u8])) {
        if self.failed {
            return;
        }
        do_flush(self, data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_buffers_until_overflow() {
        let mut core = BufferedCore::new(8);
        let mut flushed = Vec::new();
        core.push(b"abcd", |c, d| {
            flushed.extend_from_slice(d);
            c.reset();
        });
        assert_eq!(core.buffered(), b"abcd");
        assert!(flushed.is_empty());

        core.push(b"12345", |c, d| {
            flushed.extend_from_slice(c.buffered());
            flushed.extend_from_slice(d);
            c.reset();
        });
        assert_eq!(flushed, b"abcd12345");
        assert!(core.buffered().is_empty());
    }

    #[test]
    fn failed_sink_ignores_further_writes() {
        let mut core = BufferedCore::new(8);
        core.mark_failed("disk full");
        let mut calls = 0;
        core.push(b"x", |_, _| calls += 1);
        core.flush(b"y", |_, _| calls += 1);
        assert_eq!(calls, 0);
        assert!(core.is_failed());
        assert_eq!(core.error_message(), Some("disk full"));
    }
}
