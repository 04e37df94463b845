//! A dedicated-ring producer handle.
//!
//! Grounded on `ringmpsc::channel::Producer`: a handle is pinned to one
//! ring and deliberately does not implement `Clone` — a clone would let
//! two threads write through the same handle, defeating the single
//! producer invariant the ring's unlocked fast path relies on. Unlike the
//! teacher, the ring itself may still carry `SHARED` and be posted to by
//! other handles at the same time; `Producer` only promises that *this*
//! handle is single-owner, not that the ring is.
//!
//! Dropping a `Producer` drops its `Arc<Ring>` clone; once every other
//! owner (the registry's own clone, any other `Producer`) has done the
//! same, the engine's orphan check (`Arc::strong_count(&ring) <= 2`)
//! reclaims the ring on its next poll. There is no explicit `release()`
//! call to make — `Arc`'s own refcounting is the release.

use std::sync::Arc;

use ringlog_core::{Arg, Area, Ring};

use crate::post;

/// A producer bound to one ring. Not `Clone` by design.
pub struct Producer {
    ring: Arc<Ring>,
}

impl Producer {
    #[must_use]
    pub fn new(ring: Arc<Ring>) -> Self {
        Self { ring }
    }

    #[must_use]
    pub fn ring(&self) -> &Arc<Ring> {
        &self.ring
    }

    /// Post through this producer's ring, honoring the `SHARED` mutex if
    /// the ring carries that flag.
    pub fn post(&self, area: &Arc<Area>, section: u16, args: &[Arg<'_>]) -> bool {
        post::post(&self.ring, area, section, args)
    }

    /// Post through this producer's ring without taking the `SHARED`
    /// mutex, even if the ring has it. Sound only when this handle is
    /// known to be the sole writer for the duration of the call.
    pub fn post_unlocked(&self, area: &Arc<Area>, section: u16, args: &[Arg<'_>]) -> bool {
        post::post_unlocked(&self.ring, area, section, args)
    }
}
