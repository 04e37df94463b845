//! Producer-side posting: the section-bit test followed by claim/populate/
//! commit against a ring, with a locked and an unlocked entry point.

use std::sync::Arc;

use ringlog_core::{Arg, Area, Ring};

/// Test `area`'s `section` bit; if set, claim the ring's tail slot under
/// its `SHARED` producer mutex (if any), populate it, and commit.
///
/// Returns `false` without touching the ring at all when the section is
/// disabled — this is the entire hot-path cost for a filtered-out call.
/// Also returns `false` if the ring is full in non-blocking mode.
pub fn post(ring: &Ring, area: &Arc<Area>, section: u16, args: &[Arg<'_>]) -> bool {
    if !area.test(section) {
        return false;
    }
    post_claimed(ring.push_begin(), ring, area, section, args)
}

/// Same as [`post`], but claims the slot via [`Ring::push_begin_unlocked`],
/// skipping the `SHARED` producer mutex even if the ring carries that
/// flag. Sound only when the caller has already serialized concurrent
/// producers some other way.
pub fn post_unlocked(ring: &Ring, area: &Arc<Area>, section: u16, args: &[Arg<'_>]) -> bool {
    if !area.test(section) {
        return false;
    }
    post_claimed(ring.push_begin_unlocked(), ring, area, section, args)
}

fn post_claimed(
    guard: Option<ringlog_core::PushGuard<'_>>,
    ring: &Ring,
    area: &Arc<Area>,
    section: u16,
    args: &[Arg<'_>],
) -> bool {
    let Some(mut guard) = guard else { return false };
    let seq = ring.inc_seqnum();
    let ts = ring.timesource().now();
    guard.begin(Some(Arc::clone(area)), ts, seq, section);
    guard.set_args(args);
    guard.commit();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringlog_core::{RingFlags, RingOptions};
    use std::sync::atomic::AtomicBool;

    fn new_ring(flags: RingFlags) -> Arc<Ring> {
        Ring::new("t", RingOptions::new(8, 0, flags, 64), Arc::new(AtomicBool::new(false)))
    }

    #[test]
    fn disabled_section_never_touches_the_ring() {
        let ring = new_ring(RingFlags::empty());
        let area = Arc::new(Area::new("A", &["D"]).unwrap());
        let section = area.section_index("D").unwrap();
        area.reset(section);

        for _ in 0..1000 {
            assert!(!post(&ring, &area, section, &[]));
        }
        assert!(ring.is_empty());
        assert_eq!(ring.inc_seqnum(), 0, "seqnum counter untouched by filtered-out posts");
    }

    #[test]
    fn enabled_section_produces_exactly_one_record_per_call() {
        let ring = new_ring(RingFlags::empty());
        let area = Arc::new(Area::new("A", &["I"]).unwrap());
        let section = area.section_index("I").unwrap();
        area.set(section);

        for _ in 0..3 {
            assert!(post(&ring, &area, section, &[Arg::Uint32(7)]));
        }
        assert_eq!(ring.size(), 3);
    }

    #[test]
    fn unlocked_path_skips_the_shared_mutex_but_still_writes() {
        let ring = new_ring(RingFlags::SHARED);
        let area = Arc::new(Area::new("A", &["I"]).unwrap());
        let section = area.section_index("I").unwrap();
        area.set(section);

        assert!(post_unlocked(&ring, &area, section, &[Arg::Uint64(9)]));
        assert_eq!(ring.size(), 1);
    }
}
