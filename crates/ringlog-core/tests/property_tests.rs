//! Property-based coverage of the ring shape invariants from spec.md §8.
//!
//! INV-RING-01 (`size + room + 1 == capacity`) and INV-RING-02
//! (`head` never laps `tail`) must hold after any interleaving of
//! pushes and pops, not just the hand-picked sequences in the unit tests.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use proptest::prelude::*;
use ringlog_core::{Arg, Ring, RingFlags, RingOptions};

fn fresh_ring(capacity: usize) -> Arc<Ring> {
    Ring::new("prop", RingOptions::new(capacity, 0, RingFlags::empty(), 32), Arc::new(AtomicBool::new(false)))
}

proptest! {
    /// INV-RING-01: the reserved-slot shape identity holds after any
    /// sequence of push/pop operations, regardless of requested capacity.
    #[test]
    fn prop_shape_invariant_holds(
        capacity in 1usize..256,
        ops in prop::collection::vec(prop::bool::ANY, 0..200),
    ) {
        let r = fresh_ring(capacity);
        let mut pending = 0usize;

        for push in ops {
            if push {
                if let Some(mut g) = r.push_begin() {
                    let seq = r.inc_seqnum();
                    g.begin(None, 0, seq, 0);
                    g.set_arg(0, &Arg::Uint32(0));
                    g.commit();
                    pending += 1;
                }
            } else if pending > 0 {
                let (head, _tail) = r.consumer_snapshot();
                r.commit_pop(head + 1);
                pending -= 1;
            }

            prop_assert_eq!(r.size() + r.room() + 1, r.capacity());
            prop_assert!(r.size() <= r.capacity() - 1);
        }
    }

    /// INV-RING-02: the consumer never observes a slot past the last
    /// committed `tail` — every snapshot yields exactly the records pushed
    /// and not yet popped, in push order.
    #[test]
    fn prop_consumer_never_outruns_producer(
        capacity in 2usize..64,
        push_count in 0usize..64,
    ) {
        let r = fresh_ring(capacity);
        let mut pushed = 0u32;
        for i in 0..push_count as u32 {
            if let Some(mut g) = r.push_begin() {
                let seq = r.inc_seqnum();
                g.begin(None, 0, seq, 0);
                g.set_arg(0, &Arg::Uint32(i));
                g.commit();
                pushed += 1;
            }
        }

        let (head, tail) = r.consumer_snapshot();
        prop_assert_eq!((tail - head) as u32, pushed);

        let mut last_seq: Option<u64> = None;
        for idx in head..tail {
            let rec = r.record_at(idx);
            if let Some(prev) = last_seq {
                prop_assert!(rec.seqnum() > prev);
            }
            last_seq = Some(rec.seqnum());
        }
        r.commit_pop(tail);
        prop_assert!(r.is_empty());
    }

    /// Non-blocking overflow always drops exactly the pushes that did not
    /// fit, and never corrupts the ones that did.
    #[test]
    fn prop_overflow_drops_dont_corrupt_surviving_records(
        capacity in 2usize..32,
        attempts in 0usize..128,
    ) {
        let r = fresh_ring(capacity);
        let usable = r.capacity() - 1;
        let mut accepted = 0usize;
        for i in 0..attempts as u32 {
            if let Some(mut g) = r.push_begin() {
                let seq = r.inc_seqnum();
                g.begin(None, 0, seq, 0);
                g.set_arg(0, &Arg::Uint32(i));
                g.commit();
                accepted += 1;
            }
        }
        prop_assert!(accepted <= usable);
        let dropped = attempts.saturating_sub(accepted);
        prop_assert_eq!(r.dropcnt() as usize, dropped);
    }
}
