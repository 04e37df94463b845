//! End-to-end scenarios exercising the full producer -> ring -> engine ->
//! formatter -> sink pipeline through the facade's public API.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use ringlog::{Arg, Engine, EngineOptions, Producer, RingFlags, RingOptions, Sink, TextFormatter};

// These tests each start their own `Engine` directly rather than going
// through `activate`'s process-wide singleton — `cargo test` runs
// integration tests in parallel within one process, and the singleton is
// exercised on its own in `default_engine`'s unit tests instead.

#[derive(Clone, Default)]
struct CapturingSink {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl CapturingSink {
    fn snapshot(&self) -> Vec<u8> {
        self.bytes.lock().unwrap().clone()
    }
}

impl Sink for CapturingSink {
    fn push(&mut self, data: &[u8]) {
        self.bytes.lock().unwrap().extend_from_slice(data);
    }
    fn flush(&mut self) {}
    fn failed(&self) -> bool {
        false
    }
    fn error(&self) -> Option<&str> {
        None
    }
}

fn wait_until(mut cond: impl FnMut() -> bool, timeout: Duration) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    cond()
}

#[test]
fn hot_path_filter_only_enabled_sections_reach_the_engine() {
    let sink = CapturingSink::default();
    let mut options = EngineOptions::default();
    options.polling_interval_usec = 500;
    let engine = Engine::start(options, Box::new(sink.clone()), Box::new(TextFormatter::new()));

    let area = engine.add_area("A", &["D"]).unwrap();
    let disabled = area.section_index("D").unwrap();
    let enabled = area.section_index("INFO").unwrap();
    area.reset(disabled);
    area.set(enabled);

    let ring = engine.add_ring("hotpath", RingOptions::new(4096, 0, RingFlags::empty(), 64)).unwrap();
    let producer = Producer::new(ring);

    for _ in 0..1000 {
        assert!(!producer.post(&area, disabled, &[]));
    }
    for _ in 0..1000 {
        assert!(producer.post(&area, enabled, &[Arg::Uint32(1)]));
    }

    assert!(wait_until(|| engine.stats().recs_out >= 1000, Duration::from_secs(2)));
    assert_eq!(engine.stats().recs_out, 1000, "the disabled-section posts never became records");
    assert!(!sink.snapshot().is_empty(), "the enabled-section records reached the output bytes");

    drop(engine);
}

#[test]
fn shared_ring_two_producers_no_duplicate_seqnums() {
    let sink = CapturingSink::default();
    let mut options = EngineOptions::default();
    options.polling_interval_usec = 500;
    let engine = Engine::start(options, Box::new(sink), Box::new(TextFormatter::new()));

    let area = engine.add_area("B", &[]).unwrap();
    let section = area.section_index("INFO").unwrap();
    area.set(section);

    let ring = engine
        .add_ring("shared", RingOptions::new(65536, 0, RingFlags::SHARED, 64))
        .unwrap();

    let producer_a = Arc::new(Producer::new(Arc::clone(&ring)));
    let producer_b = Arc::new(Producer::new(ring));
    let area_a = Arc::clone(&area);
    let area_b = area;

    let t1 = {
        let producer = Arc::clone(&producer_a);
        let area = Arc::clone(&area_a);
        thread::spawn(move || {
            for i in 0..10_000u32 {
                while !producer.post(&area, section, &[Arg::Uint32(i)]) {
                    thread::yield_now();
                }
            }
        })
    };
    let t2 = {
        let producer = Arc::clone(&producer_b);
        let area = Arc::clone(&area_b);
        thread::spawn(move || {
            for i in 0..10_000u32 {
                while !producer.post(&area, section, &[Arg::Uint32(i)]) {
                    thread::yield_now();
                }
            }
        })
    };
    t1.join().unwrap();
    t2.join().unwrap();

    assert!(wait_until(|| engine.stats().recs_out >= 20_000, Duration::from_secs(10)));
    assert_eq!(engine.stats().recs_out, 20_000);
    assert_eq!(engine.stats().recs_dropped, 0, "no gaps should appear in a correctly serialized shared ring");

    drop(engine);
}

#[test]
fn flush_acks_once_the_engine_has_drained_the_ring() {
    let sink = CapturingSink::default();
    let options = EngineOptions::default();
    let engine = Engine::start(options, Box::new(sink), Box::new(TextFormatter::new()));

    let area = engine.add_area("C", &[]).unwrap();
    let section = area.section_index("INFO").unwrap();
    area.set(section);
    let ring = engine.add_ring("flushme", RingOptions::new(64, 0, RingFlags::empty(), 64)).unwrap();
    let producer = Producer::new(ring);

    for i in 0..10u64 {
        assert!(producer.post(&area, section, &[Arg::Uint64(i)]));
    }

    assert!(engine.flush(Some("flushme"), 1_000_000));

    drop(engine);
}
