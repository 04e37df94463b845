//! Walkthrough of the producer API: an area, a ring, a handful of posts, a
//! flush, and a clean shutdown.
//!
//! Run with: `cargo run -p ringlog-demo --bin basic_demo`

use std::io;
use std::time::Duration;

use anyhow::Result;
use ringlog::{
    Arg, Engine, EngineOptions, FdSink, Output, Producer, RingFlags, RingOptions, TextFormatter,
};

fn main() -> Result<()> {
    println!("=== ringlog basic demo ===\n");

    demo_area_and_filtering()?;
    demo_post_and_flush()?;
    demo_shared_ring()?;

    println!("\n=== all demos completed ===");
    Ok(())
}

/// Demo 1: areas gate posts by section before a ring is even touched.
fn demo_area_and_filtering() -> Result<()> {
    println!("--- Demo 1: area/section filtering ---");

    let mut options = EngineOptions::default();
    options.polling_interval_usec = 2_000;
    let guard = ringlog::activate(
        Output { sink: Box::new(FdSink::new(io::stdout(), 4096)), format: Box::new(TextFormatter::new()) },
        options,
    );
    let engine = ringlog::default_engine().expect("just activated");

    let area = engine.add_area("demo.area", &["NOISY"])?;
    let info = area.section_index("INFO").unwrap();
    let noisy = area.section_index("NOISY").unwrap();
    area.reset(noisy);

    let ring = engine.add_ring("demo.area.ring", RingOptions::new(1024, 0, RingFlags::empty(), 128)).unwrap();
    let producer = Producer::new(ring);

    producer.post(&area, info, &[Arg::Cstr(b"hello from INFO")]);
    let dropped = !producer.post(&area, noisy, &[Arg::Cstr(b"you should never see this")]);
    println!("  NOISY post filtered out: {dropped}");

    engine.flush(None, 1_000_000);
    std::thread::sleep(Duration::from_millis(50));
    drop(guard);
    println!();
    Ok(())
}

/// Demo 2: posting a few typed arguments and waiting for the flush ack.
fn demo_post_and_flush() -> Result<()> {
    println!("--- Demo 2: post + flush ---");

    let guard = ringlog::activate(
        Output { sink: Box::new(FdSink::new(io::stdout(), 4096)), format: Box::new(TextFormatter::new()) },
        EngineOptions::default(),
    );
    let engine = ringlog::default_engine().expect("just activated");
    let area = engine.add_area("demo.typed", &[])?;
    let section = area.section_index("INFO").unwrap();
    let ring = engine.add_ring("demo.typed.ring", RingOptions::default()).unwrap();
    let producer = Producer::new(ring);

    producer.post(
        &area,
        section,
        &[Arg::Cstr(b"startup complete"), Arg::Uint32(42), Arg::Double(3.5)],
    );

    let acked = engine.flush(Some("demo.typed.ring"), 2_000_000);
    println!("  flush acked: {acked}");

    drop(guard);
    println!();
    Ok(())
}

/// Demo 3: two producers sharing one ring via the `SHARED` flag.
fn demo_shared_ring() -> Result<()> {
    println!("--- Demo 3: shared ring, two producers ---");

    let guard = ringlog::activate(
        Output { sink: Box::new(FdSink::new(io::sink(), 4096)), format: Box::new(TextFormatter::new()) },
        EngineOptions::default(),
    );
    let engine = ringlog::default_engine().expect("just activated");
    let area = engine.add_area("demo.shared", &[])?;
    let section = area.section_index("INFO").unwrap();
    let ring = engine.add_ring("demo.shared.ring", RingOptions::new(4096, 0, RingFlags::SHARED, 64)).unwrap();

    let producer_a = std::sync::Arc::new(Producer::new(std::sync::Arc::clone(&ring)));
    let producer_b = std::sync::Arc::new(Producer::new(ring));
    let area_a = std::sync::Arc::clone(&area);

    let a = {
        let producer = std::sync::Arc::clone(&producer_a);
        let area = std::sync::Arc::clone(&area_a);
        std::thread::spawn(move || {
            for i in 0..500u32 {
                producer.post(&area, section, &[Arg::Uint32(i)]);
            }
        })
    };
    let b = {
        let producer = std::sync::Arc::clone(&producer_b);
        std::thread::spawn(move || {
            for i in 0..500u32 {
                producer.post(&area, section, &[Arg::Uint32(i)]);
            }
        })
    };
    a.join().unwrap();
    b.join().unwrap();
    engine.flush(Some("demo.shared.ring"), 2_000_000);
    println!("  stats: {:?}", engine.stats());

    drop(guard);
    Ok(())
}
