use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use ringlog_core::{Arg, Ring, RingFlags, RingOptions};

fn bench_push_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("post_latency");
    group.throughput(Throughput::Elements(1));

    group.bench_function("push_begin_commit_uint32", |b| {
        let ring = Ring::new(
            "bench",
            RingOptions::new(4096, 0, RingFlags::empty(), 64),
            Arc::new(AtomicBool::new(false)),
        );
        b.iter(|| {
            let mut g = ring.push_begin().unwrap_or_else(|| {
                // Drain one slot so the benchmark loop never stalls on a
                // full ring once capacity is exhausted.
                let (head, _tail) = ring.consumer_snapshot();
                ring.commit_pop(head + 1);
                ring.push_begin().expect("room after drain")
            });
            let seq = ring.inc_seqnum();
            g.begin(None, black_box(0), seq, 0);
            g.set_arg(0, &Arg::Uint32(black_box(42)));
            g.commit();
        });
    });

    group.bench_function("push_begin_commit_cstr", |b| {
        let ring = Ring::new(
            "bench-cstr",
            RingOptions::new(4096, 0, RingFlags::empty(), 64),
            Arc::new(AtomicBool::new(false)),
        );
        let payload = b"connection established from 10.0.0.1:5432";
        b.iter(|| {
            let mut g = ring.push_begin().unwrap_or_else(|| {
                let (head, _tail) = ring.consumer_snapshot();
                ring.commit_pop(head + 1);
                ring.push_begin().expect("room after drain")
            });
            let seq = ring.inc_seqnum();
            g.begin(None, black_box(0), seq, 0);
            g.set_arg(0, &Arg::Cstr(black_box(payload)));
            g.commit();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_push_commit);
criterion_main!(benches);
