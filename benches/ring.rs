use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use spinring::RingBuffer;

fn nonblocking_cycle(c: &mut Criterion) {
    let ring = RingBuffer::<64>::new();
    let (mut tx, mut rx) = ring.split();

    c.bench_function("try_write_try_read_cycle", |b| {
        b.iter(|| {
            assert!(tx.try_write(black_box(0xA5)));
            black_box(rx.try_read())
        })
    });
}

fn blocking_cycle(c: &mut Criterion) {
    let ring = RingBuffer::<64>::new();
    let (mut tx, mut rx) = ring.split();

    c.bench_function("blocking_write_read_cycle", |b| {
        b.iter(|| {
            tx.write(black_box(0x5A), 0).unwrap();
            black_box(rx.read(0).unwrap())
        })
    });
}

fn burst_fill_drain(c: &mut Criterion) {
    let ring = RingBuffer::<64>::new();
    let (mut tx, mut rx) = ring.split();

    c.bench_function("fill_then_drain_64", |b| {
        b.iter(|| {
            for i in 0..64u8 {
                assert!(tx.try_write(i));
            }
            while let Some(byte) = rx.try_read() {
                black_box(byte);
            }
        })
    });
}

criterion_group!(benches, nonblocking_cycle, blocking_cycle, burst_fill_drain);
criterion_main!(benches);
