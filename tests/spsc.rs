//! Cross-thread SPSC behavior the in-module tests cannot exercise.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use spinring::{RingBuffer, Spin, TickCounter, TimedOut};

#[test]
fn interleaved_threads_preserve_fifo_order() {
    const COUNT: usize = 100_000;
    let ring = RingBuffer::<4>::new();

    thread::scope(|s| {
        let (mut tx, mut rx) = ring.split();

        s.spawn(move || {
            for i in 0..COUNT {
                tx.write((i % 251) as u8, 0).unwrap();
            }
        });

        s.spawn(move || {
            for i in 0..COUNT {
                let byte = rx.read(0).unwrap();
                assert_eq!(byte, (i % 251) as u8);
            }
        });
    });
}

#[test]
fn zero_timeout_waits_past_any_bounded_deadline() {
    let ring = RingBuffer::<2>::new();
    let finished = AtomicBool::new(false);

    thread::scope(|s| {
        let (mut tx, mut rx) = ring.split();
        let finished = &finished;

        s.spawn(move || {
            let byte = rx.read(0).unwrap();
            assert_eq!(byte, b'k');
            finished.store(true, Ordering::Release);
        });

        thread::sleep(Duration::from_millis(100));
        assert!(
            !finished.load(Ordering::Acquire),
            "a zero timeout must keep waiting, not fail fast"
        );

        tx.write(b'k', 0).unwrap();
    });

    assert!(finished.load(Ordering::Acquire));
}

#[test]
fn deadline_expires_against_a_live_tick_counter() {
    static TICKS: TickCounter = TickCounter::new(1);
    let ring = RingBuffer::<2, _, _>::with_hooks(&TICKS, Spin);
    let stop = AtomicBool::new(false);

    thread::scope(|s| {
        let stop = &stop;
        s.spawn(move || {
            while !stop.load(Ordering::Acquire) {
                TICKS.tick();
                thread::yield_now();
            }
        });

        let mut rx = ring.consumer();
        let before = TICKS.millis();
        assert_eq!(rx.read(50), Err(TimedOut));
        let after = TICKS.millis();

        assert!(after.wrapping_sub(before) >= 50);
        stop.store(true, Ordering::Release);
    });
}
