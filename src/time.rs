//! Injected tick sources and busy-wait delays for the ring's spin loops.
//!
//! # Overview
//! - [`TickSource`] is the clock deadlines are measured on: a wrapping `u32` reading,
//!   monotonic except for the wrap.
//! - [`NoTime`] is the do-nothing default: it always reads 0, so nonzero deadlines
//!   never expire under it.
//! - [`TickCounter`] adapts a periodic timer interrupt into a source: the interrupt
//!   calls [`tick`](TickCounter::tick), everyone else reads [`raw`](TickCounter::raw)
//!   or [`millis`](TickCounter::millis).
//! - [`wait_ticks`] and [`Delay`] busy-wait on top of a source; [`Delay`] implements
//!   `embedded_hal::delay::DelayNs`.
//!
//! # Notes
//! - All elapsed-time math is wrapping subtraction; a counter wrapping mid-wait is
//!   normal operation.
//! - With `ticks_per_ms > 1` the millisecond reading wraps early, at
//!   `u32::MAX / ticks_per_ms`: once per raw wrap, a deadline measured in milliseconds
//!   can expire ahead of time.

#[cfg(not(feature = "portable-atomic"))]
use core::sync::atomic::{AtomicU32, Ordering};
#[cfg(feature = "portable-atomic")]
use portable_atomic::{AtomicU32, Ordering};

use embedded_hal::delay::DelayNs;

/// Wrapping tick value; the unit is whatever the installed [`TickSource`] counts.
pub type Tick = u32;

/// Monotonic (modulo wrap) tick reading that waits measure deadlines on.
pub trait TickSource {
    fn now(&self) -> Tick;
}

impl<T: TickSource> TickSource for &T {
    #[inline]
    fn now(&self) -> Tick {
        (**self).now()
    }
}

impl TickSource for fn() -> Tick {
    #[inline]
    fn now(&self) -> Tick {
        self()
    }
}

/// Default source: always reads 0, so nonzero deadlines never expire under it.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTime;

impl TickSource for NoTime {
    #[inline]
    fn now(&self) -> Tick {
        0
    }
}

/// Free-running counter fed by a periodic timer interrupt.
///
/// The interrupt calls [`tick`](Self::tick) once per period; any context may read.
/// With `ticks_per_ms` increments per millisecond, [`raw`](Self::raw) is the
/// full-resolution reading and [`millis`](Self::millis) the millisecond one. As a
/// [`TickSource`] the counter reads milliseconds, so ring deadlines are whole
/// milliseconds.
pub struct TickCounter {
    ticks: AtomicU32,
    per_ms: u32,
}

impl TickCounter {
    pub const fn new(ticks_per_ms: u32) -> Self {
        assert!(ticks_per_ms >= 1);
        TickCounter {
            ticks: AtomicU32::new(0),
            per_ms: ticks_per_ms,
        }
    }

    /// One counter period elapsed. The only mutation; meant for the timer interrupt.
    #[inline]
    pub fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Full-resolution reading.
    #[inline]
    pub fn raw(&self) -> Tick {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Millisecond reading.
    #[inline]
    pub fn millis(&self) -> Tick {
        self.raw() / self.per_ms
    }
}

impl TickSource for TickCounter {
    #[inline]
    fn now(&self) -> Tick {
        self.millis()
    }
}

/// Busy-wait until `ticks` source ticks have elapsed.
///
/// Progress is measured as `now - start` with wrapping subtraction, never by comparing
/// absolute readings, so a source wrap during the wait does not stall or cut it short.
pub fn wait_ticks<S: TickSource>(source: &S, ticks: Tick) {
    let start = source.now();
    while source.now().wrapping_sub(start) < ticks {
        core::hint::spin_loop();
    }
}

/// Busy-wait delay over a [`TickCounter`], at raw-tick resolution.
pub struct Delay<'a> {
    counter: &'a TickCounter,
}

impl<'a> Delay<'a> {
    pub const fn new(counter: &'a TickCounter) -> Self {
        Delay { counter }
    }
}

impl DelayNs for Delay<'_> {
    fn delay_ns(&mut self, ns: u32) {
        // Rounds up to whole raw ticks; the counter's interrupt must be running for
        // this to return.
        let ticks = (ns as u64 * self.counter.per_ms as u64).div_ceil(1_000_000);
        let ticks = ticks.min(u32::MAX as u64) as u32;
        let start = self.counter.raw();
        while self.counter.raw().wrapping_sub(start) < ticks {
            core::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use std::sync::atomic::AtomicBool;
    use std::thread;

    /// Returns `start`, `start + 1`, ... on successive calls.
    struct Advancing(Cell<u32>);

    impl TickSource for Advancing {
        fn now(&self) -> Tick {
            let t = self.0.get();
            self.0.set(t.wrapping_add(1));
            t
        }
    }

    #[test]
    fn no_time_always_reads_zero() {
        assert_eq!(NoTime.now(), 0);
        assert_eq!(NoTime.now(), 0);
    }

    #[test]
    fn counter_scales_raw_ticks_to_millis() {
        let counter = TickCounter::new(8);
        assert_eq!(counter.raw(), 0);
        assert_eq!(counter.millis(), 0);

        for _ in 0..20 {
            counter.tick();
        }
        assert_eq!(counter.raw(), 20);
        assert_eq!(counter.millis(), 2);
        assert_eq!(counter.now(), 2);
    }

    #[test]
    fn fn_pointer_sources_work() {
        fn fixed() -> Tick {
            7
        }
        let source: fn() -> Tick = fixed;
        assert_eq!(source.now(), 7);
    }

    #[test]
    fn wait_ticks_returns_once_elapsed() {
        let clock = Advancing(Cell::new(0));
        wait_ticks(&clock, 5);
        // One read samples the start at 0; the loop reads 1..=5 and exits at 5.
        assert_eq!(clock.0.get(), 6);
    }

    #[test]
    fn wait_ticks_survives_wraparound() {
        let clock = Advancing(Cell::new(u32::MAX - 1));
        wait_ticks(&clock, 4);
        // Start samples at MAX - 1; the loop reads MAX, 0, 1, 2 and exits at 2.
        assert_eq!(clock.0.get(), 3);
    }

    #[test]
    fn zero_delay_returns_immediately() {
        let counter = TickCounter::new(8);
        Delay::new(&counter).delay_ns(0);
        assert_eq!(counter.raw(), 0);
    }

    #[test]
    fn delay_blocks_until_enough_raw_ticks() {
        let counter = TickCounter::new(8);
        let done = AtomicBool::new(false);

        thread::scope(|s| {
            s.spawn(|| {
                while !done.load(Ordering::Acquire) {
                    counter.tick();
                }
            });

            let before = counter.raw();
            // 250 us at 8 ticks/ms is two raw ticks.
            Delay::new(&counter).delay_us(250);
            let after = counter.raw();
            assert!(after.wrapping_sub(before) >= 2);

            done.store(true, Ordering::Release);
        });
    }
}
