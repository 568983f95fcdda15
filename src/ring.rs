//! Spin-wait SPSC byte ring connecting an interrupt producer to a polling consumer.
//!
//! # Overview
//! - Single producer, single consumer, fixed capacity `N` with all `N` slots usable.
//! - Occupancy is tracked by a free-slot counter; the cursors are never compared to each
//!   other, so no slot is sacrificed to tell full from empty.
//! - Blocking operations spin until ready, with an optional deadline measured on an
//!   injected [`TickSource`]; an injected [`IdleHook`] runs once per unsuccessful poll.
//! - A timeout of `0` disables the deadline. Under the default [`NoTime`] source nonzero
//!   deadlines never expire; install a real source before relying on them.
//! - `try_write` and `try_read` never block and are the only operations meant for
//!   interrupt context. `try_write` on a full ring drops the offered byte and reports
//!   `false`.
//!
//! # Memory ordering
//! `free` is the only cross-context handshake. The producer stores the byte, then gives
//! the slot away with `fetch_sub(AcqRel)`; the consumer observes availability with an
//! `Acquire` load of `free`, reads the byte, then returns the slot with
//! `fetch_add(AcqRel)`. Each cursor is written by exactly one side and never read by the
//! other, so cursor accesses are `Relaxed`.
//!
//! # Notes
//! - Capacity is capped at 255 so the counter and cursors fit in `AtomicU8`, keeping the
//!   struct small enough for comfortable `static` placement on 8-bit targets.
//! - Elapsed time is always computed with wrapping subtraction; a tick source wrapping
//!   mid-wait is normal operation.

use core::cell::UnsafeCell;

#[cfg(not(feature = "portable-atomic"))]
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};
#[cfg(feature = "portable-atomic")]
use portable_atomic::{AtomicBool, AtomicU8, Ordering};

use thiserror::Error;

use crate::time::{NoTime, Tick, TickSource};

/// A blocking operation gave up: the deadline elapsed before the ring became ready.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("timed out waiting for ring readiness")]
pub struct TimedOut;

/// What a wait loop does while the ring is not ready.
///
/// Runs once per unsuccessful poll. Pure side effect: the hook returns nothing and
/// cannot end or extend the wait.
pub trait IdleHook {
    fn idle(&self);
}

impl<T: IdleHook> IdleHook for &T {
    #[inline]
    fn idle(&self) {
        (**self).idle();
    }
}

impl IdleHook for fn() {
    #[inline]
    fn idle(&self) {
        self();
    }
}

/// Default idle hook: the architectural spin-wait hint, otherwise nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct Spin;

impl IdleHook for Spin {
    #[inline]
    fn idle(&self) {
        core::hint::spin_loop();
    }
}

/// Fixed-capacity SPSC byte ring with spin-with-timeout blocking on both sides.
///
/// The buffer itself is inert storage plus the injected clock and idle hook; all traffic
/// goes through the [`Producer`] and [`Consumer`] handles. Construction is `const`, so a
/// ring can live in a `static` and have its producer handle moved into an interrupt
/// handler while the mainline keeps the consumer.
pub struct RingBuffer<const N: usize, C = NoTime, I = Spin> {
    slots: [UnsafeCell<u8>; N],
    free: AtomicU8,
    write_idx: AtomicU8,
    read_idx: AtomicU8,
    producer_taken: AtomicBool,
    consumer_taken: AtomicBool,
    clock: C,
    idle: I,
}

unsafe impl<const N: usize, C: Sync, I: Sync> Sync for RingBuffer<N, C, I> {}

impl<const N: usize> RingBuffer<N> {
    /// Empty ring with the do-nothing defaults: no clock (timeouts never expire) and a
    /// plain spin for idle.
    pub const fn new() -> Self {
        Self::with_hooks(NoTime, Spin)
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize, C, I> RingBuffer<N, C, I> {
    /// Empty ring with an injected tick source and idle hook.
    pub const fn with_hooks(clock: C, idle: I) -> Self {
        assert!(N >= 1 && N <= 255);
        Self {
            slots: [const { UnsafeCell::new(0) }; N],
            free: AtomicU8::new(N as u8),
            write_idx: AtomicU8::new(0),
            read_idx: AtomicU8::new(0),
            producer_taken: AtomicBool::new(false),
            consumer_taken: AtomicBool::new(false),
            clock,
            idle,
        }
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Slots currently writable: a lower bound in producer context, an upper bound in
    /// consumer context.
    #[inline]
    pub fn write_available(&self) -> usize {
        self.free.load(Ordering::Acquire) as usize
    }

    /// Bytes currently readable: a lower bound in consumer context, an upper bound in
    /// producer context.
    #[inline]
    pub fn read_available(&self) -> usize {
        N - self.write_available()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.write_available() == N
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.write_available() == 0
    }

    /// Take the producer handle. Panics if it is already taken; dropping the handle
    /// releases it again with the cursor state intact.
    pub fn producer(&self) -> Producer<'_, N, C, I> {
        if self.producer_taken.swap(true, Ordering::AcqRel) {
            panic!("producer handle already taken");
        }
        Producer { ring: self }
    }

    /// Take the consumer handle. Panics if it is already taken; dropping the handle
    /// releases it again with the cursor state intact.
    pub fn consumer(&self) -> Consumer<'_, N, C, I> {
        if self.consumer_taken.swap(true, Ordering::AcqRel) {
            panic!("consumer handle already taken");
        }
        Consumer { ring: self }
    }

    /// Take both handles at once.
    pub fn split(&self) -> (Producer<'_, N, C, I>, Consumer<'_, N, C, I>) {
        (self.producer(), self.consumer())
    }
}

impl<const N: usize, C: TickSource, I: IdleHook> RingBuffer<N, C, I> {
    fn wait_for(&self, timeout: Tick, ready: impl Fn(&Self) -> bool) -> Result<(), TimedOut> {
        let start = self.clock.now();
        loop {
            if ready(self) {
                return Ok(());
            }
            if timeout != 0 && self.clock.now().wrapping_sub(start) >= timeout {
                return Err(TimedOut);
            }
            self.idle.idle();
        }
    }
}

/// Write half of a [`RingBuffer`]. At most one exists at a time.
///
/// Only [`try_write`](Producer::try_write) may run in interrupt context; the blocking
/// operations spin and belong in the mainline.
pub struct Producer<'a, const N: usize, C = NoTime, I = Spin> {
    ring: &'a RingBuffer<N, C, I>,
}

impl<'a, const N: usize, C, I> Producer<'a, N, C, I> {
    /// Slots currently writable.
    #[inline]
    pub fn available(&self) -> usize {
        self.ring.write_available()
    }

    /// Non-blocking write. A full ring drops `byte` and reports `false`.
    #[inline]
    pub fn try_write(&mut self, byte: u8) -> bool {
        if self.ring.free.load(Ordering::Acquire) == 0 {
            return false;
        }
        self.commit(byte);
        true
    }

    fn commit(&mut self, byte: u8) {
        let idx = self.ring.write_idx.load(Ordering::Relaxed) as usize;
        unsafe { *self.ring.slots[idx].get() = byte };
        self.ring
            .write_idx
            .store(((idx + 1) % N) as u8, Ordering::Relaxed);
        self.ring.free.fetch_sub(1, Ordering::AcqRel);
    }
}

impl<'a, const N: usize, C: TickSource, I: IdleHook> Producer<'a, N, C, I> {
    /// Spin until at least one slot is writable. A `timeout` of `0` waits forever.
    pub fn wait_writable(&self, timeout: Tick) -> Result<(), TimedOut> {
        self.ring
            .wait_for(timeout, |ring| ring.free.load(Ordering::Acquire) > 0)
    }

    /// Blocking write: spin until a slot is free, then store `byte`. A `timeout` of `0`
    /// waits forever.
    pub fn write(&mut self, byte: u8, timeout: Tick) -> Result<(), TimedOut> {
        self.wait_writable(timeout)?;
        self.commit(byte);
        Ok(())
    }
}

impl<'a, const N: usize, C, I> Drop for Producer<'a, N, C, I> {
    fn drop(&mut self) {
        self.ring.producer_taken.store(false, Ordering::Release);
    }
}

/// Read half of a [`RingBuffer`]. At most one exists at a time.
///
/// Only [`try_read`](Consumer::try_read) may run in interrupt context; the blocking
/// operations spin and belong in the mainline.
pub struct Consumer<'a, const N: usize, C = NoTime, I = Spin> {
    ring: &'a RingBuffer<N, C, I>,
}

impl<'a, const N: usize, C, I> Consumer<'a, N, C, I> {
    /// Bytes currently readable.
    #[inline]
    pub fn available(&self) -> usize {
        self.ring.read_available()
    }

    /// Non-blocking read.
    #[inline]
    pub fn try_read(&mut self) -> Option<u8> {
        if self.ring.free.load(Ordering::Acquire) == N as u8 {
            return None;
        }
        Some(self.take())
    }

    fn take(&mut self) -> u8 {
        let idx = self.ring.read_idx.load(Ordering::Relaxed) as usize;
        let byte = unsafe { *self.ring.slots[idx].get() };
        self.ring
            .read_idx
            .store(((idx + 1) % N) as u8, Ordering::Relaxed);
        self.ring.free.fetch_add(1, Ordering::AcqRel);
        byte
    }
}

impl<'a, const N: usize, C: TickSource, I: IdleHook> Consumer<'a, N, C, I> {
    /// Spin until at least one byte is readable. A `timeout` of `0` waits forever.
    pub fn wait_readable(&self, timeout: Tick) -> Result<(), TimedOut> {
        self.ring
            .wait_for(timeout, |ring| ring.free.load(Ordering::Acquire) < N as u8)
    }

    /// Blocking read: spin until a byte arrives, then return it. A `timeout` of `0`
    /// waits forever.
    pub fn read(&mut self, timeout: Tick) -> Result<u8, TimedOut> {
        self.wait_readable(timeout)?;
        Ok(self.take())
    }
}

impl<'a, const N: usize, C, I> Drop for Consumer<'a, N, C, I> {
    fn drop(&mut self) {
        self.ring.consumer_taken.store(false, Ordering::Release);
    }
}
