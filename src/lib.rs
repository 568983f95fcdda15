//! Spin-wait SPSC byte ring for interrupt-to-mainline serial plumbing.
//!
//! # Highlights
//! - Fixed-capacity byte ring with all `N` slots usable; no allocation, no dynamic
//!   dispatch.
//! - Lock-free SPSC handoff built for a UART receive interrupt feeding a polling
//!   mainline on scheduler-less targets.
//! - Blocking operations spin with a deadline measured on an injected [`TickSource`];
//!   an injected [`IdleHook`] runs once per unsuccessful poll. A timeout of `0` waits
//!   forever.
//! - Optional serial line discipline (echo, newline mapping, drop accounting) speaking
//!   `embedded-io`.
//!
//! # Quick start
//! ```
//! use spinring::RingBuffer;
//!
//! let ring = RingBuffer::<16>::new();
//! let (mut tx, mut rx) = ring.split();
//!
//! assert!(tx.try_write(b'h'));
//! assert!(tx.try_write(b'i'));
//! assert_eq!(rx.try_read(), Some(b'h'));
//! assert_eq!(rx.read(0), Ok(b'i'));
//! ```
//!
//! # Feeding the ring from an interrupt
//! The ring is `const`-constructible and `Sync`, so it can live in a `static` with the
//! producer handle moved into the interrupt's state:
//! ```
//! use core::cell::RefCell;
//! use critical_section::Mutex;
//! use spinring::{Producer, RingBuffer};
//!
//! static RING: RingBuffer<64> = RingBuffer::new();
//! static RX_HALF: Mutex<RefCell<Option<Producer<'static, 64>>>> =
//!     Mutex::new(RefCell::new(None));
//!
//! fn on_receive(byte: u8) {
//!     critical_section::with(|cs| {
//!         if let Some(tx) = RX_HALF.borrow_ref_mut(cs).as_mut() {
//!             tx.try_write(byte);
//!         }
//!     });
//! }
//!
//! critical_section::with(|cs| {
//!     RX_HALF.borrow_ref_mut(cs).replace(RING.producer());
//! });
//!
//! on_receive(b'!');
//! assert_eq!(RING.consumer().try_read(), Some(b'!'));
//! ```
//!
//! # No-std
//! The crate is `#![no_std]` by default. Tests require `std`.
//!
//! # Safety and concurrency
//! This crate is SPSC by construction: exactly one producer and one consumer handle
//! exist at a time. `producer()`/`consumer()` panic if the handle is already taken;
//! dropping a handle releases its side with the cursor state intact. Blocking
//! operations must stay out of interrupt context: `try_write`/`try_read` are the
//! interrupt-safe surface.
//!
//! # Semantics
//! - The free-slot count is the only cross-context occupancy authority; the cursors
//!   are private to their side.
//! - Timeouts are `u32` ticks; `0` disables the deadline. Under the default [`NoTime`]
//!   source, nonzero deadlines never expire.
//! - `try_write` against a full ring drops the offered byte and reports `false`.
//! - `read`/`write` return [`TimedOut`] when the deadline passes; nothing is retried
//!   internally.
#![no_std]

pub mod ring;
pub mod serial;
pub mod time;

pub use ring::{Consumer, IdleHook, Producer, RingBuffer, Spin, TimedOut};
pub use serial::{
    DEFAULT_READ_TIMEOUT, DEFAULT_WRITE_TIMEOUT, LineControl, LineStats, RingWriter,
    SerialReader, SerialRx, SerialWriter,
};
pub use time::{Delay, NoTime, Tick, TickCounter, TickSource, wait_ticks};

#[cfg(test)]
extern crate std;
