//! Serial line glue over the ring: interrupt-side receive, polled reads, newline
//! discipline.
//!
//! # Overview
//! - [`SerialRx`] is the receive-interrupt half: echo the byte back when enabled, then
//!   feed it to the ring; a full ring drops the byte and counts the loss.
//! - [`SerialReader`] is the mainline half: blocking reads with a per-reader deadline,
//!   carriage returns folded to newlines; implements `embedded_io::Read`.
//! - [`SerialWriter`] applies the outbound newline swap over any `embedded_io::Write`.
//! - [`RingWriter`] exposes a [`Producer`] as `embedded_io::Write`, for a buffered
//!   transmit direction drained from the other side.
//! - [`LineControl`] is the shared echo/drop-accounting block both halves reference.
//!
//! # Notes
//! - Echo happens before the enqueue, in interrupt context, through the same newline
//!   swap as any other transmit. The enqueued byte is the raw one.
//! - The inbound map folds `'\r'` to `'\n'` only; the outbound swap goes both ways.

#[cfg(not(feature = "portable-atomic"))]
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
#[cfg(feature = "portable-atomic")]
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use embedded_io::{ErrorKind, ErrorType, Read, Write};

use crate::ring::{Consumer, IdleHook, Producer, Spin, TimedOut};
use crate::time::{NoTime, Tick, TickSource};

/// Default deadline for blocking reads, in source ticks (milliseconds with a
/// [`TickCounter`](crate::time::TickCounter) installed).
pub const DEFAULT_READ_TIMEOUT: Tick = 500;

/// Default per-byte deadline for blocking buffered writes.
pub const DEFAULT_WRITE_TIMEOUT: Tick = 100;

impl embedded_io::Error for TimedOut {
    fn kind(&self) -> ErrorKind {
        ErrorKind::TimedOut
    }
}

/// Shared line state both halves reference: local-echo enable and a count of received
/// bytes dropped against a full ring.
///
/// `const`-constructible so it can sit in a `static` next to the ring.
pub struct LineControl {
    echo: AtomicBool,
    dropped: AtomicU32,
}

impl LineControl {
    /// Echo starts disabled.
    pub const fn new() -> Self {
        LineControl {
            echo: AtomicBool::new(false),
            dropped: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn echo(&self) -> bool {
        self.echo.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_echo(&self, on: bool) {
        self.echo.store(on, Ordering::Relaxed);
    }

    /// Received bytes dropped because the ring was full.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> LineStats {
        LineStats {
            echo: self.echo(),
            dropped: self.dropped(),
        }
    }

    #[inline]
    fn note_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for LineControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the line state, cheap to log.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineStats {
    pub echo: bool,
    pub dropped: u32,
}

/// Outbound newline swap over any byte sink: `'\n'` transmits as `'\r'` and `'\r'` as
/// `'\n'`, matching the line discipline of the attached terminal.
pub struct SerialWriter<W> {
    inner: W,
}

impl<W: Write> SerialWriter<W> {
    pub const fn new(inner: W) -> Self {
        SerialWriter { inner }
    }

    pub fn write_byte(&mut self, byte: u8) -> Result<(), W::Error> {
        self.inner.write_all(&[map_out(byte)])
    }

    /// Get the wrapped sink back.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

fn map_out(byte: u8) -> u8 {
    match byte {
        b'\r' => b'\n',
        b'\n' => b'\r',
        other => other,
    }
}

fn map_in(byte: u8) -> u8 {
    if byte == b'\r' { b'\n' } else { byte }
}

impl<W: Write> ErrorType for SerialWriter<W> {
    type Error = W::Error;
}

impl<W: Write> Write for SerialWriter<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut n = 0;
        for &byte in buf {
            match self.inner.write(&[map_out(byte)]) {
                Ok(0) => break,
                Ok(_) => n += 1,
                Err(e) if n == 0 => return Err(e),
                Err(_) => break,
            }
        }
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.inner.flush()
    }
}

/// Receive-interrupt half: echoes when enabled, then feeds the ring.
///
/// [`on_byte`](Self::on_byte) is non-blocking throughout and is the only part of the
/// serial layer meant to run in interrupt context.
pub struct SerialRx<'a, W, const N: usize, C = NoTime, I = Spin> {
    producer: Producer<'a, N, C, I>,
    ctl: &'a LineControl,
    echo_tx: SerialWriter<W>,
}

impl<'a, W: Write, const N: usize, C, I> SerialRx<'a, W, N, C, I> {
    /// `tx` is the raw transmit sink used for echo; the newline swap is applied to it.
    pub fn new(producer: Producer<'a, N, C, I>, ctl: &'a LineControl, tx: W) -> Self {
        SerialRx {
            producer,
            ctl,
            echo_tx: SerialWriter::new(tx),
        }
    }

    /// Feed one received byte: echo it back when enabled, then enqueue the raw byte.
    /// A full ring drops the byte and counts the loss.
    pub fn on_byte(&mut self, byte: u8) {
        if self.ctl.echo() {
            let _ = self.echo_tx.write_byte(byte);
        }
        if !self.producer.try_write(byte) {
            self.ctl.note_drop();
        }
    }
}

/// Mainline read half: blocking reads with a per-reader deadline and carriage returns
/// folded to newlines.
pub struct SerialReader<'a, const N: usize, C = NoTime, I = Spin> {
    consumer: Consumer<'a, N, C, I>,
    ctl: &'a LineControl,
    timeout: Tick,
}

impl<'a, const N: usize, C, I> SerialReader<'a, N, C, I> {
    /// Reads block for up to [`DEFAULT_READ_TIMEOUT`] ticks.
    pub fn new(consumer: Consumer<'a, N, C, I>, ctl: &'a LineControl) -> Self {
        Self::with_timeout(consumer, ctl, DEFAULT_READ_TIMEOUT)
    }

    pub fn with_timeout(
        consumer: Consumer<'a, N, C, I>,
        ctl: &'a LineControl,
        timeout: Tick,
    ) -> Self {
        SerialReader {
            consumer,
            ctl,
            timeout,
        }
    }

    /// Change the per-read deadline. `0` waits forever.
    pub fn set_timeout(&mut self, timeout: Tick) {
        self.timeout = timeout;
    }

    pub fn set_echo(&self, on: bool) {
        self.ctl.set_echo(on);
    }

    /// Received bytes dropped by the interrupt half so far.
    pub fn dropped(&self) -> u32 {
        self.ctl.dropped()
    }

    /// Bytes currently buffered.
    pub fn available(&self) -> usize {
        self.consumer.available()
    }
}

impl<'a, const N: usize, C: TickSource, I: IdleHook> SerialReader<'a, N, C, I> {
    /// Next byte, `'\r'` folded to `'\n'`. Blocks up to the configured deadline.
    pub fn read_char(&mut self) -> Result<u8, TimedOut> {
        let byte = self.consumer.read(self.timeout)?;
        Ok(map_in(byte))
    }
}

impl<'a, const N: usize, C, I> ErrorType for SerialReader<'a, N, C, I> {
    type Error = TimedOut;
}

impl<'a, const N: usize, C: TickSource, I: IdleHook> Read for SerialReader<'a, N, C, I> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        buf[0] = self.read_char()?;
        let mut n = 1;
        while n < buf.len() {
            match self.consumer.try_read() {
                Some(byte) => {
                    buf[n] = map_in(byte);
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

/// A [`Producer`] as a byte sink, for a buffered transmit direction that an interrupt
/// or a drain loop empties from the other side.
pub struct RingWriter<'a, const N: usize, C = NoTime, I = Spin> {
    producer: Producer<'a, N, C, I>,
    timeout: Tick,
}

impl<'a, const N: usize, C, I> RingWriter<'a, N, C, I> {
    /// Writes block for up to [`DEFAULT_WRITE_TIMEOUT`] ticks for the first byte.
    pub fn new(producer: Producer<'a, N, C, I>) -> Self {
        Self::with_timeout(producer, DEFAULT_WRITE_TIMEOUT)
    }

    pub fn with_timeout(producer: Producer<'a, N, C, I>, timeout: Tick) -> Self {
        RingWriter { producer, timeout }
    }

    /// Change the first-byte deadline. `0` waits forever.
    pub fn set_timeout(&mut self, timeout: Tick) {
        self.timeout = timeout;
    }
}

impl<'a, const N: usize, C, I> ErrorType for RingWriter<'a, N, C, I> {
    type Error = TimedOut;
}

impl<'a, const N: usize, C: TickSource, I: IdleHook> Write for RingWriter<'a, N, C, I> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.producer.write(buf[0], self.timeout)?;
        let mut n = 1;
        while n < buf.len() && self.producer.try_write(buf[n]) {
            n += 1;
        }
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        // Draining is the other side's job; nothing to push from here.
        Ok(())
    }
}
