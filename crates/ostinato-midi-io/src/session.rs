//! Input device capture session.
//!
//! One session couples a driver-owned producer context to the audio thread.
//! The driver's notification callback pushes events through a [`CaptureSink`]
//! into an SPSC byte ring; once per processing cycle the audio thread drains
//! the events whose timestamps fall inside that cycle's window with
//! [`InputDeviceSession::dequeue_in_window`].
//!
//! The producer path never blocks, never allocates, and never takes a lock:
//! overflow is the backpressure mechanism, and every transient condition
//! (overflow, malformed message, oversize event, lateness) is absorbed into
//! counters rather than surfaced as a failure.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use ostinato_midi::{is_well_framed_sysex, message_length, CapturedEvent, EventHeader, HEADER_SIZE};

use crate::clock::CaptureClock;
use crate::driver::{MidiDriver, ScopedHandle};
use crate::error::{Error, Result};
use crate::ring::ByteRing;
use crate::sysex::SysexSlot;

/// Default event ring capacity in bytes.
pub const DEFAULT_RING_CAPACITY: usize = 32 * 1024;

/// Default system-exclusive slot capacity in bytes.
pub const DEFAULT_SYSEX_CAPACITY: usize = 32 * 1024;

/// Buffer capacities for one capture session.
#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    /// Event ring capacity in bytes; rounded up to a power of two.
    pub ring_capacity: usize,
    /// System-exclusive staging slot capacity in bytes.
    pub sysex_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ring_capacity: DEFAULT_RING_CAPACITY,
            sysex_capacity: DEFAULT_SYSEX_CAPACITY,
        }
    }
}

/// Session lifecycle. `Closed` is only reached once the driver has confirmed
/// the handle release; ring and slot storage outlive every producer call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Created = 0,
    Opened = 1,
    Started = 2,
    Stopped = 3,
    Closed = 4,
}

impl SessionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => SessionState::Created,
            1 => SessionState::Opened,
            2 => SessionState::Started,
            3 => SessionState::Stopped,
            _ => SessionState::Closed,
        }
    }
}

/// Producer-side outcome of one enqueue attempt. `Overflow` and
/// `InvalidSize` drop the event and leave the ring untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Enqueue {
    Queued,
    Overflow,
    InvalidSize,
}

/// Consumer-side outcome of one windowed dequeue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dequeued<'a> {
    /// The next event's timestamp falls before `window_end`; its payload has
    /// been copied into the caller's buffer.
    Event(CapturedEvent<'a>),
    /// Nothing queued for this cycle. The read cursor is untouched, so an
    /// event belonging to a future window stays queued.
    Empty,
    /// The next event exceeded the caller's buffer and was skipped; the
    /// stream stays framed because the skip advanced past exactly `len`
    /// payload bytes.
    Oversize { timestamp: u64, len: usize },
}

#[derive(Default)]
struct Counters {
    enqueued: AtomicU64,
    overflow_dropped: AtomicU64,
    malformed_dropped: AtomicU64,
    sysex_discarded: AtomicU64,
    oversize_skipped: AtomicU64,
    late_events: AtomicU64,
    driver_errors: AtomicU64,
    ignored_while_stopped: AtomicU64,
}

/// Snapshot of one session's counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureStats {
    /// Events written to the ring.
    pub enqueued: u64,
    /// Events dropped because the ring had no space.
    pub overflow_dropped: u64,
    /// Short messages discarded before enqueue (unknown status, truncated,
    /// or zero length).
    pub malformed_dropped: u64,
    /// Long messages discarded before enqueue (bad framing, empty, or
    /// oversize deliveries).
    pub sysex_discarded: u64,
    /// Events skipped at dequeue because they exceeded the caller's buffer.
    pub oversize_skipped: u64,
    /// Events delivered after the window they were aimed at.
    pub late_events: u64,
    /// Invalid deliveries reported by the driver itself.
    pub driver_errors: u64,
    /// Deliveries that arrived while the session was not started.
    pub ignored_while_stopped: u64,
}

struct Shared {
    ring: ByteRing,
    clock: CaptureClock,
    state: AtomicU8,
    counters: Counters,
}

/// Producer half of a session, moved into the driver's notification context.
///
/// Exactly one sink exists per session, and the ring's write side is only
/// touched through it, which is what makes the SPSC ring sound. Methods
/// never block, never allocate, and never take a lock; they are safe to call
/// from a real-time driver callback.
pub struct CaptureSink {
    shared: Arc<Shared>,
    sysex: SysexSlot,
}

impl CaptureSink {
    #[inline]
    fn started(&self) -> bool {
        self.shared.state.load(Ordering::Acquire) == SessionState::Started as u8
    }

    /// Stamp `payload` with the capture clock and queue it as one event.
    ///
    /// The header and payload are published as a single gather write, so the
    /// consumer never observes a header without its payload.
    pub fn enqueue(&mut self, payload: &[u8]) -> Enqueue {
        Self::enqueue_to(&self.shared, payload)
    }

    fn enqueue_to(shared: &Shared, payload: &[u8]) -> Enqueue {
        if payload.is_empty() {
            shared.counters.malformed_dropped.fetch_add(1, Ordering::Relaxed);
            debug!("rejected zero-length midi event");
            return Enqueue::InvalidSize;
        }
        let header = EventHeader::new(shared.clock.now_micros(), payload.len() as u32);
        if !shared.ring.write_split(&header.encode(), payload) {
            shared.counters.overflow_dropped.fetch_add(1, Ordering::Relaxed);
            debug!(len = payload.len(), "capture ring overflow, event dropped");
            return Enqueue::Overflow;
        }
        shared.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        trace!(
            timestamp = header.timestamp,
            len = payload.len(),
            "queued midi event"
        );
        Enqueue::Queued
    }

    /// Driver delivery of one short message (status plus data bytes).
    ///
    /// The expected length comes from the status byte; `bytes` beyond it are
    /// ignored (drivers commonly deliver a fixed-width word). Unclassifiable
    /// or truncated deliveries are discarded, never enqueued. The
    /// driver-local timestamp is ignored in favor of the capture clock.
    pub fn on_short_message(&mut self, bytes: &[u8], driver_timestamp: u64) {
        let _ = driver_timestamp;
        if !self.started() {
            self.shared
                .counters
                .ignored_while_stopped
                .fetch_add(1, Ordering::Relaxed);
            return;
        }
        let status = match bytes.first() {
            Some(&status) => status,
            None => {
                self.shared
                    .counters
                    .malformed_dropped
                    .fetch_add(1, Ordering::Relaxed);
                debug!("driver delivered an empty short message");
                return;
            }
        };
        let len = match message_length(status) {
            Some(len) => len,
            None => {
                self.shared
                    .counters
                    .malformed_dropped
                    .fetch_add(1, Ordering::Relaxed);
                debug!(status, "driver delivered an invalid midi message");
                return;
            }
        };
        if bytes.len() < len {
            self.shared
                .counters
                .malformed_dropped
                .fetch_add(1, Ordering::Relaxed);
            debug!(status, got = bytes.len(), expected = len, "truncated midi message");
            return;
        }
        Self::enqueue_to(&self.shared, &bytes[..len]);
    }

    /// Driver delivery of one completed long (system-exclusive) buffer.
    ///
    /// The message is staged in the fixed slot, validated (`0xF0 … 0xF7`,
    /// nonzero length) and enqueued; malformed buffers are discarded. On
    /// both paths the slot is re-armed and `rearm` invoked, unconditionally,
    /// so capture of the next system-exclusive message is never missed.
    pub fn on_long_message(
        &mut self,
        bytes: &[u8],
        driver_timestamp: u64,
        rearm: &mut dyn FnMut(),
    ) {
        let _ = driver_timestamp;
        if self.started() {
            match self.sysex.stage(bytes) {
                Some(msg) if is_well_framed_sysex(msg) => {
                    Self::enqueue_to(&self.shared, msg);
                }
                Some(msg) => {
                    self.shared
                        .counters
                        .sysex_discarded
                        .fetch_add(1, Ordering::Relaxed);
                    debug!(len = msg.len(), "discarding unframed sysex chunk");
                }
                None => {
                    self.shared
                        .counters
                        .sysex_discarded
                        .fetch_add(1, Ordering::Relaxed);
                }
            }
        } else {
            self.shared
                .counters
                .ignored_while_stopped
                .fetch_add(1, Ordering::Relaxed);
        }
        self.sysex.rearm();
        rearm();
    }

    /// Driver-reported invalid short message (delivered, but unusable).
    pub fn on_invalid_message(&mut self) {
        self.shared.counters.driver_errors.fetch_add(1, Ordering::Relaxed);
        warn!("driver sent an invalid midi message");
    }

    /// Driver-reported invalid or incomplete system-exclusive delivery.
    pub fn on_invalid_sysex(&mut self) {
        self.shared.counters.driver_errors.fetch_add(1, Ordering::Relaxed);
        warn!("driver sent an invalid or incomplete sysex message");
    }
}

/// One MIDI input device: a driver handle, the event ring, and the capture
/// clock. Owned by the audio side; the producer half lives inside the
/// driver's callback context as a [`CaptureSink`].
pub struct InputDeviceSession<D: MidiDriver> {
    shared: Arc<Shared>,
    driver: D,
    handle: Option<D::Handle>,
    name: String,
}

impl<D: MidiDriver> InputDeviceSession<D> {
    /// Open device `index`, register the delivery sink, and arm the
    /// system-exclusive buffer.
    ///
    /// The driver handle is closed again on every failure path past `open`,
    /// so a failed construction never leaks a device.
    pub fn open(mut driver: D, index: usize, config: SessionConfig) -> Result<Self> {
        let shared = Arc::new(Shared {
            ring: ByteRing::with_capacity(config.ring_capacity),
            clock: CaptureClock::new(),
            state: AtomicU8::new(SessionState::Created as u8),
            counters: Counters::default(),
        });
        let sink = CaptureSink {
            shared: Arc::clone(&shared),
            sysex: SysexSlot::new(config.sysex_capacity),
        };

        let handle = driver.open(index, sink)?;
        let (name, handle) = {
            let mut guard = ScopedHandle::new(&mut driver, handle);
            guard.arm_sysex()?;
            let name = guard.device_name();
            (name, guard.release())
        };

        shared
            .state
            .store(SessionState::Opened as u8, Ordering::Release);
        debug!(device = %name, "opened midi input device");
        Ok(Self {
            shared,
            driver,
            handle: Some(handle),
            name,
        })
    }

    /// Device name from the driver's capability query. Fixed after open.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// The clock used to stamp enqueued events. The audio engine converts
    /// each cycle's sample range into this time base to build windows.
    #[inline]
    pub fn clock(&self) -> CaptureClock {
        self.shared.clock
    }

    pub fn stats(&self) -> CaptureStats {
        let c = &self.shared.counters;
        CaptureStats {
            enqueued: c.enqueued.load(Ordering::Relaxed),
            overflow_dropped: c.overflow_dropped.load(Ordering::Relaxed),
            malformed_dropped: c.malformed_dropped.load(Ordering::Relaxed),
            sysex_discarded: c.sysex_discarded.load(Ordering::Relaxed),
            oversize_skipped: c.oversize_skipped.load(Ordering::Relaxed),
            late_events: c.late_events.load(Ordering::Relaxed),
            driver_errors: c.driver_errors.load(Ordering::Relaxed),
            ignored_while_stopped: c.ignored_while_stopped.load(Ordering::Relaxed),
        }
    }

    /// Begin capture. Idempotent while already started.
    pub fn start(&mut self) -> Result<()> {
        match self.state() {
            SessionState::Started => return Ok(()),
            SessionState::Opened | SessionState::Stopped => {}
            SessionState::Created => return Err(Error::InvalidState("session never opened")),
            SessionState::Closed => return Err(Error::InvalidState("session closed")),
        }
        let handle = self
            .handle
            .as_mut()
            .ok_or(Error::InvalidState("driver handle released"))?;
        self.driver.start(handle)?;
        self.shared
            .state
            .store(SessionState::Started as u8, Ordering::Release);
        debug!(device = %self.name, "midi input started");
        Ok(())
    }

    /// Stop capture. Safe to call while the producer may still be
    /// mid-callback: the state flips first, so deliveries racing the driver
    /// stop are counted and dropped instead of queued.
    pub fn stop(&mut self) -> Result<()> {
        if self.state() != SessionState::Started {
            return Ok(());
        }
        self.shared
            .state
            .store(SessionState::Stopped as u8, Ordering::Release);
        let handle = self
            .handle
            .as_mut()
            .ok_or(Error::InvalidState("driver handle released"))?;
        self.driver.stop(handle)?;
        debug!(device = %self.name, "midi input stopped");
        Ok(())
    }

    /// Stop if needed and release the driver handle. Buffered events still
    /// in the ring are discarded once the driver confirms the close; no
    /// buffered data crosses the close boundary.
    pub fn close(&mut self) -> Result<()> {
        let mut handle = match self.handle.take() {
            Some(handle) => handle,
            None => return Ok(()),
        };
        if self.state() == SessionState::Started {
            self.shared
                .state
                .store(SessionState::Stopped as u8, Ordering::Release);
            // Keep going: the handle must be released even if stop failed.
            if let Err(e) = self.driver.stop(&mut handle) {
                warn!(device = %self.name, error = %e, "midi input stop failed during close");
            }
        }
        self.driver.close(handle)?;
        self.shared
            .state
            .store(SessionState::Closed as u8, Ordering::Release);
        self.shared.ring.advance_read(self.shared.ring.read_space());
        debug!(device = %self.name, "closed midi input device");
        Ok(())
    }

    /// Pop the next queued event whose timestamp falls before `window_end`.
    ///
    /// Called once per processing cycle by the audio thread, with
    /// `[window_start, window_end)` being the cycle's range on the session
    /// [`clock`](Self::clock). An event stamped at or after `window_end`
    /// belongs to a later cycle and stays queued. An event stamped before
    /// `window_start` missed its cycle (scheduling jitter); it is still
    /// delivered now rather than dropped, and the lateness is recorded.
    ///
    /// `Err(Framing)` means the ring held fewer payload bytes than the
    /// header promised; the session is desynchronized and must be recreated.
    pub fn dequeue_in_window<'a>(
        &mut self,
        window_start: u64,
        window_end: u64,
        out: &'a mut [u8],
    ) -> Result<Dequeued<'a>> {
        let ring = &self.shared.ring;
        if ring.read_space() <= HEADER_SIZE {
            return Ok(Dequeued::Empty);
        }

        // Peek without consuming; the header may straddle the wrap boundary.
        let (a, b) = ring.read_vector();
        let header = match EventHeader::decode_split(a, b) {
            Some(header) => header,
            None => return Ok(Dequeued::Empty),
        };

        if header.timestamp >= window_end {
            trace!(
                early_us = header.timestamp - window_end,
                "midi event ahead of cycle window"
            );
            return Ok(Dequeued::Empty);
        }
        if header.timestamp < window_start {
            self.shared.counters.late_events.fetch_add(1, Ordering::Relaxed);
            trace!(
                late_us = window_start - header.timestamp,
                "late midi event delivered in current cycle"
            );
        }

        ring.advance_read(HEADER_SIZE);

        let len = header.size as usize;
        if len == 0 || len > ring.read_space() {
            warn!(len, available = ring.read_space(), "garbled midi event header");
            return Err(Error::Framing("event larger than buffered data"));
        }
        if len > out.len() {
            self.shared
                .counters
                .oversize_skipped
                .fetch_add(1, Ordering::Relaxed);
            debug!(len, capacity = out.len(), "midi event too large, skipped");
            ring.advance_read(len);
            return Ok(Dequeued::Oversize {
                timestamp: header.timestamp,
                len,
            });
        }
        let copied = ring.read(&mut out[..len]);
        if copied != len {
            warn!(expected = len, got = copied, "garbled midi event data");
            return Err(Error::Framing("garbled event payload"));
        }
        Ok(Dequeued::Event(CapturedEvent::new(
            header.timestamp,
            &out[..len],
        )))
    }
}

impl<D: MidiDriver> Drop for InputDeviceSession<D> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(device = %self.name, error = %e, "failed to close midi input device");
        }
    }
}
