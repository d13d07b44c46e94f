//! Lock-free SPSC byte ring for the capture hot path.
//!
//! Transport between the driver's notification context (producer) and the
//! audio thread (consumer). Storage is a power of two with one byte reserved
//! to distinguish full from empty, so `write_space + read_space` is always
//! `capacity - 1`. The write cursor is owned by the producer and the read
//! cursor by the consumer; each is published with a release store and
//! observed by the other side with an acquire load, so a fully-written region
//! is visible before the advanced cursor is.
//!
//! Safety: this is SPSC only. One thread calls the write-side methods, one
//! thread calls the read-side methods. The session layer enforces this by
//! handing out exactly one producer sink per ring.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct ByteRing {
    buf: UnsafeCell<Box<[u8]>>,
    mask: usize,
    /// Write position, producer-owned.
    write_idx: AtomicUsize,
    /// Read position, consumer-owned.
    read_idx: AtomicUsize,
}

// SAFETY: cursor ownership is split between the two sides. The producer only
// stores `write_idx`, the consumer only stores `read_idx`, and payload bytes
// are published before the release store that makes them reachable.
unsafe impl Send for ByteRing {}
unsafe impl Sync for ByteRing {}

impl ByteRing {
    /// `capacity` is rounded up to a power of two; usable space is one byte
    /// less than the rounded capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = capacity.next_power_of_two().max(2);
        Self {
            buf: UnsafeCell::new(vec![0u8; cap].into_boxed_slice()),
            mask: cap - 1,
            write_idx: AtomicUsize::new(0),
            read_idx: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Bytes the producer may write without overtaking the reader.
    ///
    /// Producer-side call. The value may be stale by the time it is acted on,
    /// but it only grows concurrently (the consumer frees space), so acting
    /// on it never overcommits.
    #[inline]
    pub fn write_space(&self) -> usize {
        let w = self.write_idx.load(Ordering::Relaxed);
        let r = self.read_idx.load(Ordering::Acquire);
        r.wrapping_sub(w).wrapping_sub(1) & self.mask
    }

    /// Bytes available to the consumer. Consumer-side call; only grows
    /// concurrently (the producer publishes more).
    #[inline]
    pub fn read_space(&self) -> usize {
        let w = self.write_idx.load(Ordering::Acquire);
        let r = self.read_idx.load(Ordering::Relaxed);
        w.wrapping_sub(r) & self.mask
    }

    /// Copy `src` in at the write cursor, wrapping at capacity.
    ///
    /// Producer-side call. Returns `false`, writing nothing, when `src`
    /// exceeds the current write space. Never blocks, never allocates.
    #[inline]
    pub fn write(&self, src: &[u8]) -> bool {
        self.write_split(src, &[])
    }

    /// Gather-write `a` then `b` as one logical write: both regions are
    /// copied before the single cursor advance, so the consumer can never
    /// observe `a` without `b`.
    ///
    /// Producer-side call. Returns `false`, writing nothing, when the
    /// combined length exceeds the current write space.
    pub fn write_split(&self, a: &[u8], b: &[u8]) -> bool {
        let n = a.len() + b.len();
        if n > self.write_space() {
            return false;
        }
        let w = self.write_idx.load(Ordering::Relaxed);
        // SAFETY: single producer, and [w, w + n) is outside the region the
        // consumer may touch until the release store below.
        unsafe {
            self.copy_in(w, a);
            self.copy_in((w + a.len()) & self.mask, b);
        }
        self.write_idx.store((w + n) & self.mask, Ordering::Release);
        true
    }

    /// Copy out up to `dst.len()` bytes from the read cursor, wrapping, and
    /// advance past them. Returns the number of bytes copied.
    ///
    /// Consumer-side call. A caller expecting a full read must treat a short
    /// return as a framing error: the stream is desynchronized.
    pub fn read(&self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.read_space());
        let r = self.read_idx.load(Ordering::Relaxed);
        // SAFETY: single consumer, and [r, r + n) was published by the
        // producer's release store observed in read_space above.
        unsafe {
            self.copy_out(r, &mut dst[..n]);
        }
        self.read_idx.store((r + n) & self.mask, Ordering::Release);
        n
    }

    /// The unread region as up to two contiguous spans; the second is
    /// non-empty only when the region wraps past the end of storage.
    ///
    /// Consumer-side call. Needed because a fixed-size header may straddle
    /// the wrap boundary and must be reassembled from both spans.
    pub fn read_vector(&self) -> (&[u8], &[u8]) {
        let n = self.read_space();
        let r = self.read_idx.load(Ordering::Relaxed);
        // SAFETY: the producer never writes inside the unread region, and
        // the bytes in it were published before write_idx advanced.
        let buf = unsafe { &*self.buf.get() };
        let first = n.min(buf.len() - r);
        (&buf[r..r + first], &buf[..n - first])
    }

    /// Advance the read cursor by `n` without copying, discarding `n` bytes.
    ///
    /// Consumer-side call; `n` must not exceed `read_space()`. Used to skip
    /// a payload that failed validation while keeping the stream framed for
    /// the next header.
    pub fn advance_read(&self, n: usize) {
        debug_assert!(n <= self.read_space());
        let r = self.read_idx.load(Ordering::Relaxed);
        self.read_idx.store((r + n) & self.mask, Ordering::Release);
    }

    /// SAFETY: caller must be the sole producer and `[at, at + src.len())`
    /// (mod capacity) must lie in the writable region.
    unsafe fn copy_in(&self, at: usize, src: &[u8]) {
        let buf = &mut *self.buf.get();
        let first = src.len().min(buf.len() - at);
        buf[at..at + first].copy_from_slice(&src[..first]);
        buf[..src.len() - first].copy_from_slice(&src[first..]);
    }

    /// SAFETY: caller must be the sole consumer and `[at, at + dst.len())`
    /// (mod capacity) must lie in the published region.
    unsafe fn copy_out(&self, at: usize, dst: &mut [u8]) {
        let buf = &*self.buf.get();
        let total = dst.len();
        let first = total.min(buf.len() - at);
        dst[..first].copy_from_slice(&buf[at..at + first]);
        dst[first..].copy_from_slice(&buf[..total - first]);
    }
}
