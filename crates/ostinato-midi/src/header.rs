//! Queued-event header framing.
//!
//! Every event in the capture ring is a fixed 12-byte header followed
//! immediately by `size` bytes of raw MIDI payload. The header is the only
//! framing the otherwise untyped byte stream has, so the codec is fixed-width
//! and byte-for-byte reversible.

use serde::{Deserialize, Serialize};

/// Size in bytes of an encoded [`EventHeader`].
pub const HEADER_SIZE: usize = 12;

/// Header prefixed to every queued MIDI event.
///
/// `timestamp` is monotonic microseconds assigned at enqueue time. `size` is
/// the payload byte count and is never zero in a queued header; a zero-size
/// event is rejected on the producer side before anything is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHeader {
    pub timestamp: u64,
    pub size: u32,
}

impl EventHeader {
    #[inline]
    pub fn new(timestamp: u64, size: u32) -> Self {
        Self { timestamp, size }
    }

    /// Encode as little-endian bytes: 8 timestamp bytes, then 4 size bytes.
    #[inline]
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[..8].copy_from_slice(&self.timestamp.to_le_bytes());
        buf[8..].copy_from_slice(&self.size.to_le_bytes());
        buf
    }

    /// Decode the layout produced by [`encode`](Self::encode).
    #[inline]
    pub fn decode(buf: [u8; HEADER_SIZE]) -> Self {
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&buf[..8]);
        let mut size = [0u8; 4];
        size.copy_from_slice(&buf[8..]);
        Self {
            timestamp: u64::from_le_bytes(ts),
            size: u32::from_le_bytes(size),
        }
    }

    /// Decode a header split across two spans, as handed out by a wrapped
    /// ring read: the leading bytes come from `a`, the remainder from `b`.
    ///
    /// Returns `None` when the spans hold fewer than [`HEADER_SIZE`] bytes
    /// combined. The decoded value must not depend on where the split falls.
    pub fn decode_split(a: &[u8], b: &[u8]) -> Option<Self> {
        if a.len() >= HEADER_SIZE {
            let mut raw = [0u8; HEADER_SIZE];
            raw.copy_from_slice(&a[..HEADER_SIZE]);
            return Some(Self::decode(raw));
        }
        if a.len() + b.len() < HEADER_SIZE {
            return None;
        }
        let mut raw = [0u8; HEADER_SIZE];
        raw[..a.len()].copy_from_slice(a);
        raw[a.len()..].copy_from_slice(&b[..HEADER_SIZE - a.len()]);
        Some(Self::decode(raw))
    }

    /// Total queued footprint: header plus payload.
    #[inline]
    pub fn total_len(&self) -> usize {
        HEADER_SIZE + self.size as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_round_trip() {
        let header = EventHeader::new(1_234_567_890_123, 3);
        let decoded = EventHeader::decode(header.encode());
        assert_eq!(decoded, header);
        assert_eq!(decoded.total_len(), HEADER_SIZE + 3);
    }

    #[test]
    fn test_extreme_values_round_trip() {
        for header in [
            EventHeader::new(0, 1),
            EventHeader::new(u64::MAX, u32::MAX),
            EventHeader::new(1, 32 * 1024),
        ] {
            assert_eq!(EventHeader::decode(header.encode()), header);
        }
    }

    /// The split position must not affect the decoded value.
    #[test]
    fn test_decode_split_position_independent() {
        let header = EventHeader::new(0xDEAD_BEEF_0042, 7);
        let raw = header.encode();
        for split in 0..=HEADER_SIZE {
            let decoded = EventHeader::decode_split(&raw[..split], &raw[split..]);
            assert_eq!(decoded, Some(header), "split at {split}");
        }
    }

    #[test]
    fn test_decode_split_short_input() {
        let raw = EventHeader::new(1, 1).encode();
        assert_eq!(EventHeader::decode_split(&raw[..4], &raw[4..10]), None);
        assert_eq!(EventHeader::decode_split(&[], &[]), None);
    }
}
