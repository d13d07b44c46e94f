//! Short-message classification and system-exclusive framing checks.

/// Status byte opening a system-exclusive message.
pub const SYSEX_START: u8 = 0xF0;

/// Status byte terminating a system-exclusive message.
pub const SYSEX_END: u8 = 0xF7;

/// Expected wire length, status byte included, of the MIDI message opened by
/// `status`.
///
/// Returns `None` for data bytes, system-exclusive (variable length, handled
/// by the long-message path) and undefined status bytes; such deliveries are
/// discarded by the capture path rather than enqueued.
#[inline]
pub fn message_length(status: u8) -> Option<usize> {
    match status {
        // Note off/on, poly pressure, control change
        0x80..=0xBF => Some(3),
        // Program change, channel pressure
        0xC0..=0xDF => Some(2),
        // Pitch bend
        0xE0..=0xEF => Some(3),
        // MTC quarter frame, song select
        0xF1 | 0xF3 => Some(2),
        // Song position pointer
        0xF2 => Some(3),
        // Tune request and system real-time
        0xF6 | 0xF8..=0xFF => Some(1),
        // Data byte, sysex start/end, or undefined (0xF4, 0xF5)
        _ => None,
    }
}

/// Whether `bytes` is one complete system-exclusive message: nonzero length,
/// opened by [`SYSEX_START`] and terminated by [`SYSEX_END`].
#[inline]
pub fn is_well_framed_sysex(bytes: &[u8]) -> bool {
    bytes.first() == Some(&SYSEX_START) && bytes.last() == Some(&SYSEX_END) && bytes.len() >= 2
}
