//! Pure MIDI capture types for the Ostinato audio engine.
//!
//! No I/O lives here: this crate defines the fixed framing imposed on the
//! capture ring's byte stream (`EventHeader`), classification of short MIDI
//! messages by status byte, and the borrowed view of a dequeued event.

pub mod header;
pub use header::{EventHeader, HEADER_SIZE};

pub mod message;
pub use message::{is_well_framed_sysex, message_length, SYSEX_END, SYSEX_START};

pub mod event;
pub use event::CapturedEvent;
