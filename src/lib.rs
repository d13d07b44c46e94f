//! # Ostinato - Real-time MIDI capture
//!
//! Lock-free transport for incoming MIDI: a driver's notification context
//! enqueues events onto an SPSC byte ring, and the audio thread drains the
//! events belonging to each processing cycle's time window.
//!
//! ## Architecture
//!
//! Ostinato is an umbrella crate that coordinates:
//! - **ostinato-midi** - Capture framing types (event header codec, message
//!   classification, sysex framing)
//! - **ostinato-midi-io** - The pipeline itself (byte ring, capture clock,
//!   sysex slot, device sessions, hardware input)
//!
//! ## Quick Start
//!
//! ```ignore
//! use ostinato::prelude::*;
//!
//! // Open device 0 through the midir-backed driver and start capture
//! let driver = MidirDriver::default();
//! let mut session = InputDeviceSession::open(driver, 0, SessionConfig::default())?;
//! session.start()?;
//!
//! // Once per audio cycle, drain the events inside the cycle's window
//! let mut buf = [0u8; 4096];
//! while let Dequeued::Event(event) =
//!     session.dequeue_in_window(window_start, window_end, &mut buf)?
//! {
//!     engine.midi_input(event.timestamp, event.bytes);
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Hardware capture enabled
//! - `midi-io` - Hardware MIDI input via midir

/// Re-export of ostinato-midi for direct access
pub use ostinato_midi as midi;

/// Re-export of ostinato-midi-io for direct access
pub use ostinato_midi_io as midi_io;

pub use ostinato_midi_io::{
    CaptureClock, CaptureSink, CaptureStats, CapturedEvent, Dequeued, Enqueue, Error, EventHeader,
    InputDeviceSession, MidiDriver, Result, SessionConfig, SessionState, HEADER_SIZE,
};

#[cfg(feature = "midi-io")]
pub use ostinato_midi_io::{MidiInputDevice, MidirDriver};

pub mod prelude {
    pub use crate::{
        CaptureClock, CaptureSink, CaptureStats, CapturedEvent, Dequeued, Enqueue,
        InputDeviceSession, MidiDriver, SessionConfig, SessionState,
    };

    #[cfg(feature = "midi-io")]
    pub use crate::{MidiInputDevice, MidirDriver};
}
