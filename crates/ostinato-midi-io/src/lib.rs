//! MIDI capture subsystem for the Ostinato audio engine.
//!
//! The pipeline has exactly two threads of control per device: the driver's
//! notification context enqueues incoming MIDI events onto a lock-free SPSC
//! byte ring, and the audio thread drains the events belonging to each
//! processing cycle's time window. The producer path never blocks, never
//! allocates, and never takes a lock; the consumer polls once per cycle.
//!
//! Feature gates: `midi-io` (hardware capture via midir).

pub mod error;
pub use error::{Error, Result};

pub mod clock;
pub use clock::CaptureClock;

pub mod ring;
pub use ring::ByteRing;

pub mod sysex;
pub use sysex::SysexSlot;

pub mod driver;
pub use driver::MidiDriver;

pub mod session;
pub use session::{
    CaptureSink, CaptureStats, Dequeued, Enqueue, InputDeviceSession, SessionConfig, SessionState,
    DEFAULT_RING_CAPACITY, DEFAULT_SYSEX_CAPACITY,
};

#[cfg(feature = "midi-io")]
pub(crate) mod io;

#[cfg(feature = "midi-io")]
pub use io::{MidiInputDevice, MidirDriver, MidirHandle};

pub use ostinato_midi::{
    is_well_framed_sysex, message_length, CapturedEvent, EventHeader, HEADER_SIZE, SYSEX_END,
    SYSEX_START,
};
