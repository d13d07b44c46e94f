//! Hardware MIDI capture.
//!
//! Device enumeration and real-time input via midir.
//! Requires the `midi-io` feature.

mod input;

pub use input::{MidiInputDevice, MidirDriver, MidirHandle};
