//! Error types for the MIDI capture subsystem.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("MIDI driver error: {0}")]
    Driver(String),

    #[error("MIDI input device {0} not found")]
    DeviceNotFound(usize),

    /// The ring read back fewer bytes than the event header promised. The
    /// stream is desynchronized; the session must be recreated, not retried.
    #[error("capture stream desynchronized: {0}")]
    Framing(&'static str),

    #[error("invalid session state: {0}")]
    InvalidState(&'static str),
}

#[cfg(feature = "midi-io")]
impl From<midir::InitError> for Error {
    fn from(e: midir::InitError) -> Self {
        Error::Driver(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::ConnectError<midir::MidiInput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiInput>) -> Self {
        Error::Driver(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
