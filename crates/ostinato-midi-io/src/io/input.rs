//! midir-backed implementation of the driver collaborator.
//!
//! midir delivers every message, short or long, as one completed byte slice
//! from its own callback thread, so the dispatch here is a thin split on the
//! leading status byte. midir also manages its own system-exclusive
//! buffers internally; the re-arm capability handed to the sink is a no-op
//! on this backend.

use midir::{Ignore, MidiInput, MidiInputConnection, MidiInputPort};
use serde::{Deserialize, Serialize};
use tracing::debug;

use ostinato_midi::SYSEX_START;

use crate::error::{Error, Result};
use crate::session::CaptureSink;
use crate::MidiDriver;

/// One enumerable MIDI input device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidiInputDevice {
    pub index: usize,
    pub name: String,
}

/// Driver collaborator backed by midir.
pub struct MidirDriver {
    client_name: String,
}

impl MidirDriver {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }

    /// Enumerate the MIDI input devices currently visible to midir.
    pub fn list_devices() -> Vec<MidiInputDevice> {
        let mut devices = Vec::new();
        if let Ok(input) = MidiInput::new("ostinato-device-list") {
            for (index, port) in input.ports().iter().enumerate() {
                let name = input
                    .port_name(port)
                    .unwrap_or_else(|_| format!("Unknown Device {}", index));
                devices.push(MidiInputDevice { index, name });
            }
        }
        devices
    }
}

impl Default for MidirDriver {
    fn default() -> Self {
        Self::new("ostinato-midi-input")
    }
}

enum HandleState {
    Idle {
        input: MidiInput,
        sink: CaptureSink,
    },
    Running {
        connection: MidiInputConnection<CaptureSink>,
    },
}

/// One opened midir input device.
pub struct MidirHandle {
    port: MidiInputPort,
    port_name: String,
    state: Option<HandleState>,
}

fn dispatch_message(driver_timestamp: u64, bytes: &[u8], sink: &mut CaptureSink) {
    if bytes.first() == Some(&SYSEX_START) {
        // midir resubmits its own sysex buffers; nothing to re-arm here.
        let mut rearm = || {};
        sink.on_long_message(bytes, driver_timestamp, &mut rearm);
    } else {
        sink.on_short_message(bytes, driver_timestamp);
    }
}

impl MidiDriver for MidirDriver {
    type Handle = MidirHandle;

    fn open(&mut self, index: usize, sink: CaptureSink) -> Result<MidirHandle> {
        let mut input = MidiInput::new(&self.client_name)?;
        // Deliver everything, sysex and real-time included.
        input.ignore(Ignore::None);

        let ports = input.ports();
        let port = ports
            .get(index)
            .ok_or(Error::DeviceNotFound(index))?
            .clone();
        let port_name = input
            .port_name(&port)
            .unwrap_or_else(|_| format!("Device {}", index));
        debug!(device = %port_name, index, "opened midir input port");

        Ok(MidirHandle {
            port,
            port_name,
            state: Some(HandleState::Idle { input, sink }),
        })
    }

    fn device_name(&mut self, handle: &MidirHandle) -> String {
        handle.port_name.clone()
    }

    fn arm_sysex(&mut self, _handle: &mut MidirHandle) -> Result<()> {
        // midir owns its sysex buffering; there is no driver buffer to submit.
        Ok(())
    }

    fn start(&mut self, handle: &mut MidirHandle) -> Result<()> {
        match handle.state.take() {
            Some(HandleState::Idle { input, sink }) => {
                // On failure midir keeps the sink, so the device must be
                // reopened; the caller sees a Driver error either way.
                let connection = input
                    .connect(&handle.port, &handle.port_name, dispatch_message, sink)
                    .map_err(Error::from)?;
                handle.state = Some(HandleState::Running { connection });
                Ok(())
            }
            Some(running @ HandleState::Running { .. }) => {
                handle.state = Some(running);
                Ok(())
            }
            None => Err(Error::InvalidState("midir input lost by failed start")),
        }
    }

    fn stop(&mut self, handle: &mut MidirHandle) -> Result<()> {
        match handle.state.take() {
            Some(HandleState::Running { connection }) => {
                let (input, sink) = connection.close();
                handle.state = Some(HandleState::Idle { input, sink });
                Ok(())
            }
            other => {
                handle.state = other;
                Ok(())
            }
        }
    }

    fn close(&mut self, handle: MidirHandle) -> Result<()> {
        // Dropping the connection (or idle client) ends all deliveries; the
        // sink is dropped with it, so no producer call can outlive this.
        if let Some(HandleState::Running { connection }) = handle.state {
            let (_input, _sink) = connection.close();
        }
        Ok(())
    }
}
