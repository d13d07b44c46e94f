//! Driver collaborator seam.
//!
//! The vendor MIDI driver is an external collaborator: it owns device
//! enumeration, the notification thread, and error-string translation. This
//! crate only needs the narrow surface below. Delivery goes the other way:
//! the driver invokes the session's [`CaptureSink`] capability methods from
//! its own notification context; there is no callback base class to subclass.
//!
//! [`CaptureSink`]: crate::session::CaptureSink

use tracing::warn;

use crate::error::Result;
use crate::session::CaptureSink;

/// External MIDI driver surface consumed by a capture session.
///
/// The handle returned by [`open`](Self::open) stands for one opened input
/// device. After [`close`](Self::close) returns the driver guarantees no
/// further deliveries reach the sink, which is what lets the session release
/// its buffers.
pub trait MidiDriver {
    type Handle: Send;

    /// Open device `index` and register `sink` as the delivery target.
    /// Deliveries may not begin before [`start`](Self::start).
    fn open(&mut self, index: usize, sink: CaptureSink) -> Result<Self::Handle>;

    /// Human-readable device name from the driver's capability query.
    fn device_name(&mut self, handle: &Self::Handle) -> String;

    /// Submit the fixed system-exclusive buffer to the driver. Called once
    /// during session construction; afterwards the sink re-submits through
    /// the capability passed to each long-message delivery.
    fn arm_sysex(&mut self, handle: &mut Self::Handle) -> Result<()>;

    fn start(&mut self, handle: &mut Self::Handle) -> Result<()>;

    fn stop(&mut self, handle: &mut Self::Handle) -> Result<()>;

    /// Release the handle. On `Ok` no further producer calls are possible.
    fn close(&mut self, handle: Self::Handle) -> Result<()>;
}

/// Closes a just-opened handle on drop unless released.
///
/// Session construction performs several driver calls after `open`; if any
/// of them fails the handle must not leak, so construction closes the device
/// on its own failure paths.
pub(crate) struct ScopedHandle<'a, D: MidiDriver> {
    driver: &'a mut D,
    handle: Option<D::Handle>,
}

impl<'a, D: MidiDriver> ScopedHandle<'a, D> {
    pub(crate) fn new(driver: &'a mut D, handle: D::Handle) -> Self {
        Self {
            driver,
            handle: Some(handle),
        }
    }

    pub(crate) fn arm_sysex(&mut self) -> Result<()> {
        let handle = self.handle.as_mut().expect("handle held until release");
        self.driver.arm_sysex(handle)
    }

    pub(crate) fn device_name(&mut self) -> String {
        let handle = self.handle.as_ref().expect("handle held until release");
        self.driver.device_name(handle)
    }

    /// Defuse the guard and hand the handle back to the caller.
    pub(crate) fn release(mut self) -> D::Handle {
        self.handle.take().expect("handle held until release")
    }
}

impl<D: MidiDriver> Drop for ScopedHandle<'_, D> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = self.driver.close(handle) {
                warn!(error = %e, "failed to close midi device after aborted open");
            }
        }
    }
}
