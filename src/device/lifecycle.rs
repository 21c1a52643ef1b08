//! Device lifecycle state machine
//!
//! Owns the transport and, while a device exists, its handle. Input reports are
//! only passed to the transport in the `Started` state; the host ignores input
//! for a device it has not finished enumerating.

use super::Transport;
use crate::config::DeviceConfig;
use crate::descriptor::REPORT_DESCRIPTOR;
use crate::error::GamepadError;
use crate::report::GamepadReport;
use tracing::{debug, info, warn};

/// Externally visible lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceState {
    Uninitialized, // No device registered
    Initialized,   // Device registered, host has not started it
    Started,       // Host accepts input reports
}

// The handle lives inside the states that own a device.
enum Phase<H> {
    Uninitialized,
    Initialized(H),
    Started(H),
}

impl<H> Phase<H> {
    fn state(&self) -> DeviceState {
        match self {
            Phase::Uninitialized => DeviceState::Uninitialized,
            Phase::Initialized(_) => DeviceState::Initialized,
            Phase::Started(_) => DeviceState::Started,
        }
    }
}

/// Gate between the gamepad and its transport.
pub struct DeviceLifecycle<T: Transport> {
    transport: T,
    config: DeviceConfig,
    phase: Phase<T::Handle>,
}

impl<T: Transport> DeviceLifecycle<T> {
    /// Creates the lifecycle in `Uninitialized`; no device exists until [`open`](Self::open).
    pub fn new(config: DeviceConfig, transport: T) -> Self {
        debug!("Creating device lifecycle for {:?}", config);
        Self {
            transport,
            config,
            phase: Phase::Uninitialized,
        }
    }

    pub fn state(&self) -> DeviceState {
        self.phase.state()
    }

    pub fn is_started(&self) -> bool {
        matches!(self.phase, Phase::Started(_))
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Registers the device if needed, then waits until the host starts it.
    ///
    /// Does nothing when already `Started`. From `Initialized` it only waits.
    /// If the returned future is dropped while waiting, the lifecycle stays
    /// `Initialized` and a later call resumes the wait.
    ///
    /// # Errors
    ///
    /// * [`GamepadError::DeviceCreationError`] - the transport could not register the device
    /// * [`GamepadError::TransportError`] - readiness can no longer be signalled
    pub async fn open(&mut self) -> Result<(), GamepadError> {
        if let Phase::Uninitialized = self.phase {
            info!(
                "Creating virtual device '{}' ({:04x}:{:04x})",
                self.config.device_name, self.config.vendor_id, self.config.product_id
            );
            let handle = self.transport.create(&self.config, REPORT_DESCRIPTOR)?;
            self.phase = Phase::Initialized(handle);
            debug!("Transitioned to Initialized");
        }

        if let Phase::Initialized(handle) = &mut self.phase {
            info!("Waiting for host to start '{}'", self.config.device_name);
            self.transport.await_ready(handle).await?;

            self.phase = match std::mem::replace(&mut self.phase, Phase::Uninitialized) {
                Phase::Initialized(handle) => Phase::Started(handle),
                other => other,
            };
            info!("Device '{}' started", self.config.device_name);
        }

        Ok(())
    }

    /// Destroys the device and returns to `Uninitialized`.
    ///
    /// The state is `Uninitialized` afterwards even when the transport reports
    /// an error while destroying; that error is still returned.
    pub fn close(&mut self) -> Result<(), GamepadError> {
        match std::mem::replace(&mut self.phase, Phase::Uninitialized) {
            Phase::Uninitialized => {
                debug!("Close requested without a device, nothing to do");
                Ok(())
            }
            Phase::Initialized(handle) | Phase::Started(handle) => {
                info!("Destroying virtual device '{}'", self.config.device_name);
                self.transport.destroy(handle).inspect_err(|e| {
                    warn!("Transport failed to destroy device: {}", e);
                })
            }
        }
    }

    /// Passes one report to the transport.
    ///
    /// Returns `Ok(false)` without touching the transport unless `Started`.
    pub fn send(&mut self, report: &GamepadReport) -> Result<bool, GamepadError> {
        match &mut self.phase {
            Phase::Started(handle) => {
                self.transport.send(handle, report.as_bytes())?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
