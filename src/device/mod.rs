//! Virtual device subsystem
//!
//! 1. [`Transport`] - seam to whatever registers the device with the host
//! 2. [`lifecycle`] - `Uninitialized → Initialized → Started` gate around the handle
//! 3. [`uhid`] - Linux `/dev/uhid` transport
//!
//! ```text
//!                open(): create            open(): await_ready
//! Uninitialized ────────────────► Initialized ────────────────► Started
//!       ▲                              │                           │
//!       └──────────── close(): destroy ┴───────────────────────────┘
//! ```

pub mod lifecycle;
pub mod uhid;
pub mod uhid_event;

use crate::config::DeviceConfig;
use crate::error::GamepadError;
use crate::report::REPORT_LEN;
use std::future::Future;

pub use lifecycle::{DeviceLifecycle, DeviceState};

/// Collaborator that registers a virtual HID device and carries its input reports.
///
/// A transport hands out one handle per created device. The handle is owned by
/// [`DeviceLifecycle`] until it is passed back to [`Transport::destroy`].
pub trait Transport {
    /// Per-device state owned by the lifecycle
    type Handle;

    /// Registers a virtual device described by `descriptor`.
    ///
    /// # Errors
    ///
    /// [`GamepadError::DeviceCreationError`] if the device cannot be registered.
    fn create(
        &mut self,
        config: &DeviceConfig,
        descriptor: &'static [u8],
    ) -> Result<Self::Handle, GamepadError>;

    /// Resolves once the host has acknowledged the device is ready for input.
    ///
    /// Dropping the returned future must leave the handle able to wait again.
    fn await_ready(
        &mut self,
        handle: &mut Self::Handle,
    ) -> impl Future<Output = Result<(), GamepadError>> + Send;

    /// Delivers one input report.
    fn send(
        &mut self,
        handle: &mut Self::Handle,
        report: &[u8; REPORT_LEN],
    ) -> Result<(), GamepadError>;

    /// Tears the device down, consuming its handle.
    fn destroy(&mut self, handle: Self::Handle) -> Result<(), GamepadError>;
}
