//! Virtual USB HID gamepad
//!
//! Encodes logical gamepad state (32 buttons, four signed 16-bit axes) into the
//! 12-byte input report of a fixed HID descriptor and hands each report to a
//! virtual-device transport once the host has started the device.
//!
//! # Architecture
//!
//! ```text
//! Caller ──► Gamepad ──► GamepadReport ──► DeviceLifecycle ──► Transport
//!            (state)     (12 bytes)        (started gate)      (/dev/uhid)
//! ```
//!
//! The [`device::Transport`] trait is the only seam to the operating system.
//! [`device::uhid::UhidTransport`] implements it on Linux.

pub mod config;
pub mod descriptor;
pub mod device;
pub mod error;
pub mod gamepad;
pub mod report;
pub mod state;

pub use config::{AppConfig, DemoConfig, DeviceConfig};
pub use device::{DeviceLifecycle, DeviceState, Transport};
pub use error::GamepadError;
pub use gamepad::Gamepad;
pub use report::{GamepadReport, REPORT_LEN};
pub use state::{GamepadState, JoystickMove};
