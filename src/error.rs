//! Error type shared by the gamepad, the report codec and the transports.

use thiserror::Error;

/// Errors raised by gamepad operations
///
/// Validation errors are raised before any state is touched, so a failed call
/// leaves the gamepad exactly as it was. Transport errors are passed through
/// unchanged and never retried here.
#[derive(Debug, Error)]
pub enum GamepadError {
    /// A button number outside 1..=32 was given
    #[error("Button number must be in range 1 to 32, got {0}")]
    InvalidButtonNumber(u8),

    /// A joystick value outside -32767..=32767 was given
    #[error("Joystick value must be in range -32767 to 32767, got {0}")]
    InvalidAxisValue(i16),

    /// A byte slice of the wrong length was decoded as a report
    #[error("Report must be 12 bytes long, got {0}")]
    InvalidReportLength(usize),

    /// The transport could not register the virtual device
    #[error("Device creation error: {0}")]
    DeviceCreationError(String),

    /// The transport failed to deliver a frame or to tear the device down
    #[error("Transport error: {0}")]
    TransportError(String),
}
