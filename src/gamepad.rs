//! Gamepad - public API for the virtual controller
//!
//! Every mutating call re-encodes the full report from the logical state and
//! offers it to the device. A report only reaches the transport when the
//! device is started and the bytes differ from the last report actually sent,
//! except for [`Gamepad::reset_all`], which always sends.

use crate::config::DeviceConfig;
use crate::device::{DeviceLifecycle, DeviceState, Transport};
use crate::error::GamepadError;
use crate::report::GamepadReport;
use crate::state::{GamepadState, JoystickMove};
use tracing::{debug, error, trace};

/// Virtual USB HID gamepad with 32 buttons and two joysticks.
///
/// Buttons are numbered from 1, as on most controllers. Call
/// [`open`](Self::open) and wait for it before expecting input to reach the
/// host; earlier changes update the state but are not transmitted.
///
/// # Examples
///
/// ```rust,no_run
/// use uhid_gamepad::device::uhid::UhidTransport;
/// use uhid_gamepad::{DeviceConfig, Gamepad, JoystickMove};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), uhid_gamepad::GamepadError> {
/// let mut gamepad = Gamepad::new(DeviceConfig::default(), UhidTransport::default());
/// gamepad.open().await?;
///
/// gamepad.press_buttons(&[1, 5])?;
/// gamepad.move_joysticks(JoystickMove {
///     x: Some(100),
///     y: Some(-50),
///     ..Default::default()
/// })?;
/// gamepad.reset_all()?;
///
/// gamepad.close()?;
/// # Ok(())
/// # }
/// ```
pub struct Gamepad<T: Transport> {
    state: GamepadState,
    last_report: GamepadReport,
    device: DeviceLifecycle<T>,
}

impl<T: Transport> Gamepad<T> {
    pub fn new(config: DeviceConfig, transport: T) -> Self {
        Self {
            state: GamepadState::neutral(),
            last_report: GamepadReport::default(),
            device: DeviceLifecycle::new(config, transport),
        }
    }

    /// Creates the virtual device and waits until the host starts it.
    pub async fn open(&mut self) -> Result<(), GamepadError> {
        self.device.open().await
    }

    /// Destroys the virtual device. It can be re-opened with [`open`](Self::open).
    pub fn close(&mut self) -> Result<(), GamepadError> {
        self.device.close()
    }

    /// Press and hold the given buttons.
    pub fn press_buttons(&mut self, buttons: &[u8]) -> Result<(), GamepadError> {
        self.state.press(buttons)?;
        self.send_report(false)
    }

    /// Release the given buttons.
    pub fn release_buttons(&mut self, buttons: &[u8]) -> Result<(), GamepadError> {
        self.state.release(buttons)?;
        self.send_report(false)
    }

    pub fn release_all_buttons(&mut self) -> Result<(), GamepadError> {
        self.state.release_all();
        self.send_report(false)
    }

    /// Press and release the given buttons as two separate reports.
    pub fn click_buttons(&mut self, buttons: &[u8]) -> Result<(), GamepadError> {
        self.press_buttons(buttons)?;
        self.release_buttons(buttons)
    }

    /// Set the given joystick axes; they keep their values until changed.
    ///
    /// One report is offered for all axes together.
    pub fn move_joysticks(&mut self, movement: JoystickMove) -> Result<(), GamepadError> {
        self.state.apply(movement)?;
        self.send_report(false)
    }

    /// Release all buttons, center both joysticks and always send the result.
    pub fn reset_all(&mut self) -> Result<(), GamepadError> {
        self.state.reset();
        self.send_report(true)
    }

    pub fn state(&self) -> &GamepadState {
        &self.state
    }

    /// Report encoded from the current state.
    pub fn report(&self) -> GamepadReport {
        GamepadReport::encode(&self.state)
    }

    pub fn device_state(&self) -> DeviceState {
        self.device.state()
    }

    pub fn config(&self) -> &DeviceConfig {
        self.device.config()
    }

    pub fn transport(&self) -> &T {
        self.device.transport()
    }

    // Snapshot is only updated after the transport accepted the report.
    fn send_report(&mut self, always: bool) -> Result<(), GamepadError> {
        let report = GamepadReport::encode(&self.state);

        if !self.device.is_started() {
            trace!("Device not started, holding report {:02x?}", report.as_bytes());
            return Ok(());
        }

        if !always && report == self.last_report {
            trace!("Suppressing duplicate report");
            return Ok(());
        }

        match self.device.send(&report) {
            Ok(true) => {
                debug!("Sent report {:02x?}", report.as_bytes());
                self.last_report = report;
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(e) => {
                error!("Failed to send report: {}", e);
                Err(e)
            }
        }
    }
}
