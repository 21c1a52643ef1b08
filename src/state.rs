//! Logical gamepad state: button bitfield and joystick axes.

use crate::error::GamepadError;

/// Number of buttons declared by the report descriptor.
pub const BUTTON_COUNT: u8 = 32;

/// Smallest axis value accepted by the descriptor's logical minimum.
pub const AXIS_MIN: i16 = -32767;

/// Largest axis value accepted by the descriptor's logical maximum.
pub const AXIS_MAX: i16 = 32767;

/// Complete logical gamepad state.
///
/// Bit `i` of `buttons` is button number `i + 1`. One joystick provides
/// `joy_x`/`joy_y`, the other `joy_z`/`joy_r_z` (z rotation).
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct GamepadState {
    pub buttons: u32,
    pub joy_x: i16,
    pub joy_y: i16,
    pub joy_z: i16,
    pub joy_r_z: i16,
}

impl GamepadState {
    /// No buttons pressed, both sticks centered.
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            buttons: 0,
            joy_x: 0,
            joy_y: 0,
            joy_z: 0,
            joy_r_z: 0,
        }
    }

    /// Sets the bits of the given buttons. Nothing changes if any number is invalid.
    pub fn press(&mut self, buttons: &[u8]) -> Result<(), GamepadError> {
        let mask = button_mask(buttons)?;
        self.buttons |= mask;
        Ok(())
    }

    /// Clears the bits of the given buttons. Nothing changes if any number is invalid.
    pub fn release(&mut self, buttons: &[u8]) -> Result<(), GamepadError> {
        let mask = button_mask(buttons)?;
        self.buttons &= !mask;
        Ok(())
    }

    pub fn release_all(&mut self) {
        self.buttons = 0;
    }

    /// Assigns every axis present in `movement`.
    ///
    /// All provided values are validated before the first assignment, so an
    /// out-of-range value leaves every axis untouched.
    pub fn apply(&mut self, movement: JoystickMove) -> Result<(), GamepadError> {
        movement.validate()?;

        if let Some(x) = movement.x {
            self.joy_x = x;
        }
        if let Some(y) = movement.y {
            self.joy_y = y;
        }
        if let Some(z) = movement.z {
            self.joy_z = z;
        }
        if let Some(r_z) = movement.r_z {
            self.joy_r_z = r_z;
        }
        Ok(())
    }

    /// Returns to [`GamepadState::neutral`].
    pub fn reset(&mut self) {
        *self = Self::neutral();
    }

    /// Whether the given button (1..=32) is currently held. Invalid numbers are never held.
    #[must_use]
    pub fn is_pressed(&self, button: u8) -> bool {
        validate_button(button)
            .map(|b| self.buttons & (1 << (b - 1)) != 0)
            .unwrap_or(false)
    }
}

/// Joystick update; axes left as `None` keep their current value.
///
/// ```
/// use uhid_gamepad::JoystickMove;
///
/// // Change x and y only.
/// let movement = JoystickMove {
///     x: Some(100),
///     y: Some(-50),
///     ..Default::default()
/// };
/// assert_eq!(movement.z, None);
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct JoystickMove {
    pub x: Option<i16>,
    pub y: Option<i16>,
    pub z: Option<i16>,
    pub r_z: Option<i16>,
}

impl JoystickMove {
    /// Moves all four axes to center.
    #[must_use]
    pub const fn center() -> Self {
        Self {
            x: Some(0),
            y: Some(0),
            z: Some(0),
            r_z: Some(0),
        }
    }

    /// Checks every provided axis value, reporting the first one out of range.
    pub fn validate(&self) -> Result<(), GamepadError> {
        [self.x, self.y, self.z, self.r_z]
            .into_iter()
            .flatten()
            .try_for_each(|value| validate_axis(value).map(|_| ()))
    }
}

pub fn validate_button(button: u8) -> Result<u8, GamepadError> {
    if (1..=BUTTON_COUNT).contains(&button) {
        Ok(button)
    } else {
        Err(GamepadError::InvalidButtonNumber(button))
    }
}

pub fn validate_axis(value: i16) -> Result<i16, GamepadError> {
    if (AXIS_MIN..=AXIS_MAX).contains(&value) {
        Ok(value)
    } else {
        Err(GamepadError::InvalidAxisValue(value))
    }
}

/// Folds button numbers into a bitmask, failing on the first invalid number.
pub fn button_mask(buttons: &[u8]) -> Result<u32, GamepadError> {
    buttons.iter().try_fold(0u32, |mask, &button| {
        validate_button(button).map(|b| mask | 1 << (b - 1))
    })
}
