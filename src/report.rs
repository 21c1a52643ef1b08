//! 12-byte gamepad input report.
//!
//! Layout (little-endian), matching [`crate::descriptor::REPORT_DESCRIPTOR`]:
//!
//! ```text
//! byte  0..4   buttons   u32, bit 0 = button 1
//! byte  4..6   joy_x     i16
//! byte  6..8   joy_y     i16
//! byte  8..10  joy_z     i16
//! byte 10..12  joy_r_z   i16
//! ```

use crate::error::GamepadError;
use crate::state::GamepadState;

/// Size of one encoded input report in bytes.
pub const REPORT_LEN: usize = 12;

/// One encoded input report.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct GamepadReport(pub [u8; REPORT_LEN]);

impl GamepadReport {
    /// Encodes the full state into a fresh report.
    #[must_use]
    pub fn encode(state: &GamepadState) -> Self {
        let mut b = [0u8; REPORT_LEN];
        b[0..4].copy_from_slice(&state.buttons.to_le_bytes());
        b[4..6].copy_from_slice(&state.joy_x.to_le_bytes());
        b[6..8].copy_from_slice(&state.joy_y.to_le_bytes());
        b[8..10].copy_from_slice(&state.joy_z.to_le_bytes());
        b[10..12].copy_from_slice(&state.joy_r_z.to_le_bytes());
        Self(b)
    }

    /// Decodes the report back into a logical state.
    #[must_use]
    pub fn decode(&self) -> GamepadState {
        let b = &self.0;
        GamepadState {
            buttons: u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            joy_x: i16::from_le_bytes([b[4], b[5]]),
            joy_y: i16::from_le_bytes([b[6], b[7]]),
            joy_z: i16::from_le_bytes([b[8], b[9]]),
            joy_r_z: i16::from_le_bytes([b[10], b[11]]),
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; REPORT_LEN] {
        &self.0
    }
}

impl From<&GamepadState> for GamepadReport {
    fn from(state: &GamepadState) -> Self {
        Self::encode(state)
    }
}

impl TryFrom<&[u8]> for GamepadReport {
    type Error = GamepadError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; REPORT_LEN] = data
            .try_into()
            .map_err(|_| GamepadError::InvalidReportLength(data.len()))?;
        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_state_encodes_to_zeros() {
        let report = GamepadReport::encode(&GamepadState::neutral());
        assert_eq!(report.as_bytes(), &[0u8; REPORT_LEN]);
    }

    #[test]
    fn buttons_one_and_five() {
        let state = GamepadState {
            buttons: 0x0000_0011,
            ..GamepadState::neutral()
        };
        let report = GamepadReport::from(&state);
        assert_eq!(report.0, [0x11, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn axes_are_little_endian_signed() {
        let state = GamepadState {
            buttons: 0x8000_0001,
            joy_x: 100,
            joy_y: -50,
            joy_z: 32767,
            joy_r_z: -32767,
        };
        let report = GamepadReport::encode(&state);
        assert_eq!(
            report.0,
            [0x01, 0x00, 0x00, 0x80, 0x64, 0x00, 0xCE, 0xFF, 0xFF, 0x7F, 0x01, 0x80]
        );
        assert_eq!(report.decode(), state);
    }

    #[test]
    fn decoding_checks_length() {
        let short = [0u8; 11];
        let err = GamepadReport::try_from(&short[..]).unwrap_err();
        assert!(matches!(err, GamepadError::InvalidReportLength(11)));

        let long = [0u8; 13];
        assert!(GamepadReport::try_from(&long[..]).is_err());

        let exact = [0xAAu8; REPORT_LEN];
        let report = GamepadReport::try_from(&exact[..]).unwrap();
        assert_eq!(report.decode().buttons, 0xAAAA_AAAA);
    }
}
