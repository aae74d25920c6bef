//! Control configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which joystick host direction keys emulate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum JoystickMode {
    #[default]
    Kempston,
    Cursor,
    Qaop,
    Sinclair2,
}

/// User options the controller consults when loading and resetting.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControlConfig {
    /// Step the CPU in fast-tape mode while the tape plays.
    pub fast_tape: bool,
    /// Reset and start tape/disk images automatically after inserting them.
    pub auto_play_image: bool,
    /// Run as a 48K machine: BASIC ROM, paging locked.
    pub mode_48k: bool,
    /// Reset into the service ROM instead of the 128K menu.
    pub reset_to_service_rom: bool,
    /// Drive that disk images are inserted into.
    pub drive: u8,
    pub joystick: JoystickMode,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            fast_tape: true,
            auto_play_image: true,
            mode_48k: false,
            reset_to_service_rom: false,
            drive: 0,
            joystick: JoystickMode::Kempston,
        }
    }
}
