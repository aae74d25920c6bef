//! Key, joystick and mouse events.
//!
//! Hosts deliver keys as single-character codes plus [`KeyFlags`]:
//!
//! - `A`-`Z`, `0`-`9` and space name the key of the same legend;
//! - `e` is Enter, `c` is Caps Shift, `s` is Symbol Shift;
//! - `l`, `r`, `u`, `d`, `f` are joystick directions and fire, translated
//!   according to the joystick flag they arrive with.

use bitflags::bitflags;

use crate::config::JoystickMode;

bitflags! {
    /// Modifiers and routing tags for a host key event.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct KeyFlags: u32 {
        const DOWN = 1 << 0;
        const SHIFT = 1 << 1;
        const CTRL = 1 << 2;
        const ALT = 1 << 3;
        /// Direction codes go to the Kempston joystick port.
        const KEMPSTON = 1 << 4;
        /// Direction codes become cursor keys.
        const CURSOR = 1 << 5;
        /// Direction codes become Q/A/O/P and space.
        const QAOP = 1 << 6;
        /// Direction codes become the Sinclair 2 joystick keys (6-0).
        const SINCLAIR2 = 1 << 7;
        /// Generated internally (macros); bypasses the UI layer.
        const UI_SENDER = 1 << 8;
    }
}

impl KeyFlags {
    /// Routing flag for a configured joystick.
    #[must_use]
    pub const fn for_joystick(mode: JoystickMode) -> Self {
        match mode {
            JoystickMode::Kempston => Self::KEMPSTON,
            JoystickMode::Cursor => Self::CURSOR,
            JoystickMode::Qaop => Self::QAOP,
            JoystickMode::Sinclair2 => Self::SINCLAIR2,
        }
    }
}

/// Logical key on the Spectrum keyboard.
///
/// Each key maps to a (row, bit) pair in the 8×5 keyboard matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpectrumKey {
    // Row 0 (addr bit A8)
    CapsShift,
    Z,
    X,
    C,
    V,
    // Row 1 (addr bit A9)
    A,
    S,
    D,
    F,
    G,
    // Row 2 (addr bit A10)
    Q,
    W,
    E,
    R,
    T,
    // Row 3 (addr bit A11)
    N1,
    N2,
    N3,
    N4,
    N5,
    // Row 4 (addr bit A12)
    N0,
    N9,
    N8,
    N7,
    N6,
    // Row 5 (addr bit A13)
    P,
    O,
    I,
    U,
    Y,
    // Row 6 (addr bit A14)
    Enter,
    L,
    K,
    J,
    H,
    // Row 7 (addr bit A15)
    Space,
    SymShift,
    M,
    N,
    B,
}

impl SpectrumKey {
    /// Return the (row, bit) pair for this key in the keyboard matrix.
    #[must_use]
    pub const fn matrix(self) -> (usize, u8) {
        match self {
            Self::CapsShift => (0, 0),
            Self::Z => (0, 1),
            Self::X => (0, 2),
            Self::C => (0, 3),
            Self::V => (0, 4),

            Self::A => (1, 0),
            Self::S => (1, 1),
            Self::D => (1, 2),
            Self::F => (1, 3),
            Self::G => (1, 4),

            Self::Q => (2, 0),
            Self::W => (2, 1),
            Self::E => (2, 2),
            Self::R => (2, 3),
            Self::T => (2, 4),

            Self::N1 => (3, 0),
            Self::N2 => (3, 1),
            Self::N3 => (3, 2),
            Self::N4 => (3, 3),
            Self::N5 => (3, 4),

            Self::N0 => (4, 0),
            Self::N9 => (4, 1),
            Self::N8 => (4, 2),
            Self::N7 => (4, 3),
            Self::N6 => (4, 4),

            Self::P => (5, 0),
            Self::O => (5, 1),
            Self::I => (5, 2),
            Self::U => (5, 3),
            Self::Y => (5, 4),

            Self::Enter => (6, 0),
            Self::L => (6, 1),
            Self::K => (6, 2),
            Self::J => (6, 3),
            Self::H => (6, 4),

            Self::Space => (7, 0),
            Self::SymShift => (7, 1),
            Self::M => (7, 2),
            Self::N => (7, 3),
            Self::B => (7, 4),
        }
    }

    /// Key for a host key code (see module docs). Joystick codes and
    /// anything unmapped return `None`.
    #[must_use]
    pub const fn from_code(code: char) -> Option<Self> {
        Some(match code {
            'A' => Self::A,
            'B' => Self::B,
            'C' => Self::C,
            'D' => Self::D,
            'E' => Self::E,
            'F' => Self::F,
            'G' => Self::G,
            'H' => Self::H,
            'I' => Self::I,
            'J' => Self::J,
            'K' => Self::K,
            'L' => Self::L,
            'M' => Self::M,
            'N' => Self::N,
            'O' => Self::O,
            'P' => Self::P,
            'Q' => Self::Q,
            'R' => Self::R,
            'S' => Self::S,
            'T' => Self::T,
            'U' => Self::U,
            'V' => Self::V,
            'W' => Self::W,
            'X' => Self::X,
            'Y' => Self::Y,
            'Z' => Self::Z,
            '0' => Self::N0,
            '1' => Self::N1,
            '2' => Self::N2,
            '3' => Self::N3,
            '4' => Self::N4,
            '5' => Self::N5,
            '6' => Self::N6,
            '7' => Self::N7,
            '8' => Self::N8,
            '9' => Self::N9,
            ' ' => Self::Space,
            'e' => Self::Enter,
            'c' => Self::CapsShift,
            's' => Self::SymShift,
            _ => return None,
        })
    }
}

/// A key change delivered to the keyboard device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: SpectrumKey,
    pub pressed: bool,
    /// Hold Caps Shift with the key.
    pub shift: bool,
    pub ctrl: bool,
    /// Hold Symbol Shift with the key.
    pub alt: bool,
}

/// Kempston joystick line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoystickInput {
    Left,
    Right,
    Up,
    Down,
    Fire,
}

impl JoystickInput {
    #[must_use]
    pub const fn from_code(code: char) -> Option<Self> {
        match code {
            'l' => Some(Self::Left),
            'r' => Some(Self::Right),
            'u' => Some(Self::Up),
            'd' => Some(Self::Down),
            'f' => Some(Self::Fire),
            _ => None,
        }
    }
}

/// Kempston mouse event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseAction {
    /// Relative motion.
    Move { dx: u8, dy: u8 },
    Button { button: u8, pressed: bool },
}

/// Map a joystick direction code onto keyboard keys for keyboard-mapped
/// joysticks.
///
/// Returns the translated code and the Caps Shift state to send with it.
/// Codes that are not directions, and flags that select no keyboard
/// joystick, pass through unchanged.
#[must_use]
pub fn translate_joystick(code: char, flags: KeyFlags, shift: bool) -> (char, bool) {
    let down = flags.contains(KeyFlags::DOWN);
    if flags.contains(KeyFlags::CURSOR) {
        match code {
            'l' => ('5', down),
            'r' => ('8', down),
            'u' => ('7', down),
            'd' => ('6', down),
            'f' => ('0', false),
            _ => (code, shift),
        }
    } else if flags.contains(KeyFlags::QAOP) {
        let mapped = match code {
            'l' => 'O',
            'r' => 'P',
            'u' => 'Q',
            'd' => 'A',
            'f' => ' ',
            _ => code,
        };
        (mapped, shift)
    } else if flags.contains(KeyFlags::SINCLAIR2) {
        let mapped = match code {
            'l' => '6',
            'r' => '7',
            'u' => '9',
            'd' => '8',
            'f' => '0',
            _ => code,
        };
        (mapped, shift)
    } else {
        (code, shift)
    }
}
