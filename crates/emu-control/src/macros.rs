//! Frame-clocked keystroke scripts.
//!
//! A [`Macro`] drives the emulated machine's own software: it presses keys
//! on given frames, the way a user would, to boot a disk or type `LOAD ""`.
//! The controller advances the active macro once per frame and performs the
//! actions it returns.

use log::debug;

use crate::input::KeyFlags;

/// Something a macro does on a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroAction {
    /// Key event, delivered as an internally generated key.
    Key { code: char, flags: KeyFlags },
    /// Start or stop the tape.
    ToggleTape,
}

impl MacroAction {
    const fn press(code: char) -> Self {
        Self::Key {
            code,
            flags: KeyFlags::DOWN,
        }
    }

    const fn press_symbol(code: char) -> Self {
        Self::Key {
            code,
            flags: KeyFlags::DOWN.union(KeyFlags::ALT),
        }
    }

    const fn release(code: char) -> Self {
        Self::Key {
            code,
            flags: KeyFlags::empty(),
        }
    }
}

/// A script of actions keyed by frame number.
#[derive(Debug, Clone)]
pub struct Macro {
    steps: Vec<(i32, MacroAction)>,
    /// Frame on which the script finishes.
    last_frame: i32,
    /// Current frame; -1 until the first update.
    frame: i32,
}

impl Macro {
    /// Script from `(frame, action)` steps. It finishes on the last step's
    /// frame.
    #[must_use]
    pub fn new(mut steps: Vec<(i32, MacroAction)>) -> Self {
        steps.sort_by_key(|&(frame, _)| frame);
        let last_frame = steps.last().map_or(0, |&(frame, _)| frame);
        Self {
            steps,
            last_frame,
            frame: -1,
        }
    }

    /// Press Enter twice: picks the first entry of the 128K menu (TR-DOS),
    /// then boots.
    #[must_use]
    pub fn disk_boot() -> Self {
        Self::new(vec![
            (100, MacroAction::press('e')),
            (102, MacroAction::release('e')),
            (200, MacroAction::press('e')),
            (202, MacroAction::release('e')),
        ])
    }

    /// Type `LOAD ""` in 48K BASIC and start the tape.
    #[must_use]
    pub fn tape_load() -> Self {
        Self::new(vec![
            (100, MacroAction::press('J')),
            (102, MacroAction::release('J')),
            (102, MacroAction::press_symbol('P')),
            (104, MacroAction::release('P')),
            (110, MacroAction::press_symbol('P')),
            (112, MacroAction::release('P')),
            (120, MacroAction::press('e')),
            (122, MacroAction::release('e')),
            (122, MacroAction::ToggleTape),
        ])
    }

    /// Frames advanced so far, minus one.
    #[must_use]
    pub fn frame(&self) -> i32 {
        self.frame
    }

    /// Advance one frame, appending that frame's actions to `actions`.
    ///
    /// Returns false on the final frame; the script is then finished.
    pub fn update(&mut self, actions: &mut Vec<MacroAction>) -> bool {
        self.frame += 1;
        let frame = self.frame;
        let start = actions.len();
        actions.extend(
            self.steps
                .iter()
                .filter(|&&(at, _)| at == frame)
                .map(|&(_, action)| action),
        );
        if actions.len() > start {
            debug!("macro frame {frame}: {:?}", &actions[start..]);
        }
        frame < self.last_frame
    }
}
