//! The emulation controller.
//!
//! [`Control`] owns the machine and everything layered over it: at most one
//! replay session, at most one macro, the poke overlay and the file-type
//! registry. Hosts call [`Control::on_loop`] once per frame and route files,
//! keys and UI actions through it.

use std::path::Path;

use format_ay::AyImage;
use log::{debug, info, warn};

use crate::config::ControlConfig;
use crate::error::FileError;
use crate::file_type::FileTypes;
use crate::handlers;
use crate::input::{
    JoystickInput, KeyEvent, KeyFlags, MouseAction, SpectrumKey, translate_joystick,
};
use crate::machine::{Machine, PortSource};
use crate::macros::{Macro, MacroAction};
use crate::memory::{PAGE_SIZE, Page, RomBank};
use crate::pokes::PatchOverlay;
use crate::replay::{Recording, ReplayError, ReplaySession, SnapshotHost};

/// Paging latch port on 128K machines.
const PORT_7FFD: u16 = 0x7FFD;

/// Commands the UI can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Reset,
    TapeToggle,
    TapeQuery,
}

impl Action {
    /// Parse a UI action name (`"reset"`, `"tape_toggle"`, `"tape_query"`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "reset" => Some(Self::Reset),
            "tape_toggle" => Some(Self::TapeToggle),
            "tape_query" => Some(Self::TapeQuery),
            _ => None,
        }
    }
}

/// Outcome of an [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionResult {
    Ok,
    Error,
    TapeNotInserted,
    TapeStarted,
    TapeStopped,
}

/// Controller for one emulated machine.
pub struct Control<M> {
    machine: M,
    config: ControlConfig,
    file_types: FileTypes<M>,
    replay: Option<ReplaySession>,
    script: Option<Macro>,
    pokes: PatchOverlay,
    video_paused: i32,
    /// Set while the replay session is advancing, so a reset it triggers
    /// (loading an embedded snapshot) leaves the session alone.
    inside_replay_update: bool,
    ui_focused: bool,
    last_file: Option<String>,
}

impl<M: Machine> Control<M> {
    /// Take ownership of `machine` with the standard file types, and reset it.
    pub fn new(machine: M, config: ControlConfig) -> Self {
        Self::with_file_types(machine, config, handlers::standard())
    }

    /// Like [`Control::new`] with a custom registry.
    pub fn with_file_types(machine: M, config: ControlConfig, file_types: FileTypes<M>) -> Self {
        let mut control = Self {
            machine,
            config,
            file_types,
            replay: None,
            script: None,
            pokes: PatchOverlay::new(),
            video_paused: 0,
            inside_replay_update: false,
            ui_focused: false,
            last_file: None,
        };
        control.on_action(Action::Reset);
        control
    }

    #[must_use]
    pub fn machine(&self) -> &M {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut M {
        &mut self.machine
    }

    /// Give the machine back.
    pub fn into_machine(self) -> M {
        self.machine
    }

    #[must_use]
    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ControlConfig {
        &mut self.config
    }

    #[must_use]
    pub fn file_types(&self) -> &FileTypes<M> {
        &self.file_types
    }

    pub fn file_types_mut(&mut self) -> &mut FileTypes<M> {
        &mut self.file_types
    }

    /// Advance one host frame.
    ///
    /// Returns why the replay stopped, if it stopped during this frame.
    pub fn on_loop(&mut self) -> Option<ReplayError> {
        if !(self.full_speed() || self.video_paused == 0) {
            return None;
        }
        self.update_macro();
        match self.replay.take() {
            Some(session) => self.update_replay(session),
            None => {
                self.machine.run(None, None);
                None
            }
        }
    }

    fn update_macro(&mut self) {
        let Some(mut script) = self.script.take() else {
            return;
        };
        let mut actions = Vec::new();
        if script.update(&mut actions) {
            self.script = Some(script);
        } else {
            debug!("macro finished");
        }
        for action in actions {
            match action {
                MacroAction::Key { code, flags } => self.on_key(code, flags | KeyFlags::UI_SENDER),
                MacroAction::ToggleTape => {
                    self.on_action(Action::TapeToggle);
                }
            }
        }
    }

    fn update_replay(&mut self, mut session: ReplaySession) -> Option<ReplayError> {
        self.inside_replay_update = true;
        let budget = session.update(self);
        self.inside_replay_update = false;

        let result = budget.and_then(|budget| {
            let ports: &mut dyn PortSource = &mut session;
            self.machine.run(Some(budget), Some(ports));
            session.check_sync()
        });
        match result {
            Ok(()) => {
                // A session installed during the update replaces this one.
                if self.replay.is_none() {
                    self.replay = Some(session);
                }
                None
            }
            Err(err) => {
                warn!("replay ended after {} frame(s): {err}", session.frames());
                self.set_replay(None);
                Some(err)
            }
        }
    }

    /// Install a replay (or stop the current one with `None`).
    ///
    /// Port reads are redirected to the recording while it is active.
    pub fn set_replay(&mut self, recording: Option<Box<dyn Recording>>) {
        self.machine.set_port_redirect(false);
        self.replay = recording.map(ReplaySession::new);
        if self.replay.is_some() {
            self.machine.set_port_redirect(true);
        }
    }

    #[must_use]
    pub fn replay(&self) -> Option<&ReplaySession> {
        self.replay.as_ref()
    }

    /// Arm a macro, cancelling any that is running.
    pub fn play_macro(&mut self, script: Macro) {
        self.script = Some(script);
    }

    #[must_use]
    pub fn macro_active(&self) -> bool {
        self.script.is_some()
    }

    pub fn on_action(&mut self, action: Action) -> ActionResult {
        match action {
            Action::Reset => {
                if !self.inside_replay_update && self.replay.take().is_some() {
                    self.machine.set_port_redirect(false);
                }
                self.script = None;
                self.machine.set_mode_48k(self.config.mode_48k);
                self.machine.reset();
                if !self.machine.mode_48k() {
                    let rom = if self.config.reset_to_service_rom {
                        RomBank::Service
                    } else {
                        RomBank::Menu128
                    };
                    self.machine.memory_mut().select_rom(rom);
                }
                if self.inside_replay_update {
                    self.machine.set_port_redirect(true);
                }
                self.refresh_pokes();
                ActionResult::Ok
            }
            Action::TapeToggle => {
                if !self.machine.tape().inserted() {
                    return ActionResult::TapeNotInserted;
                }
                if self.machine.tape().started() {
                    self.machine.tape().stop();
                } else {
                    self.machine.set_fast_tape(self.config.fast_tape);
                    self.machine.tape().start();
                }
                self.tape_state()
            }
            Action::TapeQuery => {
                if !self.machine.tape().inserted() {
                    return ActionResult::TapeNotInserted;
                }
                self.tape_state()
            }
        }
    }

    fn tape_state(&mut self) -> ActionResult {
        if self.machine.tape().started() {
            ActionResult::TapeStarted
        } else {
            ActionResult::TapeStopped
        }
    }

    /// Dispatch an action by name. Unknown names give [`ActionResult::Error`].
    pub fn on_action_named(&mut self, name: &str) -> ActionResult {
        match Action::from_name(name) {
            Some(action) => self.on_action(action),
            None => {
                warn!("unknown action {name:?}");
                ActionResult::Error
            }
        }
    }

    /// Tell the controller whether the host UI has keyboard focus. Keys not
    /// tagged [`KeyFlags::UI_SENDER`] are dropped while it does.
    pub fn set_ui_focused(&mut self, focused: bool) {
        self.ui_focused = focused;
    }

    /// Key routing flag for joystick codes under the current config.
    #[must_use]
    pub fn joystick_flags(&self) -> KeyFlags {
        KeyFlags::for_joystick(self.config.joystick)
    }

    /// Deliver a host key code (see [`crate::input`]).
    pub fn on_key(&mut self, code: char, flags: KeyFlags) {
        if !flags.contains(KeyFlags::UI_SENDER) && self.ui_focused {
            return;
        }
        let pressed = flags.contains(KeyFlags::DOWN);

        if flags.contains(KeyFlags::KEMPSTON)
            && let Some(input) = JoystickInput::from_code(code)
        {
            self.machine.joystick(input, pressed);
        }

        let (code, shift) = translate_joystick(code, flags, flags.contains(KeyFlags::SHIFT));
        let Some(key) = SpectrumKey::from_code(code) else {
            return;
        };
        self.machine.key(KeyEvent {
            key,
            pressed,
            shift,
            ctrl: flags.contains(KeyFlags::CTRL),
            alt: flags.contains(KeyFlags::ALT),
        });
    }

    pub fn on_mouse(&mut self, action: MouseAction) {
        self.machine.mouse(action);
    }

    /// Patch memory now and after every reset.
    pub fn poke(&mut self, addr: u16, value: u8) {
        self.pokes.set(addr, value);
        self.machine.memory_mut().write(addr, value);
    }

    /// Write every recorded patch again.
    pub fn refresh_pokes(&mut self) {
        self.pokes.apply(self.machine.memory_mut());
    }

    #[must_use]
    pub fn pokes(&self) -> &PatchOverlay {
        &self.pokes
    }

    /// Whether `name` has a handler that can open it.
    #[must_use]
    pub fn file_type_supported(&self, name: &str) -> bool {
        self.file_types
            .find_by_name(name)
            .is_some_and(|t| t.can_open())
    }

    /// Open a file the user picked: remembers the name, then dispatches.
    pub fn open_file(&mut self, name: &str, data: &[u8]) -> Result<(), FileError> {
        self.last_file = Some(name.to_string());
        let file_type = self
            .file_types
            .find_by_name(name)
            .ok_or_else(|| FileError::UnknownType(name.to_string()))?;
        info!("opening {name} as {} ({} bytes)", file_type.tag, data.len());
        file_type.open(self, data)
    }

    /// Read `path` from disk and open it.
    pub fn open_path(&mut self, path: &Path) -> Result<(), FileError> {
        let name = path.to_string_lossy().into_owned();
        self.last_file = Some(name.clone());
        let file_type = self
            .file_types
            .find_by_name(&name)
            .ok_or_else(|| FileError::UnknownType(name.clone()))?;
        let data = std::fs::read(path).map_err(|source| FileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("opening {name} ({} bytes)", data.len());
        file_type.open(self, &data)
    }

    /// Save machine state to `path`, in the format its extension names.
    pub fn save_file(&mut self, path: &Path) -> Result<(), FileError> {
        let name = path.to_string_lossy().into_owned();
        self.last_file = Some(name.clone());
        let file_type = self
            .file_types
            .find_by_name(&name)
            .ok_or(FileError::UnknownType(name))?;
        file_type.store(self, path)
    }

    /// Name of the file last opened or saved.
    #[must_use]
    pub fn last_file(&self) -> Option<&str> {
        self.last_file.as_deref()
    }

    /// Pause (`true`) or resume video. Calls nest.
    pub fn video_paused(&mut self, paused: bool) {
        if paused {
            self.video_paused += 1;
        } else {
            self.video_paused -= 1;
        }
    }

    #[must_use]
    pub fn full_speed(&self) -> bool {
        self.machine.full_speed()
    }

    #[must_use]
    pub fn screen(&self) -> &[u8] {
        self.machine.screen()
    }

    /// Reset into a decoded AY player image.
    ///
    /// The image covers the whole address space: its four 16K quarters go
    /// to ROM page 0 and RAM pages 5, 2 and 0, and every other RAM page is
    /// cleared. Pokes are written over the image.
    pub fn load_ay(&mut self, image: &AyImage) {
        self.on_action(Action::Reset);
        let memory = self.machine.memory_mut();
        memory.select_rom(RomBank::Menu128);
        let targets = [Page::Rom(0), Page::Ram(5), Page::Ram(2), Page::Ram(0)];
        for (page, chunk) in targets.into_iter().zip(image.memory.chunks_exact(PAGE_SIZE)) {
            memory.page_mut(page).copy_from_slice(chunk);
        }
        for n in [1, 3, 4, 6, 7] {
            memory.page_mut(Page::Ram(n)).fill(0);
        }

        let regs = self.machine.registers_mut();
        regs.fill_pairs(image.hireg, image.loreg);
        regs.r = image.loreg;
        regs.im = 0;
        regs.sp = image.stack;
        regs.pc = 0;
        regs.i = 0;

        self.machine.io_write(PORT_7FFD, 0);
        self.machine.reset_sound();
        self.refresh_pokes();
        info!(
            "AY: playing {:?} (song {} of {})",
            image.title,
            u16::from(image.song) + 1,
            image.song_count
        );
    }
}

impl<M: Machine> SnapshotHost for Control<M> {
    fn open_snapshot(&mut self, ext: &str, data: &[u8]) -> Result<(), ReplayError> {
        let file_type = self
            .file_types
            .find(ext)
            .filter(|t| t.can_open() && t.tag != "rzx")
            .ok_or(ReplayError::Unsupported)?;
        file_type.open(self, data).map_err(|e| {
            warn!("embedded {ext} snapshot rejected: {e}");
            ReplayError::Invalid
        })
    }
}
