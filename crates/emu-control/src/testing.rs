//! Test doubles: a machine that records what the controller asks of it,
//! and a recording that plays a fixed script.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::input::{JoystickInput, KeyEvent, MouseAction, SpectrumKey};
use crate::machine::{DiskDevice, Machine, PortSource, TapeDevice};
use crate::memory::{Memory, Page};
use crate::registers::Registers;
use crate::replay::{Recording, ReplayError, SnapshotHost};

/// Port the fake CPU reads during redirected frames (keyboard row $FE).
pub const FAKE_READ_PORT: u16 = 0xFEFE;

/// One [`Machine::run`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub budget: Option<u32>,
    /// Port reads went to the replay source.
    pub redirected: bool,
}

/// Tape deck that accepts (or refuses) everything.
#[derive(Debug, Clone)]
pub struct FakeTape {
    pub accept: bool,
    pub inserted: bool,
    pub started: bool,
    pub opened: Vec<String>,
}

impl Default for FakeTape {
    fn default() -> Self {
        Self {
            accept: true,
            inserted: false,
            started: false,
            opened: Vec::new(),
        }
    }
}

impl TapeDevice for FakeTape {
    fn open(&mut self, kind: &str, _data: &[u8]) -> bool {
        self.opened.push(kind.to_string());
        if self.accept {
            self.inserted = true;
            self.started = false;
        }
        self.accept
    }

    fn inserted(&self) -> bool {
        self.inserted
    }

    fn started(&self) -> bool {
        self.started
    }

    fn start(&mut self) {
        self.started = true;
    }

    fn stop(&mut self) {
        self.started = false;
    }
}

/// Disk controller with a configurable boot file.
#[derive(Debug, Clone)]
pub struct FakeDisk {
    pub accept: bool,
    pub boot: bool,
    pub opened: Vec<(String, u8)>,
}

impl Default for FakeDisk {
    fn default() -> Self {
        Self {
            accept: true,
            boot: false,
            opened: Vec::new(),
        }
    }
}

impl DiskDevice for FakeDisk {
    fn open(&mut self, kind: &str, drive: u8, _data: &[u8]) -> bool {
        self.opened.push((kind.to_string(), drive));
        self.accept
    }

    fn boot_exists(&self, _drive: u8) -> bool {
        self.boot
    }
}

/// A machine that runs nothing and remembers everything.
pub struct FakeMachine {
    pub memory: Memory,
    pub registers: Registers,
    pub redirect: bool,
    /// Whether `reset` drops port redirection.
    pub reset_clears_redirect: bool,
    pub fast_tape: Option<bool>,
    pub full_speed: bool,
    pub tape: FakeTape,
    pub disk: FakeDisk,
    pub resets: usize,
    pub sound_resets: usize,
    pub runs: Vec<Run>,
    /// Port reads the fake CPU makes in each redirected run.
    pub reads_per_frame: usize,
    /// Values those reads returned.
    pub port_values: Vec<u8>,
    pub io_writes: Vec<(u16, u8)>,
    pub keys: Vec<KeyEvent>,
    /// Keyboard matrix, active low.
    pub keyboard: [u8; 8],
    pub joystick: Vec<(JoystickInput, bool)>,
    pub mouse: Vec<MouseAction>,
    pub accept_snapshots: bool,
    /// Kinds of snapshots loaded.
    pub snapshots: Vec<String>,
    pub accept_store: bool,
    pub stored: Vec<PathBuf>,
    pub screen: Vec<u8>,
}

impl FakeMachine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            memory: Memory::new(),
            registers: Registers::default(),
            redirect: false,
            reset_clears_redirect: true,
            fast_tape: None,
            full_speed: false,
            tape: FakeTape::default(),
            disk: FakeDisk::default(),
            resets: 0,
            sound_resets: 0,
            runs: Vec::new(),
            reads_per_frame: 0,
            port_values: Vec::new(),
            io_writes: Vec::new(),
            keys: Vec::new(),
            keyboard: [0x1F; 8],
            joystick: Vec::new(),
            mouse: Vec::new(),
            accept_snapshots: true,
            snapshots: Vec::new(),
            accept_store: true,
            stored: Vec::new(),
            screen: vec![0; 6912],
        }
    }

    /// Whether `key` is currently held in the matrix.
    #[must_use]
    pub fn key_down(&self, key: SpectrumKey) -> bool {
        let (row, bit) = key.matrix();
        self.keyboard[row] & (1 << bit) == 0
    }
}

impl Default for FakeMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine for FakeMachine {
    fn reset(&mut self) {
        self.resets += 1;
        self.memory.reset();
        self.registers = Registers::default();
        if self.reset_clears_redirect {
            self.redirect = false;
        }
        self.keyboard = [0x1F; 8];
    }

    fn set_mode_48k(&mut self, on: bool) {
        self.memory.set_mode_48k(on);
    }

    fn mode_48k(&self) -> bool {
        self.memory.mode_48k()
    }

    fn run(&mut self, budget: Option<u32>, ports: Option<&mut dyn PortSource>) {
        let redirected = self.redirect && ports.is_some();
        self.runs.push(Run { budget, redirected });
        if self.redirect
            && let Some(ports) = ports
        {
            for _ in 0..self.reads_per_frame {
                self.port_values.push(ports.read_port(FAKE_READ_PORT));
            }
        }
    }

    fn registers(&self) -> &Registers {
        &self.registers
    }

    fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    fn memory(&self) -> &Memory {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    fn io_write(&mut self, port: u16, value: u8) {
        self.io_writes.push((port, value));
        if port == 0x7FFD {
            self.memory.write_bank_register(value);
        }
    }

    fn set_port_redirect(&mut self, on: bool) {
        self.redirect = on;
    }

    fn port_redirect(&self) -> bool {
        self.redirect
    }

    fn set_fast_tape(&mut self, on: bool) {
        self.fast_tape = Some(on);
    }

    fn full_speed(&self) -> bool {
        self.full_speed
    }

    fn tape(&mut self) -> &mut dyn TapeDevice {
        &mut self.tape
    }

    fn disk(&mut self) -> &mut dyn DiskDevice {
        &mut self.disk
    }

    fn reset_sound(&mut self) {
        self.sound_resets += 1;
    }

    fn key(&mut self, event: KeyEvent) {
        let (row, bit) = event.key.matrix();
        if event.pressed {
            self.keyboard[row] &= !(1 << bit);
        } else {
            self.keyboard[row] |= 1 << bit;
        }
        self.keys.push(event);
    }

    fn joystick(&mut self, input: JoystickInput, pressed: bool) {
        self.joystick.push((input, pressed));
    }

    fn mouse(&mut self, action: MouseAction) {
        self.mouse.push(action);
    }

    /// Stands in for a RAM dump: every RAM page is filled with the first
    /// byte of `data`.
    fn load_snapshot(&mut self, kind: &str, data: &[u8]) -> bool {
        self.snapshots.push(kind.to_string());
        if self.accept_snapshots {
            let fill = data.first().copied().unwrap_or(0);
            for n in 0..8 {
                self.memory.page_mut(Page::Ram(n)).fill(fill);
            }
        }
        self.accept_snapshots
    }

    fn store_snapshot(&mut self, path: &Path) -> bool {
        self.stored.push(path.to_path_buf());
        self.accept_store
    }

    fn screen(&self) -> &[u8] {
        &self.screen
    }
}

/// Recording that returns a fixed sequence of update outcomes, then
/// `Finished`. Every frame offers the same port values.
pub struct ScriptedRecording {
    ticks: VecDeque<Result<u32, ReplayError>>,
    inputs: Vec<u8>,
    reads: usize,
}

impl ScriptedRecording {
    #[must_use]
    pub fn new(ticks: Vec<Result<u32, ReplayError>>) -> Self {
        Self {
            ticks: ticks.into(),
            inputs: Vec::new(),
            reads: 0,
        }
    }

    /// Port values each frame expects to be read, in order.
    #[must_use]
    pub fn with_inputs(mut self, inputs: &[u8]) -> Self {
        self.inputs = inputs.to_vec();
        self
    }
}

impl Recording for ScriptedRecording {
    fn update(&mut self, _host: &mut dyn SnapshotHost) -> Result<u32, ReplayError> {
        self.reads = 0;
        self.ticks.pop_front().unwrap_or(Err(ReplayError::Finished))
    }

    fn check_sync(&mut self) -> Result<(), ReplayError> {
        if self.reads == self.inputs.len() {
            Ok(())
        } else {
            Err(ReplayError::SyncLost)
        }
    }

    fn read_port(&mut self, _port: u16) -> u8 {
        let value = self.inputs.get(self.reads).copied().unwrap_or(0xFF);
        self.reads += 1;
        value
    }
}
