//! The emulated machine as the controller sees it.
//!
//! CPU execution, the ULA, sound, tape and disk hardware and snapshot
//! formats all live behind [`Machine`]. The controller only sequences them.

use std::path::Path;

use crate::input::{JoystickInput, KeyEvent, MouseAction};
use crate::memory::Memory;
use crate::registers::Registers;

/// Supplier of values for CPU port reads.
pub trait PortSource {
    fn read_port(&mut self, port: u16) -> u8;
}

/// Tape deck.
pub trait TapeDevice {
    /// Insert a tape image of the given kind (`"tap"`, `"csw"`, `"tzx"`).
    fn open(&mut self, kind: &str, data: &[u8]) -> bool;
    fn inserted(&self) -> bool;
    fn started(&self) -> bool;
    fn start(&mut self);
    fn stop(&mut self);
}

/// Floppy controller.
pub trait DiskDevice {
    /// Insert a disk image of the given kind (`"trd"`, `"scl"`, `"fdi"`).
    fn open(&mut self, kind: &str, drive: u8, data: &[u8]) -> bool;
    /// Whether the disk in `drive` carries a TR-DOS `boot` file.
    fn boot_exists(&self, drive: u8) -> bool;
}

/// A 128K-class Spectrum.
pub trait Machine {
    /// Reset the CPU and devices. Clears RAM and any port redirection.
    fn reset(&mut self);

    fn set_mode_48k(&mut self, on: bool);
    fn mode_48k(&self) -> bool;

    /// Run one frame, or exactly `budget` instructions when given.
    ///
    /// While port redirection is on, CPU port reads are answered by
    /// `ports` instead of the live devices.
    fn run(&mut self, budget: Option<u32>, ports: Option<&mut dyn PortSource>);

    fn registers(&self) -> &Registers;
    fn registers_mut(&mut self) -> &mut Registers;

    fn memory(&self) -> &Memory;
    fn memory_mut(&mut self) -> &mut Memory;

    /// CPU-style port write (paging latch, sound chip, border).
    fn io_write(&mut self, port: u16, value: u8);

    /// Route port reads to the source passed to [`Machine::run`].
    fn set_port_redirect(&mut self, on: bool);
    fn port_redirect(&self) -> bool;

    /// Enable or disable the fast-tape CPU stepping mode.
    fn set_fast_tape(&mut self, on: bool);
    /// Whether the machine is running unthrottled.
    fn full_speed(&self) -> bool;

    fn tape(&mut self) -> &mut dyn TapeDevice;
    fn disk(&mut self) -> &mut dyn DiskDevice;
    fn reset_sound(&mut self);

    fn key(&mut self, event: KeyEvent);
    fn joystick(&mut self, input: JoystickInput, pressed: bool);
    fn mouse(&mut self, action: MouseAction);

    /// Load a snapshot of the given kind (`"z80"`, `"szx"`, `"sna"`).
    fn load_snapshot(&mut self, kind: &str, data: &[u8]) -> bool;
    /// Write the current state as a snapshot file.
    fn store_snapshot(&mut self, path: &Path) -> bool;

    /// Current video frame.
    fn screen(&self) -> &[u8];
}
