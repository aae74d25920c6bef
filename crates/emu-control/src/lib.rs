//! Content loading and run-loop control for a 128K Spectrum emulator.
//!
//! This crate sits between a host frontend and the emulated machine. It
//! turns files (snapshots, tapes, disks, AY music, RZX recordings) into
//! machine state, drives the machine once per host frame, plays back input
//! recordings in lockstep with it, and types keystrokes on the machine's
//! behalf to start what was loaded.
//!
//! The machine itself (CPU, ULA, sound, tape and disk hardware, snapshot
//! formats) is reached through the [`Machine`] trait.

mod config;
mod control;
mod error;
mod file_type;
mod handlers;
pub mod input;
mod machine;
mod macros;
mod memory;
mod pokes;
mod registers;
pub mod replay;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::{ControlConfig, JoystickMode};
pub use control::{Action, ActionResult, Control};
pub use error::FileError;
pub use file_type::{FileType, FileTypes, OpenFn, StoreFn, extension};
pub use handlers::standard as standard_file_types;
pub use input::{KeyEvent, KeyFlags, MouseAction, SpectrumKey};
pub use machine::{DiskDevice, Machine, PortSource, TapeDevice};
pub use macros::{Macro, MacroAction};
pub use memory::{Memory, PAGE_SIZE, Page, RomBank};
pub use pokes::PatchOverlay;
pub use registers::{RegisterSet, Registers};
pub use replay::{Recording, ReplayError, ReplaySession, RzxReplay, SnapshotHost};
