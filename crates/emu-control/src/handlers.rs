//! The file types a Spectrum controller understands out of the box.
//!
//! | Tags                | Open                                          | Store |
//! |---------------------|-----------------------------------------------|-------|
//! | `rzx`               | start a replay                                |       |
//! | `z80`, `szx`, `sna` | reset, then load the snapshot                 | `sna` |
//! | `trd`, `scl`, `fdi` | insert the disk; optionally boot it           |       |
//! | `tap`, `csw`, `tzx` | insert the tape; optionally `LOAD ""` it      |       |
//! | `ay`                | reset into the song's player                  |       |

use std::path::Path;

use log::{info, warn};

use crate::control::{Action, Control};
use crate::error::FileError;
use crate::file_type::{FileType, FileTypes, OpenFn};
use crate::machine::Machine;
use crate::macros::Macro;
use crate::memory::RomBank;
use crate::replay::RzxReplay;

/// Registry holding every built-in file type, in lookup order.
#[must_use]
pub fn standard<M: Machine>() -> FileTypes<M> {
    let mut types = FileTypes::new();
    types.register(open_only("rzx", open_replay::<M>));
    types.register(open_only("z80", open_snapshot::<M>));
    types.register(open_only("szx", open_snapshot::<M>));
    types.register(FileType {
        tag: "sna",
        open: Some(open_snapshot::<M>),
        store: Some(store_snapshot::<M>),
    });
    for tag in ["trd", "scl", "fdi"] {
        types.register(open_only(tag, open_disk::<M>));
    }
    for tag in ["tap", "csw", "tzx"] {
        types.register(open_only(tag, open_tape::<M>));
    }
    types.register(open_only("ay", open_ay::<M>));
    types
}

fn open_only<M>(tag: &'static str, open: OpenFn<M>) -> FileType<M> {
    FileType {
        tag,
        open: Some(open),
        store: None,
    }
}

fn open_replay<M: Machine>(
    control: &mut Control<M>,
    _tag: &'static str,
    data: &[u8],
) -> Result<(), FileError> {
    match RzxReplay::open(data, control) {
        Ok(replay) => {
            control.set_replay(Some(Box::new(replay)));
            Ok(())
        }
        Err(err) => {
            control.set_replay(None);
            Err(err.into())
        }
    }
}

fn open_snapshot<M: Machine>(
    control: &mut Control<M>,
    tag: &'static str,
    data: &[u8],
) -> Result<(), FileError> {
    control.on_action(Action::Reset);
    if control.machine_mut().load_snapshot(tag, data) {
        control.refresh_pokes();
        Ok(())
    } else {
        Err(FileError::Rejected(tag))
    }
}

fn store_snapshot<M: Machine>(
    control: &mut Control<M>,
    _tag: &'static str,
    path: &Path,
) -> Result<(), FileError> {
    if control.machine_mut().store_snapshot(path) {
        info!("saved snapshot to {}", path.display());
        Ok(())
    } else {
        warn!("saving snapshot to {} failed", path.display());
        Err(FileError::StoreFailed(path.to_path_buf()))
    }
}

fn open_disk<M: Machine>(
    control: &mut Control<M>,
    tag: &'static str,
    data: &[u8],
) -> Result<(), FileError> {
    let drive = control.config().drive;
    if !control.machine_mut().disk().open(tag, drive, data) {
        return Err(FileError::Rejected(tag));
    }
    if control.config().auto_play_image {
        control.on_action(Action::Reset);
        if control.machine_mut().disk().boot_exists(drive) {
            control.machine_mut().memory_mut().select_rom(RomBank::Dos);
        } else if !control.machine().mode_48k() {
            control.machine_mut().memory_mut().select_rom(RomBank::Service);
            control.play_macro(Macro::disk_boot());
        }
    }
    Ok(())
}

fn open_tape<M: Machine>(
    control: &mut Control<M>,
    tag: &'static str,
    data: &[u8],
) -> Result<(), FileError> {
    if !control.machine_mut().tape().open(tag, data) {
        return Err(FileError::Rejected(tag));
    }
    if control.config().auto_play_image {
        control.on_action(Action::Reset);
        control.machine_mut().memory_mut().select_rom(RomBank::Basic48);
        control.play_macro(Macro::tape_load());
    }
    Ok(())
}

fn open_ay<M: Machine>(
    control: &mut Control<M>,
    _tag: &'static str,
    data: &[u8],
) -> Result<(), FileError> {
    let image = format_ay::load(data)?;
    control.load_ay(&image);
    Ok(())
}
