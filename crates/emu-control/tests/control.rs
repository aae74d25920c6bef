//! Resets, actions, key routing, macros and file dispatch.

use std::path::Path;

use emu_control::testing::FakeMachine;
use emu_control::{
    Action, ActionResult, Control, ControlConfig, FileError, JoystickMode, KeyFlags, Machine,
    MouseAction, RomBank, SpectrumKey,
};

fn control() -> Control<FakeMachine> {
    Control::new(FakeMachine::new(), ControlConfig::default())
}

fn control_with(config: ControlConfig) -> Control<FakeMachine> {
    Control::new(FakeMachine::new(), config)
}

fn run_frames(c: &mut Control<FakeMachine>, n: usize) {
    for _ in 0..n {
        c.on_loop();
    }
}

// --- Reset ---

#[test]
fn new_resets_into_menu_rom() {
    let c = control();
    assert_eq!(c.machine().resets, 1);
    assert_eq!(c.machine().memory().rom_bank(), RomBank::Menu128);
}

#[test]
fn reset_honours_service_rom_and_48k() {
    let c = control_with(ControlConfig {
        reset_to_service_rom: true,
        ..ControlConfig::default()
    });
    assert_eq!(c.machine().memory().rom_bank(), RomBank::Service);

    let mut c = control_with(ControlConfig {
        mode_48k: true,
        reset_to_service_rom: true,
        ..ControlConfig::default()
    });
    assert!(c.machine().mode_48k());
    assert_eq!(c.machine().memory().rom_bank(), RomBank::Basic48);

    c.config_mut().mode_48k = false;
    assert_eq!(c.on_action(Action::Reset), ActionResult::Ok);
    assert!(!c.machine().mode_48k());
    assert_eq!(c.machine().memory().rom_bank(), RomBank::Service);
}

#[test]
fn pokes_survive_reset() {
    let mut c = control();
    c.poke(0x8000, 0xAA);
    c.poke(0x8001, 0xBB);
    c.on_action(Action::Reset);
    assert_eq!(c.machine().memory().read(0x8000), 0xAA);
    assert_eq!(c.machine().memory().read(0x8001), 0xBB);

    c.poke(0x8000, 0xCC);
    c.on_action(Action::Reset);
    assert_eq!(c.machine().memory().read(0x8000), 0xCC);
    assert_eq!(c.machine().memory().read(0x8001), 0xBB);
    assert_eq!(c.pokes().len(), 2);
}

#[test]
fn pokes_survive_snapshot_load() {
    let mut c = control();
    c.poke(0xC000, 0x42);
    c.open_file("game.z80", &[0x5A; 16]).expect("snapshot opens");
    assert_eq!(c.machine().memory().read(0xC000), 0x42);
    assert_eq!(c.machine().memory().read(0xC001), 0x5A);
}

// --- Actions ---

#[test]
fn tape_actions_without_tape() {
    let mut c = control();
    assert_eq!(c.on_action(Action::TapeToggle), ActionResult::TapeNotInserted);
    assert_eq!(c.on_action(Action::TapeQuery), ActionResult::TapeNotInserted);
    assert_eq!(c.machine().fast_tape, None);
}

#[test]
fn tape_toggle_starts_and_stops() {
    let mut c = control_with(ControlConfig {
        auto_play_image: false,
        fast_tape: false,
        ..ControlConfig::default()
    });
    c.open_file("game.tap", &[0; 4]).expect("tape opens");
    assert!(!c.macro_active());
    assert_eq!(c.on_action(Action::TapeQuery), ActionResult::TapeStopped);

    assert_eq!(c.on_action(Action::TapeToggle), ActionResult::TapeStarted);
    assert_eq!(c.machine().fast_tape, Some(false));
    assert_eq!(c.on_action(Action::TapeQuery), ActionResult::TapeStarted);
    assert_eq!(c.on_action(Action::TapeToggle), ActionResult::TapeStopped);
}

#[test]
fn named_actions() {
    let mut c = control();
    assert_eq!(c.on_action_named("reset"), ActionResult::Ok);
    assert_eq!(c.machine().resets, 2);
    assert_eq!(c.on_action_named("tape_query"), ActionResult::TapeNotInserted);
    assert_eq!(c.on_action_named("eject"), ActionResult::Error);
}

// --- Frame loop ---

#[test]
fn paused_video_skips_frames_unless_full_speed() {
    let mut c = control();
    c.video_paused(true);
    c.video_paused(true);
    c.on_loop();
    c.video_paused(false);
    c.on_loop();
    assert!(c.machine().runs.is_empty());

    c.machine_mut().full_speed = true;
    c.on_loop();
    assert_eq!(c.machine().runs.len(), 1);

    c.machine_mut().full_speed = false;
    c.video_paused(false);
    c.on_loop();
    assert_eq!(c.machine().runs.len(), 2);
}

#[test]
fn screen_comes_from_machine() {
    let c = control();
    assert_eq!(c.screen().len(), 6912);
}

// --- Keys ---

#[test]
fn ui_focus_swallows_host_keys() {
    let mut c = control();
    c.set_ui_focused(true);
    c.on_key('A', KeyFlags::DOWN);
    assert!(c.machine().keys.is_empty());

    c.on_key('A', KeyFlags::DOWN | KeyFlags::UI_SENDER);
    assert!(c.machine().key_down(SpectrumKey::A));

    c.set_ui_focused(false);
    c.on_key('A', KeyFlags::empty());
    assert!(!c.machine().key_down(SpectrumKey::A));
}

#[test]
fn key_modifiers_are_forwarded() {
    let mut c = control();
    c.on_key('P', KeyFlags::DOWN | KeyFlags::ALT);
    let event = c.machine().keys[0];
    assert_eq!(event.key, SpectrumKey::P);
    assert!(event.pressed);
    assert!(event.alt);
    assert!(!event.shift);
}

#[test]
fn unknown_key_codes_are_ignored() {
    let mut c = control();
    c.on_key('#', KeyFlags::DOWN);
    assert!(c.machine().keys.is_empty());
}

#[test]
fn kempston_codes_drive_joystick() {
    let mut c = control();
    let flags = c.joystick_flags();
    assert_eq!(flags, KeyFlags::KEMPSTON);
    c.on_key('f', KeyFlags::DOWN | flags);
    c.on_key('f', flags);
    assert_eq!(
        c.machine().joystick,
        vec![
            (emu_control::input::JoystickInput::Fire, true),
            (emu_control::input::JoystickInput::Fire, false),
        ]
    );
    assert!(c.machine().keys.is_empty());
}

#[test]
fn cursor_joystick_types_shifted_digits() {
    let mut c = control_with(ControlConfig {
        joystick: JoystickMode::Cursor,
        ..ControlConfig::default()
    });
    let flags = c.joystick_flags();
    c.on_key('l', KeyFlags::DOWN | flags);
    let event = c.machine().keys[0];
    assert_eq!(event.key, SpectrumKey::N5);
    assert!(event.shift);
    assert!(c.machine().joystick.is_empty());

    c.on_key('f', KeyFlags::DOWN | flags);
    let event = c.machine().keys[1];
    assert_eq!(event.key, SpectrumKey::N0);
    assert!(!event.shift);
}

#[test]
fn mouse_is_forwarded() {
    let mut c = control();
    c.on_mouse(MouseAction::Move { dx: 3, dy: 0xFE });
    assert_eq!(c.machine().mouse, vec![MouseAction::Move { dx: 3, dy: 0xFE }]);
}

// --- Tape and disk auto-start ---

#[test]
fn tape_auto_load_types_load_and_starts_tape() {
    let mut c = control();
    c.open_file("games/Manic Miner.tzx", &[0; 4]).expect("tape opens");
    assert_eq!(c.machine().tape.opened, vec!["tzx"]);
    assert_eq!(c.machine().memory().rom_bank(), RomBank::Basic48);
    assert!(c.macro_active());

    run_frames(&mut c, 101);
    assert!(c.machine().key_down(SpectrumKey::J));

    run_frames(&mut c, 22);
    assert!(!c.macro_active());
    assert!(c.machine().tape.started);
    assert_eq!(c.machine().fast_tape, Some(true));

    let typed: Vec<_> = c
        .machine()
        .keys
        .iter()
        .filter(|k| k.pressed)
        .map(|k| (k.key, k.alt))
        .collect();
    assert_eq!(
        typed,
        vec![
            (SpectrumKey::J, false),
            (SpectrumKey::P, true),
            (SpectrumKey::P, true),
            (SpectrumKey::Enter, false),
        ]
    );
    assert!(!c.machine().key_down(SpectrumKey::Enter));
}

#[test]
fn macro_keys_pass_ui_focus() {
    let mut c = control();
    c.set_ui_focused(true);
    c.open_file("game.tap", &[0; 4]).expect("tape opens");
    run_frames(&mut c, 101);
    assert!(c.machine().key_down(SpectrumKey::J));
}

#[test]
fn reset_cancels_macro() {
    let mut c = control();
    c.open_file("game.tap", &[0; 4]).expect("tape opens");
    run_frames(&mut c, 50);
    c.on_action(Action::Reset);
    assert!(!c.macro_active());
    run_frames(&mut c, 100);
    assert!(c.machine().keys.is_empty());
}

#[test]
fn rejected_tape() {
    let mut c = control();
    c.machine_mut().tape.accept = false;
    let err = c.open_file("game.csw", &[0; 4]).unwrap_err();
    assert!(matches!(err, FileError::Rejected("csw")));
    assert!(!c.macro_active());
    assert_eq!(c.machine().resets, 1);
}

#[test]
fn disk_with_boot_file_uses_dos_rom() {
    let mut c = control_with(ControlConfig {
        drive: 1,
        ..ControlConfig::default()
    });
    c.machine_mut().disk.boot = true;
    c.open_file("demo.trd", &[0; 4]).expect("disk opens");
    assert_eq!(c.machine().disk.opened, vec![("trd".to_string(), 1)]);
    assert_eq!(c.machine().memory().rom_bank(), RomBank::Dos);
    assert!(!c.macro_active());
}

#[test]
fn disk_without_boot_file_presses_enter_twice() {
    let mut c = control();
    c.open_file("demo.scl", &[0; 4]).expect("disk opens");
    assert_eq!(c.machine().memory().rom_bank(), RomBank::Service);
    assert!(c.macro_active());

    run_frames(&mut c, 203);
    assert!(!c.macro_active());
    let enters: Vec<bool> = c
        .machine()
        .keys
        .iter()
        .filter(|k| k.key == SpectrumKey::Enter)
        .map(|k| k.pressed)
        .collect();
    assert_eq!(enters, vec![true, false, true, false]);
}

#[test]
fn disk_in_48k_mode_is_only_inserted() {
    let mut c = control_with(ControlConfig {
        mode_48k: true,
        ..ControlConfig::default()
    });
    c.open_file("demo.fdi", &[0; 4]).expect("disk opens");
    assert_eq!(c.machine().memory().rom_bank(), RomBank::Basic48);
    assert!(!c.macro_active());
}

#[test]
fn disk_without_auto_play_keeps_running() {
    let mut c = control_with(ControlConfig {
        auto_play_image: false,
        ..ControlConfig::default()
    });
    c.open_file("demo.trd", &[0; 4]).expect("disk opens");
    assert_eq!(c.machine().resets, 1);
    assert!(!c.macro_active());
}

// --- Snapshots and registry ---

#[test]
fn snapshot_open_resets_then_loads() {
    let mut c = control();
    c.open_file("dir.v2/game.szx", &[0; 16]).expect("snapshot opens");
    assert_eq!(c.machine().resets, 2);
    assert_eq!(c.machine().snapshots, vec!["szx"]);
    assert_eq!(c.last_file(), Some("dir.v2/game.szx"));

    c.machine_mut().accept_snapshots = false;
    let err = c.open_file("game.sna", &[0; 16]).unwrap_err();
    assert!(matches!(err, FileError::Rejected("sna")));
}

#[test]
fn unknown_extension() {
    let mut c = control();
    assert!(!c.file_type_supported("game.zxk"));
    assert!(!c.file_type_supported("game.TAP"));
    assert!(!c.file_type_supported("README"));
    assert!(c.file_type_supported("/tmp/a.b/game.tap"));

    let err = c.open_file("game.zxk", &[]).unwrap_err();
    assert!(matches!(err, FileError::UnknownType(name) if name == "game.zxk"));
    assert_eq!(c.last_file(), Some("game.zxk"));
    assert_eq!(c.machine().resets, 1);
}

#[test]
fn standard_registry_order() {
    let c = control();
    let tags: Vec<_> = c.file_types().iter().map(|t| t.tag).collect();
    assert_eq!(
        tags,
        vec![
            "rzx", "z80", "szx", "sna", "trd", "scl", "fdi", "tap", "csw", "tzx", "ay"
        ]
    );
}

#[test]
fn saving_snapshots() {
    let mut c = control();
    c.save_file(Path::new("out/state.sna")).expect("sna stores");
    assert_eq!(c.machine().stored, vec![Path::new("out/state.sna")]);

    let err = c.save_file(Path::new("state.z80")).unwrap_err();
    assert!(matches!(err, FileError::CannotStore("z80")));

    let err = c.save_file(Path::new("state.png")).unwrap_err();
    assert!(matches!(err, FileError::UnknownType(_)));

    c.machine_mut().accept_store = false;
    let err = c.save_file(Path::new("state.sna")).unwrap_err();
    assert!(matches!(err, FileError::StoreFailed(_)));
    assert_eq!(c.last_file(), Some("state.sna"));
}

#[test]
fn open_path_reads_the_file() {
    let path = std::env::temp_dir().join(format!("emu-control-{}.sna", std::process::id()));
    std::fs::write(&path, [0u8; 27]).expect("temp file written");
    let mut c = control();
    let result = c.open_path(&path);
    std::fs::remove_file(&path).ok();
    result.expect("snapshot opens");
    assert_eq!(c.machine().snapshots, vec!["sna"]);
}

#[test]
fn open_path_errors() {
    let mut c = control();
    let err = c
        .open_path(Path::new("/nonexistent/emu-control/game.tap"))
        .unwrap_err();
    assert!(matches!(err, FileError::Io { .. }));

    let err = c.open_path(Path::new("/nonexistent/notes.txt")).unwrap_err();
    assert!(matches!(err, FileError::UnknownType(_)));
}

#[test]
fn into_machine_returns_state() {
    let mut c = control();
    c.poke(0x9000, 7);
    let machine = c.into_machine();
    assert_eq!(machine.memory().read(0x9000), 7);
}
