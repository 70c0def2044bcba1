//! Binary-level tests for `smods-inject`.

use std::fs::{self, File};
use std::path::Path;
use std::process::{Command, Output};

use smods_core::io::bundle::{pack, unpack};
use smods_core::platform::BUNDLE_ARCHIVE;
use tempfile::{TempDir, tempdir};

fn smods_inject(args: &[&str], tmpdir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_smods-inject"))
        .args(args)
        .env("LOG_LEVEL", "warn")
        .env("SMODS_TMPDIR", tmpdir)
        .env_remove("SMODS_SEVENZIP")
        .env("NO_COLOR", "1")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// A `game.lua` whose start-up block matches the bundled 1.0.1o-FULL patch.
fn supported_game() -> String {
    let mut game: String = (1..=202).map(|n| format!("-- line {n}\n")).collect();
    game.push_str(concat!(
        "    self.SETTINGS.language = self.SETTINGS.language or 'en-us'\n",
        "    boot_timer('prep stage', 'splash prep',1)\n",
        "    self:splash_screen()\n",
        "    boot_timer('splash prep', 'end',1)\n",
        "\n",
        "    self.F_NO_SAVING = nil\n",
        "end\n",
    ));
    game
}

fn make_bundle(dir: &Path, version: &str) -> std::path::PathBuf {
    let staging = TempDir::new_in(dir).unwrap();
    fs::write(staging.path().join("main.lua"), "require 'game'\n").unwrap();
    fs::write(staging.path().join("game.lua"), supported_game()).unwrap();
    fs::write(staging.path().join("version.jkr"), version).unwrap();

    let app = dir.join("Balatro.app");
    let love = app.join(BUNDLE_ARCHIVE);
    fs::create_dir_all(love.parent().unwrap()).unwrap();
    pack(staging.path(), File::create(&love).unwrap()).unwrap();
    app
}

#[test]
fn no_arguments_prints_help() {
    let scratch = tempdir().unwrap();
    let output = smods_inject(&[], scratch.path());

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Usage"), "{out}");
    assert!(out.contains("inject"), "{out}");
}

#[test]
fn missing_path_fails() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("Balatro.exe");

    let output = smods_inject(&["inject", missing.to_str().unwrap()], dir.path());

    assert!(!output.status.success());
    assert!(stderr(&output).contains("does not exist"), "{}", stderr(&output));
}

#[test]
fn plain_directory_is_rejected() {
    let dir = tempdir().unwrap();
    let output = smods_inject(&[dir.path().to_str().unwrap()], dir.path());

    assert!(!output.status.success());
    assert!(stderr(&output).contains("not a Balatro app bundle"));
}

#[test]
fn alias_injects_bundle() {
    let dir = tempdir().unwrap();
    let scratch = tempdir().unwrap();
    let app = make_bundle(dir.path(), "1.0.1o-FULL\n");

    let output = smods_inject(&["i", app.to_str().unwrap()], scratch.path());

    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("Successfully injected mod loader into"));
    assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);

    let out = tempdir().unwrap();
    unpack(File::open(app.join(BUNDLE_ARCHIVE)).unwrap(), out.path()).unwrap();
    let game = fs::read_to_string(out.path().join("game.lua")).unwrap();
    assert_eq!(game.lines().nth(205), Some("    initSteamodded()"));
}

#[test]
fn second_run_hints_already_patched() {
    let dir = tempdir().unwrap();
    let scratch = tempdir().unwrap();
    let app = make_bundle(dir.path(), "1.0.1o-FULL\n");
    let app = app.to_str().unwrap();

    assert!(smods_inject(&[app], scratch.path()).status.success());
    let output = smods_inject(&[app], scratch.path());

    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("already patched"), "{err}");
}

#[test]
fn unsupported_version_hints_newer_release() {
    let dir = tempdir().unwrap();
    let scratch = tempdir().unwrap();
    let app = make_bundle(dir.path(), "1.2.3\n");

    let output = smods_inject(&[app.to_str().unwrap()], scratch.path());

    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("1.2.3"), "{err}");
    assert!(err.contains("newer release"), "{err}");
    assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
}
