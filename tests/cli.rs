//! Integration tests for the `worktrack` binary.
//!
//! Each test points `XDG_CONFIG_HOME` at its own temp dir so the user's real
//! configuration is never read or written.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const WORKTRACK_BIN: &str = env!("CARGO_BIN_EXE_worktrack");

fn worktrack(config_home: &TempDir) -> Command {
    let mut cmd = Command::new(WORKTRACK_BIN);
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env_remove("WORKTRACK_LOG");
    cmd
}

fn temp_home() -> TempDir {
    tempfile::tempdir().expect("failed to create temp dir")
}

// =========================================================================
// config
// =========================================================================

#[test]
fn test_config_path_uses_xdg_config_home() {
    let home = temp_home();
    let expected = home.path().join("worktrack").join("config.toml");
    worktrack(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            expected.to_str().expect("valid path"),
        ));
}

#[test]
fn test_config_init_then_refuses_without_force() {
    let home = temp_home();
    worktrack(&home)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration"));
    assert!(home.path().join("worktrack/config.toml").exists());

    worktrack(&home)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    worktrack(&home)
        .args(["config", "init", "--force"])
        .assert()
        .success();
    assert!(home.path().join("worktrack/config.toml.backup").exists());
}

#[test]
fn test_config_validate_accepts_missing_file() {
    let home = temp_home();
    worktrack(&home)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn test_config_validate_rejects_zero_interval() {
    let home = temp_home();
    let dir = home.path().join("worktrack");
    fs::create_dir_all(&dir).expect("create config dir");
    fs::write(
        dir.join("config.toml"),
        "[polling]\nstatus_interval = \"0s\"\n",
    )
    .expect("write config");

    worktrack(&home)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("polling.status_interval"));
}

#[test]
fn test_config_validate_reports_parse_position() {
    let home = temp_home();
    let dir = home.path().join("worktrack");
    fs::create_dir_all(&dir).expect("create config dir");
    fs::write(dir.join("config.toml"), "[polling]\nstatus_interval = \n").expect("write config");

    worktrack(&home)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration at"));
}

// =========================================================================
// run
// =========================================================================

#[test]
fn test_run_stop_with_entered_title() {
    let home = temp_home();
    worktrack(&home)
        .arg("run")
        .write_stdin("start\nstop\nFix login bug\nstatus\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Started"))
        .stdout(predicate::str::contains("Title for \"General Work\""))
        .stdout(predicate::str::contains("Saved \"Fix login bug\""))
        .stdout(predicate::str::contains("State:        stopped"));
}

#[test]
fn test_run_blank_title_uses_generated_default() {
    let home = temp_home();
    worktrack(&home)
        .arg("run")
        .write_stdin("start\nstop\n\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved \"Work Session - "));
}

#[test]
fn test_run_cancel_keeps_tracking() {
    let home = temp_home();
    worktrack(&home)
        .arg("run")
        .write_stdin("start\nstop\n:cancel\nstatus\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Save cancelled, tracking resumed"))
        .stdout(predicate::str::contains("State:        running"));
}

#[test]
fn test_run_manual_task_stops_without_prompt() {
    let home = temp_home();
    worktrack(&home)
        .args(["run", "--task", "Write report"])
        .write_stdin("tasks\nstart 1\nstop\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Write report"))
        .stdout(predicate::str::contains("Saved \"Write report\""))
        .stdout(predicate::str::contains("Title for").not());
}

#[test]
fn test_run_guards_invalid_commands() {
    let home = temp_home();
    worktrack(&home)
        .arg("run")
        .write_stdin("pause\nstart abc\ndance\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to do: session is not running"))
        .stderr(predicate::str::contains("task id must be a number"))
        .stderr(predicate::str::contains("Unknown command: dance"));
}

#[test]
fn test_run_capture_counts_screenshot() {
    let home = temp_home();
    worktrack(&home)
        .arg("run")
        .write_stdin("start\ncapture\nstatus\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Screenshots:  1"));
}

#[test]
fn test_run_exits_on_end_of_input() {
    let home = temp_home();
    worktrack(&home)
        .arg("run")
        .write_stdin("start\n")
        .assert()
        .success();
}

#[test]
fn test_run_rejects_invalid_config_file() {
    let home = temp_home();
    let path = home.path().join("custom.toml");
    fs::write(&path, "[tracking]\nscreenshot_interval = \"soon\"\n").expect("write config");

    worktrack(&home)
        .args(["run", "--config", path.to_str().expect("valid path")])
        .write_stdin("quit\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("tracking.screenshot_interval"));
}
