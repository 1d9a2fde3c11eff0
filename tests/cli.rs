use assert_cmd::prelude::*;
use serde_json::Value;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn fixture(name: &str) -> String {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
        .display()
        .to_string()
}

fn resizer(config: &Path) -> Command {
    let bin = assert_cmd::cargo::cargo_bin!("iframe-resizer");
    let mut cmd = Command::new(bin);
    cmd.arg("--config").arg(config);
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let assert = cmd.assert().success();
    String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout")
}

#[test]
fn config_get_reports_defaults_without_a_file() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.yaml");

    let out = stdout_of(resizer(&config).args(["config", "get", "reacquire.max_retries"]));
    assert_eq!(out.trim(), "10");

    let out = stdout_of(resizer(&config).args(["config", "get", "hotkey.key"]));
    assert_eq!(out.trim(), "F1");
}

#[test]
fn config_set_persists_and_validates() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("nested/config.yaml");

    resizer(&config)
        .args(["config", "set", "reacquire.interval", "250ms"])
        .assert()
        .success();
    assert!(config.exists());

    let out = stdout_of(resizer(&config).args(["config", "get", "reacquire.interval"]));
    assert_eq!(out.trim(), "250ms");

    resizer(&config)
        .args(["config", "set", "reacquire.max_retries", "plenty"])
        .assert()
        .failure();
    resizer(&config).args(["config", "validate"]).assert().success();
}

#[test]
fn simulate_reports_every_step_as_json() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.yaml");

    let out = stdout_of(resizer(&config).args([
        "--output",
        "json",
        "simulate",
        &fixture("three_frames.yaml"),
    ]));
    let reports: Value = serde_json::from_str(&out).expect("json report");
    let reports = reports.as_array().expect("array of steps");
    assert_eq!(reports.len(), 7);
    assert_eq!(reports[0]["action"], "load");

    let selected = &reports[3]["record"];
    assert_eq!(selected["iframeName"], "player");
    assert_eq!(selected["selection"]["query"], "iframe[id=\"player\"]");
    assert_eq!(selected["selection"]["index"], 0);
    assert_eq!(selected["width"], 64.0);
    assert_eq!(selected["height"], 72.0);
    assert_eq!(selected["zIndex"], 13);

    let last = reports.last().unwrap();
    assert_eq!(last["action"], "open");
    assert_eq!(last["record"]["fullViewOn"], true);
    assert_eq!(last["popup"]["full_view_on"], true);
    let player = &last["frames"][1];
    assert_eq!(player["name"], "player");
    assert!(player["style"]
        .as_str()
        .expect("player styled after reload")
        .contains("position: fixed"));
}

#[test]
fn show_and_discard_use_the_session_file() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.yaml");
    let slot = dir.path().join("session.json");
    let slot_arg = slot.display().to_string();

    resizer(&config)
        .args(["simulate", &fixture("three_frames.yaml"), "--storage", &slot_arg])
        .assert()
        .success();

    let out = stdout_of(resizer(&config).args(["show", "--storage", &slot_arg]));
    assert!(out.contains("player at iframe[id=\"player\"][0]"), "{out}");
    assert!(out.contains("full view"), "{out}");

    let out = stdout_of(resizer(&config).args(["discard", "--storage", &slot_arg]));
    assert!(out.starts_with("Discarded selection"), "{out}");

    let out = stdout_of(resizer(&config).args(["--output", "json", "show", "--storage", &slot_arg]));
    assert_eq!(out.trim(), "null");
}
