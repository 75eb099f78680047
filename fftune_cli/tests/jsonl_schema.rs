use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[runner]
tick_hz = 100
timeout_s = 60
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn json_line(stdout: &[u8], key: &str) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(stdout);
    let line = stdout
        .lines()
        .find(|l| l.starts_with('{') && l.contains(key))
        .unwrap_or("")
        .to_string();
    assert!(
        !line.is_empty(),
        "no JSON line with {key} found; stdout was: {stdout}"
    );
    serde_json::from_str(&line).expect("valid JSON")
}

fn run_cmd(dir: &tempfile::TempDir, cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("fftune_cli").unwrap();
    cmd.env_remove("FFTUNE_TEST_ABORT_AT")
        .env_remove("FFTUNE_TEST_SIM_FAULT_AFTER")
        .arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(cfg)
        .arg("run")
        .arg("--log-dir")
        .arg(dir.path().join("logs"));
    cmd
}

/// Validate the JSON schema for a completed run.
#[rstest]
fn json_success_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = run_cmd(&dir, &cfg).assert().success().get_output().stdout.clone();
    let v = json_line(&out, "\"ramp\"");

    assert!(v.get("timestamp").and_then(|x| x.as_u64()).is_some());
    assert!(v.get("ticks").and_then(|x| x.as_u64()).is_some());
    assert_eq!(v.get("aborted").and_then(|x| x.as_bool()), Some(false));
    assert_eq!(v.get("fit_intercept").and_then(|x| x.as_bool()), Some(true));

    for key in ["k_v", "k_static", "r_square"] {
        assert!(v["ramp"][key].as_f64().is_some(), "ramp.{key} should be a number");
    }
    for key in ["k_a", "r_square"] {
        assert!(v["accel"][key].as_f64().is_some(), "accel.{key} should be a number");
    }
    let k_v = v["ramp"]["k_v"].as_f64().unwrap();
    assert!((k_v - 0.0167).abs() / 0.0167 < 0.03, "k_v = {k_v}");

    assert_eq!(v["logs"].as_array().map(Vec::len), Some(2));
    assert_eq!(v["log_failures"].as_array().map(Vec::len), Some(0));
}

/// An aborted run still prints one JSON object, with null results.
#[rstest]
fn json_abort_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = run_cmd(&dir, &cfg)
        .env("FFTUNE_TEST_ABORT_AT", "2.0")
        .assert()
        .code(4)
        .get_output()
        .stdout
        .clone();
    let v = json_line(&out, "\"aborted\"");

    assert_eq!(v.get("aborted").and_then(|x| x.as_bool()), Some(true));
    assert!(v.get("ramp").unwrap().is_null());
    assert!(v.get("accel").unwrap().is_null());
}
