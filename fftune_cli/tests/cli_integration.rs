use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

// Minimal valid config; the sim plant uses its defaults.
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[drive]
max_rpm = 312.0
gear_ratio = 1.0
wheel_radius = 1.89

[test]
max_power = 0.7
distance = 100.0

[runner]
tick_hz = 100
# Simulated time; a full scripted run takes about 11 s.
timeout_s = 60
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn fftune(cfg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("fftune_cli").unwrap();
    cmd.env_remove("FFTUNE_TEST_ABORT_AT")
        .env_remove("FFTUNE_TEST_SIM_FAULT_AFTER")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(cfg);
    cmd
}

fn find_log(dir: &Path, prefix: &str) -> PathBuf {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix))
        })
        .unwrap_or_else(|| panic!("no {prefix} log in {}", dir.display()))
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "OK", "stdout")]
#[case(&["schedule"], 0, "ramp duration:       4.627 s", "stdout")]
#[case(&["schedule", "--max-power", "1.5"], 1, "max_power_fraction must be in (0, 1]", "stderr")]
#[case(&["fit"], 2, "required", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = fftune(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn cli_rejects_invalid_config() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, "[drive]\nmax_rpm = -1.0\n").unwrap();

    fftune(&cfg)
        .arg("self-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("drive.max_rpm must be > 0"));
}

#[rstest]
fn run_logs_samples_that_refit_offline() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let logs = dir.path().join("logs");

    fftune(&cfg)
        .arg("run")
        .arg("--log-dir")
        .arg(&logs)
        .assert()
        .success()
        .stdout(predicate::str::contains("kV = "))
        .stdout(predicate::str::contains("kA = "))
        .stdout(predicate::str::contains("Tuning complete"));

    let ramp = find_log(&logs, "DriveRampRegression-");
    let accel = find_log(&logs, "DriveAccelRegression-");

    fftune(&cfg)
        .arg("fit")
        .arg("--ramp")
        .arg(&ramp)
        .arg("--accel")
        .arg(&accel)
        .assert()
        .success()
        .stdout(predicate::str::contains("kV = "))
        .stdout(predicate::str::contains("kStatic = "))
        .stdout(predicate::str::contains("kA = "));
}

#[rstest]
fn skip_accel_reports_ramp_only() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    fftune(&cfg)
        .arg("run")
        .arg("--skip-accel")
        .arg("--no-intercept")
        .arg("--log-dir")
        .arg(dir.path().join("logs"))
        .assert()
        .success()
        .stdout(predicate::str::contains("kStatic = ").not())
        .stdout(predicate::str::contains("kA = ").not());
}

#[rstest]
#[case("3.0")]
#[case("7.0")]
fn abort_exits_with_code_4(#[case] at_s: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    fftune(&cfg)
        .env("FFTUNE_TEST_ABORT_AT", at_s)
        .arg("run")
        .arg("--log-dir")
        .arg(dir.path().join("logs"))
        .assert()
        .code(4)
        .stdout(predicate::str::contains("aborted: no result"));
}

#[rstest]
fn cli_reports_bad_sample_header() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let bad_csv = dir.path().join("ramp.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "t,x,p").unwrap();
    writeln!(f, "0.0,0.0,0.0").unwrap();
    writeln!(f, "0.01,0.0,0.01").unwrap();

    fftune(&cfg)
        .arg("fit")
        .arg("--ramp")
        .arg(&bad_csv)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid headers"));
}

#[rstest]
fn fit_of_a_short_log_exits_with_code_3() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let csv = dir.path().join("ramp.csv");
    fs::write(&csv, "time,position,power\n0.0,0.0,0.0\n").unwrap();

    fftune(&cfg)
        .arg("fit")
        .arg("--ramp")
        .arg(&csv)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Not enough samples"));
}
