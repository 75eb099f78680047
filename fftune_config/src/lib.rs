#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and sample-table parsing for the feedforward tuner.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The sample CSV loader enforces headers and row ordering so logged test
//!   phases can be re-fit offline.
use serde::Deserialize;

/// Sample table schema, as written by the tuner's CSV log sink.
///
/// Expected headers:
/// time,position,power
///
/// Example:
/// time,position,power
/// 0.0,0.0,0.0
/// 0.01,0.0003,0.0147
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct SampleRow {
    pub time: f64,
    pub position: f64,
    pub power: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DriveCfg {
    /// Free speed of the drive motor.
    pub max_rpm: f64,
    /// Output (wheel) revolutions per motor revolution.
    pub gear_ratio: f64,
    /// Same linear unit as `test.distance`.
    pub wheel_radius: f64,
    /// Drive uses velocity PID; feedforward tuning is then usually unnecessary.
    pub run_using_encoder: bool,
}

impl Default for DriveCfg {
    fn default() -> Self {
        Self {
            max_rpm: 312.0,
            gear_ratio: 1.0,
            wheel_radius: 1.89,
            run_using_encoder: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TestCfg {
    /// Peak ramp power and constant accel-test power, in (0, 1].
    pub max_power: f64,
    pub distance: f64,
    /// Default kStatic answer; the operator's choice overrides it during a run.
    pub fit_intercept: bool,
}

impl Default for TestCfg {
    fn default() -> Self {
        Self {
            max_power: 0.7,
            distance: 100.0,
            fit_intercept: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RunnerCfg {
    pub tick_hz: u32,
    /// Hard cap on one run in seconds; 0 disables.
    pub timeout_s: u64,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            tick_hz: 100,
            timeout_s: 600,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Logging {
    /// Directory for per-phase CSV sample tables.
    pub dir: String,
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
            file: None,
            level: None,
            rotation: None,
        }
    }
}

/// Plant parameters for the simulated drivetrain.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimCfg {
    pub k_v: f64,
    pub k_static: f64,
    pub k_a: f64,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            k_v: 0.0167,
            k_static: 0.02,
            k_a: 0.001,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub drive: DriveCfg,
    #[serde(default)]
    pub test: TestCfg,
    #[serde(default)]
    pub runner: RunnerCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub sim: SimCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl DriveCfg {
    /// Top linear speed at full power, in `wheel_radius` units per second.
    pub fn max_velocity(&self) -> f64 {
        self.max_rpm * self.gear_ratio * 2.0 * std::f64::consts::PI * self.wheel_radius / 60.0
    }
}

pub fn load_samples_csv(path: &std::path::Path) -> eyre::Result<Vec<SampleRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open sample CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["time", "position", "power"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "sample CSV must have headers 'time,position,power', got: {}",
            actual.join(",")
        );
    }

    let mut rows: Vec<SampleRow> = Vec::new();
    for (idx, rec) in rdr.deserialize::<SampleRow>().enumerate() {
        let row = match rec {
            Ok(row) => row,
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        };
        if !(row.time.is_finite() && row.position.is_finite() && row.power.is_finite()) {
            eyre::bail!("CSV row {} has a non-finite value", idx + 2);
        }
        if let Some(prev) = rows.last()
            && row.time <= prev.time
        {
            eyre::bail!(
                "CSV row {}: time {} does not increase past {}",
                idx + 2,
                row.time,
                prev.time
            );
        }
        rows.push(row);
    }
    Ok(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Drive
        if !(self.drive.max_rpm.is_finite() && self.drive.max_rpm > 0.0) {
            eyre::bail!("drive.max_rpm must be > 0");
        }
        if !(self.drive.gear_ratio.is_finite() && self.drive.gear_ratio > 0.0) {
            eyre::bail!("drive.gear_ratio must be > 0");
        }
        if !(self.drive.wheel_radius.is_finite() && self.drive.wheel_radius > 0.0) {
            eyre::bail!("drive.wheel_radius must be > 0");
        }

        // Test
        if !(self.test.max_power > 0.0 && self.test.max_power <= 1.0) {
            eyre::bail!("test.max_power must be in (0.0, 1.0]");
        }
        if !(self.test.distance.is_finite() && self.test.distance > 0.0) {
            eyre::bail!("test.distance must be > 0");
        }

        // Runner
        if self.runner.tick_hz == 0 {
            eyre::bail!("runner.tick_hz must be > 0");
        }
        if self.runner.tick_hz > 10_000 {
            eyre::bail!("runner.tick_hz is unreasonably large (>10kHz)");
        }

        // Logging
        if self.logging.dir.trim().is_empty() {
            eyre::bail!("logging.dir must not be empty");
        }
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        // Sim
        if !(self.sim.k_v.is_finite() && self.sim.k_v > 0.0) {
            eyre::bail!("sim.k_v must be > 0");
        }
        if !(self.sim.k_static.is_finite() && (0.0..1.0).contains(&self.sim.k_static)) {
            eyre::bail!("sim.k_static must be in [0.0, 1.0)");
        }
        if !(self.sim.k_a.is_finite() && self.sim.k_a >= 0.0) {
            eyre::bail!("sim.k_a must be >= 0");
        }

        Ok(())
    }
}
