//! Tuning commands: config mapping, simulated hardware assembly, and output.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use eyre::WrapErr;
use fftune_config::Config;
use fftune_core::conversions::samples_from_rows;
use fftune_core::error::{Report, Result as CoreResult};
use fftune_core::{
    AccelResult, CsvLogSink, FitError, Prompt, RampResult, RampSchedule, RunParams, TestConfig,
    TuneReport, Tuner, fit_accel, fit_ramp,
};
use fftune_hardware::{PlantParams, ScriptedOperator, SimulatedDrivetrain};
use fftune_traits::clock::test_clock::TestClock;
use fftune_traits::{Clock, MonotonicClock, OperatorInput};
use serde_json::{Value, json};

use crate::console::{ConsoleOperator, ShutdownAware};

/// Options of the `run` subcommand.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub max_power: Option<f64>,
    pub distance: Option<f64>,
    pub no_intercept: bool,
    pub skip_accel: bool,
    pub interactive: bool,
    pub realtime: bool,
    pub tick_hz: Option<u32>,
    pub log_dir: Option<PathBuf>,
    pub json: bool,
}

/// Map the `[test]` section plus CLI overrides into a validated `TestConfig`.
pub fn test_config(
    cfg: &Config,
    max_power: Option<f64>,
    distance: Option<f64>,
    no_intercept: bool,
) -> CoreResult<TestConfig> {
    let base = TestConfig::try_from(&cfg.test)?;
    let base = if no_intercept {
        base.with_fit_intercept(false)
    } else {
        base
    };
    base.with_overrides(max_power, distance)
}

// Test hooks for the CLI integration tests; unset or unparsable values are ignored.
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

pub fn run_tune(cfg: &Config, opts: &RunOptions, shutdown: Arc<AtomicBool>) -> CoreResult<TuneReport> {
    if cfg.drive.run_using_encoder {
        tracing::warn!(
            "drive.run_using_encoder is set; a velocity-PID drive usually does not need feedforward tuning"
        );
    }
    let config = test_config(cfg, opts.max_power, opts.distance, opts.no_intercept)?;
    let v_max = cfg.drive.max_velocity();
    let schedule = RampSchedule::new(&config, v_max)?;

    let realtime = opts.realtime || opts.interactive;
    let clock: Arc<dyn Clock + Send + Sync> = if realtime {
        Arc::new(MonotonicClock::new())
    } else {
        Arc::new(TestClock::new())
    };

    let plant = PlantParams {
        k_v: cfg.sim.k_v,
        k_static: cfg.sim.k_static,
        k_a: cfg.sim.k_a,
    };
    let mut drive = SimulatedDrivetrain::new(plant, clock.clone());
    if let Some(n) = env_parse::<u64>("FFTUNE_TEST_SIM_FAULT_AFTER") {
        drive = drive.with_fault_after(n);
    }

    let operator: Box<dyn OperatorInput> = if opts.interactive {
        Box::new(ConsoleOperator::spawn(shutdown)?)
    } else {
        let mut script = ScriptedOperator::auto(
            clock.clone(),
            schedule.ramp_duration,
            config.fit_intercept,
            !opts.skip_accel,
        );
        if let Some(at_s) = env_parse::<f64>("FFTUNE_TEST_ABORT_AT") {
            script = script.with_abort_at(at_s);
        }
        Box::new(ShutdownAware::new(script, shutdown))
    };

    let mut params = RunParams::from(&cfg.runner);
    if let Some(hz) = opts.tick_hz {
        params.tick_hz = hz;
    }
    let log_dir = opts
        .log_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&cfg.logging.dir));

    tracing::info!(
        realtime,
        interactive = opts.interactive,
        v_max,
        log_dir = %log_dir.display(),
        "starting simulated tuning run"
    );

    let mut tuner = Tuner::builder()
        .with_drivetrain(drive)
        .with_operator(operator)
        .with_max_velocity(v_max)
        .with_config(config)
        .with_log_sink(CsvLogSink::new(log_dir))
        .with_clock(clock)
        .with_run_params(params)
        .build()?;

    if opts.interactive {
        eprintln!("keys: y = confirm, n = decline, q = abort (press Enter after each)");
    }
    let json = opts.json;
    tuner.run(|prompt| print_prompt(prompt, json))
}

fn print_prompt(prompt: &Prompt, json: bool) {
    // stdout carries only the final JSON object in JSON mode.
    if json {
        eprintln!("{prompt}");
    } else {
        println!("{prompt}");
    }
}

/// Result of an offline fit.
#[derive(Debug, Clone, Copy)]
pub struct OfflineFit {
    pub ramp: RampResult,
    pub accel: Option<AccelResult>,
    pub fit_intercept: bool,
}

fn load_samples(path: &Path) -> eyre::Result<Vec<fftune_core::Sample>> {
    let rows = fftune_config::load_samples_csv(path)?;
    samples_from_rows(&rows)
        .map_err(Report::new)
        .wrap_err_with(|| format!("samples in {}", path.display()))
}

/// Re-fit the logged ramp (and optionally accel) samples.
pub fn fit_offline(ramp: &Path, accel: Option<&Path>, fit_intercept: bool) -> eyre::Result<OfflineFit> {
    let ramp_samples = load_samples(ramp)?;
    let ramp_result = fit_ramp(&ramp_samples, fit_intercept).map_err(Report::new)?;
    tracing::info!(
        samples = ramp_samples.len(),
        k_v = ramp_result.k_v,
        k_static = ramp_result.k_static,
        r_square = ramp_result.r_square,
        "ramp fit"
    );
    let accel_result = match accel {
        Some(path) => {
            let samples = load_samples(path)?;
            let a = fit_accel(&samples, &ramp_result).map_err(Report::new)?;
            tracing::info!(samples = samples.len(), k_a = a.k_a, r_square = a.r_square, "accel fit");
            Some(a)
        }
        None => None,
    };
    Ok(OfflineFit {
        ramp: ramp_result,
        accel: accel_result,
        fit_intercept,
    })
}

fn ramp_json(r: &RampResult) -> Value {
    json!({ "k_v": r.k_v, "k_static": r.k_static, "r_square": r.r_square })
}

fn accel_json(a: &AccelResult) -> Value {
    json!({ "k_a": a.k_a, "r_square": a.r_square })
}

fn outcome_json<T>(outcome: Option<&Result<T, FitError>>, ok: impl Fn(&T) -> Value) -> Value {
    match outcome {
        Some(Ok(v)) => ok(v),
        Some(Err(e)) => json!({ "error": e.to_string() }),
        None => Value::Null,
    }
}

/// One JSON object describing a finished run.
pub fn report_json(report: &TuneReport) -> Value {
    json!({
        "timestamp": fftune_core::util::unix_millis(),
        "aborted": report.aborted,
        "fit_intercept": report.fit_intercept,
        "ramp": outcome_json(report.ramp.as_ref(), ramp_json),
        "accel": outcome_json(report.accel.as_ref(), accel_json),
        "logs": report.logs,
        "log_failures": report.log_failures.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "ticks": report.ticks,
    })
}

pub fn offline_json(fit: &OfflineFit) -> Value {
    json!({
        "fit_intercept": fit.fit_intercept,
        "ramp": ramp_json(&fit.ramp),
        "accel": fit.accel.as_ref().map(accel_json),
    })
}

pub fn offline_lines(fit: &OfflineFit) -> Vec<String> {
    let mut out = vec![fftune_core::format_ramp(&fit.ramp, fit.fit_intercept)];
    if let Some(a) = &fit.accel {
        out.push(fftune_core::format_accel(a));
    }
    out
}

pub fn schedule_json(s: &RampSchedule) -> Value {
    json!({
        "v_max": s.v_max,
        "v_final": s.v_final,
        "accel": s.accel,
        "ramp_duration": s.ramp_duration,
        "max_power": s.max_power,
        "max_power_time": s.max_power_time,
    })
}

pub fn schedule_lines(s: &RampSchedule) -> Vec<String> {
    vec![
        format!("max velocity:        {:.3}/s", s.v_max),
        format!("final ramp velocity: {:.3}/s", s.v_final),
        format!("ramp acceleration:   {:.3}/s^2", s.accel),
        format!("ramp duration:       {:.3} s", s.ramp_duration),
        format!("accel-test power:    {:.3}", s.max_power),
        format!("accel-test duration: {:.3} s", s.max_power_time),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_and_intercept_flag_apply() {
        let cfg = Config::default();
        let tc = test_config(&cfg, Some(0.5), None, true).unwrap();
        assert_eq!(tc.max_power_fraction, 0.5);
        assert_eq!(tc.target_distance, 100.0);
        assert!(!tc.fit_intercept);
        assert!(test_config(&cfg, Some(1.5), None, false).is_err());
    }

    #[test]
    fn scripted_sim_run_reports_gains() {
        let dir = tempfile::tempdir().unwrap();
        let opts = RunOptions {
            log_dir: Some(dir.path().to_path_buf()),
            ..RunOptions::default()
        };
        let report = run_tune(&Config::default(), &opts, Arc::new(AtomicBool::new(false))).unwrap();
        assert!(!report.aborted);
        let ramp = report.ramp.as_ref().unwrap().as_ref().unwrap();
        assert!((ramp.k_v - 0.0167).abs() / 0.0167 < 0.03);
        assert!(report.accel.as_ref().unwrap().is_ok());
        assert_eq!(report.logs.len(), 2);

        let v = report_json(&report);
        assert!(v["ramp"]["k_v"].as_f64().is_some());
        assert_eq!(v["aborted"], Value::Bool(false));
    }

    #[test]
    fn shutdown_flag_aborts_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let opts = RunOptions {
            log_dir: Some(dir.path().to_path_buf()),
            ..RunOptions::default()
        };
        let report = run_tune(&Config::default(), &opts, Arc::new(AtomicBool::new(true))).unwrap();
        assert!(report.aborted);
        assert!(report.ramp.is_none());
        assert!(report.logs.is_empty());
    }
}
