//! End-to-end runs against the simulated drivetrain on a deterministic clock.

use std::sync::Arc;
use std::time::Duration;

use fftune_core::mocks::{FailingSink, MemorySink};
use fftune_core::runner::{RunParams, run};
use fftune_core::{CsvLogSink, Prompt, TestConfig, Tuner, TunerError, TunerState};
use fftune_hardware::{PlantParams, ScriptedOperator, SimulatedDrivetrain};
use fftune_traits::clock::test_clock::TestClock;
use rstest::rstest;

const V_MAX: f64 = 60.0;

fn plant() -> PlantParams {
    PlantParams {
        k_v: 0.0167,
        k_static: 0.02,
        k_a: 0.001,
    }
}

fn params() -> RunParams {
    RunParams {
        tick_hz: 100,
        timeout: Some(Duration::from_secs(60)),
    }
}

fn rig(
    fit_intercept: bool,
    run_accel: bool,
) -> (Arc<TestClock>, SimulatedDrivetrain, ScriptedOperator, TunerState) {
    let clock = Arc::new(TestClock::new());
    let state = TunerState::new(TestConfig::default(), V_MAX).unwrap();
    let drive = SimulatedDrivetrain::new(plant(), clock.clone());
    let operator = ScriptedOperator::auto(
        clock.clone(),
        state.schedule().ramp_duration,
        fit_intercept,
        run_accel,
    );
    (clock, drive, operator, state)
}

#[test]
fn full_routine_recovers_plant_gains() {
    let (clock, mut drive, mut operator, state) = rig(true, true);
    let mut sink = MemorySink::default();
    let mut prompts = Vec::new();
    let report = run(
        &mut drive,
        &mut operator,
        &mut sink,
        clock.as_ref(),
        state,
        &params(),
        |p| prompts.push(p.clone()),
    )
    .unwrap();

    assert!(!report.aborted);
    let ramp = report.ramp.clone().unwrap().unwrap();
    let p = plant();
    assert!((ramp.k_v - p.k_v).abs() / p.k_v < 0.03, "k_v = {}", ramp.k_v);
    // Plant lag reads as extra static friction on a ramp.
    assert!(ramp.k_static > 0.015 && ramp.k_static < 0.04, "k_static = {}", ramp.k_static);
    assert!(ramp.r_square > 0.99, "r_square = {}", ramp.r_square);

    let accel = report.accel.clone().unwrap().unwrap();
    assert!((accel.k_a - p.k_a).abs() / p.k_a < 0.15, "k_a = {}", accel.k_a);
    assert!(accel.r_square > 0.9, "r_square = {}", accel.r_square);

    assert_eq!(sink.tables.len(), 2);
    assert!(sink.tables[0].0.starts_with("DriveRampRegression-"));
    assert!(sink.tables[1].0.starts_with("DriveAccelRegression-"));
    assert_eq!(report.logs.len(), 2);
    assert!(report.log_failures.is_empty());
    assert_eq!(drive.power(), 0.0);
    assert!(drive.pose_updates() > 0);
    assert_eq!(prompts.first(), Some(&Prompt::PressStart));
    assert_eq!(prompts.last(), Some(&Prompt::Finished));
}

#[test]
fn declined_intercept_reports_kv_only() {
    let (clock, mut drive, mut operator, state) = rig(false, false);
    let mut sink = MemorySink::default();
    let report = run(
        &mut drive,
        &mut operator,
        &mut sink,
        clock.as_ref(),
        state,
        &params(),
        |_| {},
    )
    .unwrap();
    assert!(!report.fit_intercept);
    let ramp = report.ramp.clone().unwrap().unwrap();
    assert_eq!(ramp.k_static, 0.0);
    assert!(report.accel.is_none());
    assert_eq!(sink.tables.len(), 1);
    assert!(report.summary_lines()[0].starts_with("kV = "));
    assert!(!report.summary_lines()[0].contains("kStatic"));
}

#[test]
fn log_failure_is_not_fatal() {
    let (clock, mut drive, mut operator, state) = rig(true, true);
    let mut sink = FailingSink;
    let report = run(
        &mut drive,
        &mut operator,
        &mut sink,
        clock.as_ref(),
        state,
        &params(),
        |_| {},
    )
    .unwrap();
    assert!(report.ramp.as_ref().unwrap().is_ok());
    assert!(report.accel.as_ref().unwrap().is_ok());
    assert!(report.logs.is_empty());
    assert_eq!(report.log_failures.len(), 2);
    assert!(matches!(report.log_failures[0], TunerError::LogWrite(_)));
}

#[rstest]
#[case(3.0)]
#[case(7.0)]
fn abort_stops_drive_without_results(#[case] at_s: f64) {
    let (clock, mut drive, operator, state) = rig(true, true);
    let mut operator = operator.with_abort_at(at_s);
    let mut sink = MemorySink::default();
    let report = run(
        &mut drive,
        &mut operator,
        &mut sink,
        clock.as_ref(),
        state,
        &params(),
        |_| {},
    )
    .unwrap();
    assert!(report.aborted);
    assert!(report.ramp.is_none());
    assert!(report.accel.is_none());
    assert_eq!(drive.power(), 0.0);
    assert!(report.ticks <= (at_s * 100.0) as u64 + 2);
}

#[test]
fn drivetrain_fault_is_returned_typed() {
    let (clock, drive, mut operator, state) = rig(true, true);
    let mut drive = drive.with_fault_after(20);
    let mut sink = MemorySink::default();
    let err = run(
        &mut drive,
        &mut operator,
        &mut sink,
        clock.as_ref(),
        state,
        &params(),
        |_| {},
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TunerError>(),
        Some(TunerError::DrivetrainFault(_))
    ));
    assert!(sink.tables.is_empty());
}

#[test]
fn csv_logs_refit_to_the_same_result() {
    let tmp = tempfile::tempdir().unwrap();
    let (clock, mut drive, mut operator, state) = rig(true, false);
    let mut sink = CsvLogSink::new(tmp.path());
    let report = run(
        &mut drive,
        &mut operator,
        &mut sink,
        clock.as_ref(),
        state,
        &params(),
        |_| {},
    )
    .unwrap();
    let live = report.ramp.clone().unwrap().unwrap();
    let path = tmp.path().join(&report.logs[0]);
    let rows = fftune_config::load_samples_csv(&path).unwrap();
    let samples = fftune_core::conversions::samples_from_rows(&rows).unwrap();
    let offline = fftune_core::fit_ramp(&samples, true).unwrap();
    assert_eq!(live, offline);
}

#[test]
fn tuner_builder_runs_the_routine() {
    let clock = Arc::new(TestClock::new());
    let config = TestConfig::default();
    let ramp_duration = fftune_core::RampSchedule::new(&config, V_MAX)
        .unwrap()
        .ramp_duration;
    let mut tuner = Tuner::builder()
        .with_drivetrain(SimulatedDrivetrain::new(plant(), clock.clone()))
        .with_operator(ScriptedOperator::auto(
            clock.clone(),
            ramp_duration,
            true,
            false,
        ))
        .with_max_velocity(V_MAX)
        .with_config(config)
        .with_clock(clock)
        .with_tick_hz(200)
        .with_timeout(Duration::from_secs(30))
        .build()
        .unwrap();
    let report = tuner.run(|_| {}).unwrap();
    assert!(report.ramp.unwrap().is_ok());
    assert!(report.ticks > 900);
}
