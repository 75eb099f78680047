//! Quick Start Example
//!
//! Runs the full tuning routine against the simulated drivetrain, with a
//! scripted operator pressing the buttons, and prints the fitted gains.
//!
//! Simulated time is used, so the run finishes instantly. Swap `TestClock`
//! for `MonotonicClock` to watch it in real time.
//!
//! Run with `cargo run -p fftune_core --example quick_start`.

use std::sync::Arc;

use fftune_core::{RampSchedule, TestConfig, Tuner, rpm_to_velocity};
use fftune_hardware::{PlantParams, ScriptedOperator, SimulatedDrivetrain};
use fftune_traits::Clock;
use fftune_traits::clock::test_clock::TestClock;

fn main() -> Result<(), eyre::Report> {
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(TestClock::new());

    // 312 rpm motor, direct drive, 1.89 in wheels
    let v_max = rpm_to_velocity(312.0, 1.0, 1.89);
    let config = TestConfig::new(0.7, 100.0, true)?;
    let schedule = RampSchedule::new(&config, v_max)?;

    let drive = SimulatedDrivetrain::new(PlantParams::default(), clock.clone());
    let operator = ScriptedOperator::auto(clock.clone(), schedule.ramp_duration, true, true);

    let mut tuner = Tuner::builder()
        .with_drivetrain(drive)
        .with_operator(operator)
        .with_max_velocity(v_max)
        .with_config(config)
        .with_clock(clock)
        .build()?;

    let report = tuner.run(|prompt| println!("> {prompt}"))?;
    for line in report.summary_lines() {
        println!("{line}");
    }
    Ok(())
}
