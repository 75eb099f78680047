//! Example: plugging in your own drivetrain
//!
//! Any type implementing `Drivetrain` can be tuned. This one models an ideal
//! drive whose velocity follows power instantly (no kA) and answers the
//! prompts from a fixed script of button levels.
//!
//! Run with `cargo run -p fftune_core --example custom_drivetrain`.

use std::sync::Arc;

use fftune_core::{Tuner, TunerError};
use fftune_traits::clock::test_clock::TestClock;
use fftune_traits::{BoxError, Clock, Drivetrain, OperatorInput};

/// Velocity is `(power - k_static) / k_v` the moment power is applied.
struct InstantDrive {
    clock: Arc<TestClock>,
    last_s: f64,
    power: f64,
    position: f64,
}

impl InstantDrive {
    fn integrate(&mut self) {
        let now = self.clock.elapsed_secs();
        let v = ((self.power - 0.05).max(0.0)) / 0.02;
        self.position += v * (now - self.last_s);
        self.last_s = now;
    }
}

impl Drivetrain for InstantDrive {
    fn set_axial_power(&mut self, power: f64) -> Result<(), BoxError> {
        if !power.is_finite() {
            return Err(Box::new(TunerError::Drivetrain("non-finite power".into())));
        }
        self.integrate();
        self.power = power;
        Ok(())
    }

    fn axial_position(&mut self) -> Result<f64, BoxError> {
        self.integrate();
        Ok(self.position)
    }

    fn advance_pose_estimate(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Confirms everything except the kA test, one press every half second.
struct Script {
    clock: Arc<TestClock>,
}

impl Script {
    fn level(&self, slot: usize) -> bool {
        let t = self.clock.elapsed_secs();
        let i = (t / 0.5) as usize;
        // Pressed for the first half of each slot.
        i == slot && t - i as f64 * 0.5 < 0.25
    }
}

impl OperatorInput for Script {
    fn confirm_pressed(&mut self) -> bool {
        self.level(1) || self.level(2) || self.level(3)
    }

    fn decline_pressed(&mut self) -> bool {
        // Well after the ramp has finished.
        self.level(16)
    }

    fn abort_requested(&mut self) -> bool {
        false
    }
}

fn main() -> Result<(), eyre::Report> {
    let clock = Arc::new(TestClock::new());
    let shared: Arc<dyn Clock + Send + Sync> = clock.clone();

    let mut tuner = Tuner::builder()
        .with_drivetrain(InstantDrive {
            clock: clock.clone(),
            last_s: 0.0,
            power: 0.0,
            position: 0.0,
        })
        .with_operator(Script { clock })
        .with_max_velocity(50.0)
        .with_clock(shared)
        .build()?;

    let report = tuner.run(|prompt| println!("> {prompt}"))?;
    for line in report.summary_lines() {
        println!("{line}");
    }
    Ok(())
}
