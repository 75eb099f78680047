//! Simulated single-axis drivetrain.
//!
//! Plant model, with `dir` the direction of travel (or of the applied power
//! when at rest):
//!
//! ```text
//! k_a * dv/dt = power - k_v * v - k_static * dir
//! ```
//!
//! A robot at rest stays there while `|power| <= k_static`. Between power
//! changes the model is a first-order lag, so each substep uses the exact
//! exponential solution rather than an Euler step.

use std::sync::Arc;
use std::time::{Duration, Instant};

use fftune_traits::{BoxError, Clock, Drivetrain};

use crate::error::{Result, SimError};

/// Feedforward gains of the simulated plant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantParams {
    pub k_v: f64,
    pub k_static: f64,
    pub k_a: f64,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            k_v: 0.0167,
            k_static: 0.02,
            k_a: 0.001,
        }
    }
}

pub struct SimulatedDrivetrain {
    plant: PlantParams,
    clock: Arc<dyn Clock + Send + Sync>,
    last: Instant,
    substep: Duration,
    power: f64,
    position: f64,
    velocity: f64,
    pose_updates: u64,
    commands: u64,
    fault_after: Option<u64>,
}

impl core::fmt::Debug for SimulatedDrivetrain {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SimulatedDrivetrain")
            .field("plant", &self.plant)
            .field("power", &self.power)
            .field("position", &self.position)
            .field("velocity", &self.velocity)
            .finish_non_exhaustive()
    }
}

impl SimulatedDrivetrain {
    pub fn new(plant: PlantParams, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let last = clock.now();
        Self {
            plant,
            clock,
            last,
            substep: Duration::from_millis(1),
            power: 0.0,
            position: 0.0,
            velocity: 0.0,
            pose_updates: 0,
            commands: 0,
            fault_after: None,
        }
    }

    /// Fail every power command after the first `n`.
    #[must_use]
    pub fn with_fault_after(mut self, n: u64) -> Self {
        self.fault_after = Some(n);
        self
    }

    #[must_use]
    pub fn with_substep(mut self, substep: Duration) -> Self {
        self.substep = substep.max(Duration::from_micros(10));
        self
    }

    pub fn plant(&self) -> PlantParams {
        self.plant
    }

    pub fn power(&self) -> f64 {
        self.power
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn pose_updates(&self) -> u64 {
        self.pose_updates
    }

    /// Integrate the plant up to the clock's current time.
    fn catch_up(&mut self) {
        let now = self.clock.now();
        let mut remaining = now.saturating_duration_since(self.last).as_secs_f64();
        self.last = now;
        let h_max = self.substep.as_secs_f64();
        while remaining > 0.0 {
            let h = remaining.min(h_max);
            self.step(h);
            remaining -= h;
        }
    }

    fn step(&mut self, h: f64) {
        let PlantParams { k_v, k_static, k_a } = self.plant;
        let p = self.power;
        let v = self.velocity;

        if v == 0.0 && p.abs() <= k_static {
            return;
        }
        let dir = if v != 0.0 { v.signum() } else { p.signum() };
        let v_ss = (p - k_static * dir) / k_v;

        if k_a <= 0.0 {
            self.velocity = if v_ss.signum() == dir { v_ss } else { 0.0 };
            self.position += self.velocity * h;
            return;
        }

        let tau = k_a / k_v;
        let decay = (-h / tau).exp();
        let v_new = v_ss + (v - v_ss) * decay;
        if v != 0.0 && v_new.signum() != v.signum() {
            // Friction stops the robot within this substep; stop at rest.
            self.position += 0.5 * v * h;
            self.velocity = 0.0;
            return;
        }
        self.position += v_ss * h + (v - v_ss) * tau * (1.0 - decay);
        self.velocity = v_new;
    }

    fn check_power(power: f64) -> Result<()> {
        if !power.is_finite() {
            return Err(SimError::NonFinite("power"));
        }
        if !(-1.0..=1.0).contains(&power) {
            return Err(SimError::PowerOutOfRange(power));
        }
        Ok(())
    }
}

impl Drivetrain for SimulatedDrivetrain {
    fn set_axial_power(&mut self, power: f64) -> std::result::Result<(), BoxError> {
        Self::check_power(power)?;
        self.commands += 1;
        if let Some(n) = self.fault_after
            && self.commands > n
        {
            tracing::warn!(commands = self.commands, "simulated drivetrain fault");
            return Err(Box::new(SimError::Fault("injected after command limit".into())));
        }
        self.catch_up();
        self.power = power;
        Ok(())
    }

    fn axial_position(&mut self) -> std::result::Result<f64, BoxError> {
        self.catch_up();
        Ok(self.position)
    }

    fn advance_pose_estimate(&mut self) -> std::result::Result<(), BoxError> {
        self.catch_up();
        self.pose_updates += 1;
        tracing::trace!(
            position = self.position,
            velocity = self.velocity,
            "pose estimate"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fftune_traits::clock::test_clock::TestClock;

    fn sim(plant: PlantParams) -> (Arc<TestClock>, SimulatedDrivetrain) {
        let clock = Arc::new(TestClock::new());
        let drive = SimulatedDrivetrain::new(plant, clock.clone());
        (clock, drive)
    }

    #[test]
    fn stiction_holds_robot_at_rest() {
        let (clock, mut drive) = sim(PlantParams::default());
        drive.set_axial_power(0.015).unwrap();
        clock.advance(Duration::from_secs(1));
        assert_eq!(drive.axial_position().unwrap(), 0.0);
    }

    #[test]
    fn reaches_steady_state_velocity() {
        let plant = PlantParams::default();
        let (clock, mut drive) = sim(plant);
        drive.set_axial_power(0.5).unwrap();
        clock.advance(Duration::from_secs(2));
        drive.advance_pose_estimate().unwrap();
        let expected = (0.5 - plant.k_static) / plant.k_v;
        assert!((drive.velocity() - expected).abs() < 1e-6 * expected);
        assert_eq!(drive.pose_updates(), 1);
    }

    #[test]
    fn coasts_to_a_stop_when_power_removed() {
        let (clock, mut drive) = sim(PlantParams::default());
        drive.set_axial_power(0.5).unwrap();
        clock.advance(Duration::from_secs(1));
        drive.set_axial_power(0.0).unwrap();
        clock.advance(Duration::from_secs(2));
        let x = drive.axial_position().unwrap();
        assert_eq!(drive.velocity(), 0.0);
        clock.advance(Duration::from_secs(1));
        assert_eq!(drive.axial_position().unwrap(), x);
    }

    #[test]
    fn rejects_out_of_range_power() {
        let (_clock, mut drive) = sim(PlantParams::default());
        let err = drive.set_axial_power(1.5).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SimError>(),
            Some(&SimError::PowerOutOfRange(1.5))
        );
        assert!(drive.set_axial_power(f64::NAN).is_err());
    }

    #[test]
    fn injected_fault_after_limit() {
        let (_clock, drive) = sim(PlantParams::default());
        let mut drive = drive.with_fault_after(1);
        drive.set_axial_power(0.1).unwrap();
        let err = drive.set_axial_power(0.2).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SimError>(),
            Some(SimError::Fault(_))
        ));
    }
}
