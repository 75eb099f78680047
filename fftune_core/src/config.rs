//! Run configuration and the power schedules derived from it.
//!
//! These are the runtime types used by the sequencer. They are separate from
//! the TOML-deserialized config in `fftune_config`.

use crate::error::{BuildError, Result};

/// Parameters of one characterization run. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestConfig {
    /// Peak power of the ramp and the constant power of the accel test, in (0, 1].
    pub max_power_fraction: f64,
    /// Room in front of the robot, in the drivetrain's linear unit.
    pub target_distance: f64,
    /// Fit kStatic alongside kV.
    pub fit_intercept: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            max_power_fraction: 0.7,
            target_distance: 100.0,
            fit_intercept: true,
        }
    }
}

impl TestConfig {
    pub fn new(max_power_fraction: f64, target_distance: f64, fit_intercept: bool) -> Result<Self> {
        let cfg = Self {
            max_power_fraction,
            target_distance,
            fit_intercept,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.max_power_fraction > 0.0 && self.max_power_fraction <= 1.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "max_power_fraction must be in (0, 1]",
            )));
        }
        if !(self.target_distance.is_finite() && self.target_distance > 0.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "target_distance must be > 0",
            )));
        }
        Ok(())
    }

    /// Copy of this config with the operator's kStatic answer applied.
    #[must_use]
    pub fn with_fit_intercept(self, fit_intercept: bool) -> Self {
        Self {
            fit_intercept,
            ..self
        }
    }

    /// Copy of this config with optional overrides applied and revalidated.
    pub fn with_overrides(
        self,
        max_power_fraction: Option<f64>,
        target_distance: Option<f64>,
    ) -> Result<Self> {
        Self::new(
            max_power_fraction.unwrap_or(self.max_power_fraction),
            target_distance.unwrap_or(self.target_distance),
            self.fit_intercept,
        )
    }
}

/// Linear velocity for a wheel driven at `rpm` through `gear_ratio`.
pub fn rpm_to_velocity(rpm: f64, gear_ratio: f64, wheel_radius: f64) -> f64 {
    rpm * gear_ratio * 2.0 * std::f64::consts::PI * wheel_radius / 60.0
}

/// Quasi-static ramp and constant-power timing for one run.
///
/// The ramp accelerates the commanded velocity uniformly from rest so that it
/// reaches `v_final = p * v_max` after covering exactly the target distance:
///
/// ```text
/// accel         = v_final^2 / (2 d)
/// ramp_duration = sqrt(2 d / accel)
/// power(t)      = accel * t / v_max        clamped to [0, p]
/// ```
///
/// The constant-power test holds `p` for `d / v_max` seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampSchedule {
    pub v_max: f64,
    pub v_final: f64,
    pub accel: f64,
    pub ramp_duration: f64,
    pub max_power: f64,
    pub max_power_time: f64,
}

impl RampSchedule {
    pub fn new(config: &TestConfig, v_max: f64) -> Result<Self> {
        config.validate()?;
        if !(v_max.is_finite() && v_max > 0.0) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "max velocity must be > 0",
            )));
        }
        let d = config.target_distance;
        let v_final = config.max_power_fraction * v_max;
        let accel = (v_final * v_final) / (2.0 * d);
        let ramp_duration = (2.0 * d / accel).sqrt();
        Ok(Self {
            v_max,
            v_final,
            accel,
            ramp_duration,
            max_power: config.max_power_fraction,
            max_power_time: d / v_max,
        })
    }

    /// Commanded ramp power at `t` seconds into the ramp.
    #[inline]
    pub fn ramp_power(&self, t: f64) -> f64 {
        (self.accel * t / self.v_max).clamp(0.0, self.max_power)
    }

    /// Position a plant obeying `power = k_v * v + k_static` reaches under the ramp.
    pub fn ideal_ramp_position(&self, t: f64, k_v: f64, k_static: f64) -> f64 {
        let integral = 0.5 * self.accel / self.v_max * t * t;
        (integral - k_static * t) / k_v
    }
}
