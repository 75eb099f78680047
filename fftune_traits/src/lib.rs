//! Collaborator boundaries for the feedforward tuner.
//!
//! Everything the tuning core touches outside its own memory goes through one
//! of these traits: the drivetrain, the operator's buttons, the clock and the
//! log sink. Errors cross the boundary boxed so any backend can plug in.

pub mod clock;

pub use clock::{Clock, MonotonicClock};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One telemetry row of a test phase.
///
/// `elapsed_time` is seconds since the phase started, `position` is in the
/// same linear unit as the test distance, `applied_power` is in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub elapsed_time: f64,
    pub position: f64,
    pub applied_power: f64,
}

impl Sample {
    pub const fn new(elapsed_time: f64, position: f64, applied_power: f64) -> Self {
        Self {
            elapsed_time,
            position,
            applied_power,
        }
    }
}

/// Open-loop drive along one translational axis plus its pose estimator.
pub trait Drivetrain {
    fn set_axial_power(&mut self, power: f64) -> Result<(), BoxError>;
    fn axial_position(&mut self) -> Result<f64, BoxError>;
    fn advance_pose_estimate(&mut self) -> Result<(), BoxError>;
}

/// Operator buttons, sampled once per tick.
pub trait OperatorInput {
    fn confirm_pressed(&mut self) -> bool;
    fn decline_pressed(&mut self) -> bool;
    fn abort_requested(&mut self) -> bool;
}

/// Durable destination for one phase's samples.
pub trait LogSink {
    fn write(&mut self, samples: &[Sample], filename: &str) -> Result<(), BoxError>;
}

impl<T: Drivetrain + ?Sized> Drivetrain for Box<T> {
    fn set_axial_power(&mut self, power: f64) -> Result<(), BoxError> {
        (**self).set_axial_power(power)
    }
    fn axial_position(&mut self) -> Result<f64, BoxError> {
        (**self).axial_position()
    }
    fn advance_pose_estimate(&mut self) -> Result<(), BoxError> {
        (**self).advance_pose_estimate()
    }
}

impl<T: OperatorInput + ?Sized> OperatorInput for Box<T> {
    fn confirm_pressed(&mut self) -> bool {
        (**self).confirm_pressed()
    }
    fn decline_pressed(&mut self) -> bool {
        (**self).decline_pressed()
    }
    fn abort_requested(&mut self) -> bool {
        (**self).abort_requested()
    }
}
