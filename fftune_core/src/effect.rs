//! Side effects requested by one sequencer tick, applied by the host loop.

use fftune_traits::Sample;

use crate::error::FitError;
use crate::regression::{AccelResult, RampResult};

/// Which test phase a sample table or result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKind {
    Ramp,
    Accel,
}

impl TestKind {
    pub fn log_prefix(self) -> &'static str {
        match self {
            TestKind::Ramp => "DriveRampRegression",
            TestKind::Accel => "DriveAccelRegression",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TestKind::Ramp => "ramp",
            TestKind::Accel => "accel",
        }
    }
}

/// Operator-facing message emitted on entering a phase or finishing a fit.
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    PressStart,
    AskFitIntercept,
    PlaceRobot { distance: f64 },
    Running,
    RampReport { result: RampResult, fit_intercept: bool },
    AskFitAccel,
    PlaceRobotBack,
    AccelReport(AccelResult),
    FitFailed { kind: TestKind, error: FitError },
    Finished,
    Aborted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    SetAxialPower(f64),
    AdvancePoseEstimate,
    Prompt(Prompt),
    /// Persist a finished phase's samples; failure is not fatal.
    WriteLog { kind: TestKind, samples: Vec<Sample> },
}
