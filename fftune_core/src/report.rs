//! Human-readable rendering of results and prompts, and the run summary.

use std::fmt;

use crate::effect::Prompt;
use crate::error::{FitError, TunerError};
use crate::regression::{AccelResult, RampResult};

/// `kV = …, kStatic = … (R^2 = …)`, or without kStatic when it was not fit.
pub fn format_ramp(result: &RampResult, fit_intercept: bool) -> String {
    if fit_intercept {
        format!(
            "kV = {:.5}, kStatic = {:.5} (R^2 = {:.2})",
            result.k_v, result.k_static, result.r_square
        )
    } else {
        format!("kV = {:.5} (R^2 = {:.2})", result.k_v, result.r_square)
    }
}

pub fn format_accel(result: &AccelResult) -> String {
    format!("kA = {:.5} (R^2 = {:.2})", result.k_a, result.r_square)
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prompt::PressStart => {
                write!(f, "Press confirm to begin the feedforward tuning routine")
            }
            Prompt::AskFitIntercept => write!(
                f,
                "Would you like to fit kStatic?\nPress confirm for yes, decline for no"
            ),
            Prompt::PlaceRobot { distance } => write!(
                f,
                "Place your robot on the field with at least {distance:.2} of room in front\nPress confirm to begin"
            ),
            Prompt::Running => write!(f, "Running..."),
            Prompt::RampReport {
                result,
                fit_intercept,
            } => write!(
                f,
                "Quasi-static ramp up test complete\n{}",
                format_ramp(result, *fit_intercept)
            ),
            Prompt::AskFitAccel => write!(
                f,
                "Would you like to fit kA?\nPress confirm for yes, decline for no"
            ),
            Prompt::PlaceRobotBack => write!(
                f,
                "Place the robot back in its starting position\nPress confirm to continue"
            ),
            Prompt::AccelReport(result) => {
                write!(f, "Constant power test complete\n{}", format_accel(result))
            }
            Prompt::FitFailed { kind, error } => {
                write!(f, "{} regression failed: {error}", kind.name())
            }
            Prompt::Finished => write!(f, "Tuning complete"),
            Prompt::Aborted => write!(f, "Tuning aborted"),
        }
    }
}

/// Outcome of one run of the host loop.
#[derive(Debug, Default)]
pub struct TuneReport {
    pub ramp: Option<Result<RampResult, FitError>>,
    pub accel: Option<Result<AccelResult, FitError>>,
    /// kStatic answer the run used.
    pub fit_intercept: bool,
    pub aborted: bool,
    /// Filenames the log sink accepted.
    pub logs: Vec<String>,
    pub log_failures: Vec<TunerError>,
    pub ticks: u64,
}

impl TuneReport {
    /// The first fit error of the run, if any.
    pub fn fit_error(&self) -> Option<&FitError> {
        let ramp = self.ramp.as_ref().and_then(|r| r.as_ref().err());
        ramp.or_else(|| self.accel.as_ref().and_then(|r| r.as_ref().err()))
    }

    pub fn summary_lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.aborted {
            out.push("aborted: no result".to_string());
            return out;
        }
        match &self.ramp {
            Some(Ok(r)) => out.push(format_ramp(r, self.fit_intercept)),
            Some(Err(e)) => out.push(format!("ramp fit failed: {e}")),
            None => {}
        }
        match &self.accel {
            Some(Ok(a)) => out.push(format_accel(a)),
            Some(Err(e)) => out.push(format!("accel fit failed: {e}")),
            None => {}
        }
        for failure in &self.log_failures {
            out.push(format!("warning: {failure}"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_text_includes_kstatic_only_when_fit() {
        let r = RampResult {
            k_v: 0.0167,
            k_static: 0.02,
            r_square: 0.999,
        };
        assert_eq!(
            format_ramp(&r, true),
            "kV = 0.01670, kStatic = 0.02000 (R^2 = 1.00)"
        );
        assert_eq!(format_ramp(&r, false), "kV = 0.01670 (R^2 = 1.00)");
    }

    #[test]
    fn accel_text() {
        let a = AccelResult {
            k_a: 0.00123,
            r_square: 0.87,
        };
        assert_eq!(format_accel(&a), "kA = 0.00123 (R^2 = 0.87)");
    }

    #[test]
    fn summary_reports_abort_only() {
        let report = TuneReport {
            aborted: true,
            ..TuneReport::default()
        };
        assert_eq!(report.summary_lines(), vec!["aborted: no result"]);
    }

    #[test]
    fn fit_error_prefers_ramp() {
        let report = TuneReport {
            ramp: Some(Err(FitError::SingularFit("x"))),
            accel: Some(Err(FitError::InsufficientData { needed: 6, got: 0 })),
            ..TuneReport::default()
        };
        assert_eq!(report.fit_error(), Some(&FitError::SingularFit("x")));
    }
}
