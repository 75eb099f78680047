//! Human-readable error descriptions and structured JSON error formatting.

use fftune_core::error::{BuildError, FitError, SampleError, TunerError};

/// Exit code for a run the operator aborted.
pub const EXIT_ABORTED: i32 = 4;
/// Exit code when a regression could not produce gains.
pub const EXIT_FIT_FAILED: i32 = 3;

fn fit_error(err: &eyre::Report) -> Option<&FitError> {
    if let Some(fe) = err.downcast_ref::<FitError>() {
        return Some(fe);
    }
    match err.downcast_ref::<TunerError>() {
        Some(TunerError::Fit(fe)) => Some(fe),
        _ => None,
    }
}

fn humanize_fit(fe: &FitError) -> String {
    match fe {
        FitError::InsufficientData { needed, got } => format!(
            "What happened: Not enough samples to fit (needed {needed}, got {got}).\nLikely causes: The test was stopped early or the sample log is nearly empty.\nHow to fix: Rerun the test to completion, or point the fit at the full CSV log."
        ),
        FitError::SingularFit(what) => format!(
            "What happened: The regression is degenerate ({what}).\nLikely causes: The robot did not move, power never changed, or the log holds a single repeated row.\nHow to fix: Check that the drive responds to power and that the log came from a real test run."
        ),
        FitError::IncompatibleBaseline(what) => format!(
            "What happened: The ramp result cannot be used as the kA baseline ({what}).\nLikely causes: The ramp fit produced a non-positive or non-finite kV.\nHow to fix: Rerun the ramp test and check its R^2 before fitting kA."
        ),
    }
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingDrivetrain => {
                "What happened: No drivetrain was provided to the tuner.\nLikely causes: The drive failed to initialize or was not wired into the builder.\nHow to fix: Pass the drive via with_drivetrain(...).".to_string()
            }
            BuildError::MissingOperator => {
                "What happened: No operator input was provided to the tuner.\nLikely causes: The gamepad or console input was not wired into the builder.\nHow to fix: Pass the input via with_operator(...).".to_string()
            }
            BuildError::MissingMaxVelocity => {
                "What happened: The drive's top speed is unknown.\nLikely causes: The builder was not given a max velocity.\nHow to fix: Set [drive] max_rpm, gear_ratio and wheel_radius, or call with_max_velocity(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML or on the command line.\nHow to fix: Edit the config file or the overrides, then rerun."
            ),
        };
    }

    if let Some(fe) = fit_error(err) {
        return humanize_fit(fe);
    }

    if let Some(te) = err.downcast_ref::<TunerError>() {
        return match te {
            TunerError::DrivetrainFault(msg) => format!(
                "What happened: The drivetrain reported a fault ({msg}).\nLikely causes: Motor controller fault, brownout, or a disconnected motor.\nHow to fix: Power-cycle the drive, check wiring, and start a new run."
            ),
            TunerError::Drivetrain(msg) => format!(
                "What happened: A drivetrain call failed ({msg}).\nLikely causes: Encoder or motor communication problems.\nHow to fix: Check the drive connection; re-run with --log-level=debug for details."
            ),
            TunerError::State(msg) if msg.contains("exceeded") => format!(
                "What happened: The run took too long ({msg}).\nLikely causes: Nobody answered a prompt, or runner.timeout_s is too low.\nHow to fix: Answer the prompts, or raise runner.timeout_s (0 disables the cap)."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(se) = err.downcast_ref::<SampleError>() {
        return format!(
            "What happened: The sample log holds an invalid row ({se}).\nLikely causes: The file was edited by hand or mixes two runs.\nHow to fix: Use an unmodified log written by `fftune run`."
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    // Sample CSV header special-case
    if lower.contains("sample csv must have headers") {
        return "Invalid headers in sample CSV. Expected 'time,position,power'.".to_string();
    }

    if lower.contains("open sample csv") {
        return format!(
            "What happened: Could not open the sample log.\nLikely causes: Wrong path or missing permissions.\nHow to fix: Check the file path. Original: {msg}"
        );
    }

    if lower.contains("parse config") || lower.contains("must be") || lower.contains("unreasonably")
    {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: A typo in the TOML or an out-of-range value.\nHow to fix: Edit the config file (see etc/fftune.toml for a sample) and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Fit failures get their own exit code; everything else is 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if fit_error(err).is_some() {
        return EXIT_FIT_FAILED;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(fe) = fit_error(err) {
        return match fe {
            FitError::InsufficientData { .. } => "InsufficientData",
            FitError::SingularFit(_) => "SingularFit",
            FitError::IncompatibleBaseline(_) => "IncompatibleBaseline",
        };
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    match err.downcast_ref::<TunerError>() {
        Some(TunerError::DrivetrainFault(_)) => "DrivetrainFault",
        Some(TunerError::Drivetrain(_)) => "Drivetrain",
        Some(TunerError::State(_)) => "State",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_errors_map_to_their_exit_code() {
        let direct = eyre::Report::new(FitError::InsufficientData { needed: 2, got: 0 });
        assert_eq!(exit_code_for_error(&direct), EXIT_FIT_FAILED);
        let wrapped = eyre::Report::new(TunerError::Fit(FitError::SingularFit("zero power")));
        assert_eq!(exit_code_for_error(&wrapped), EXIT_FIT_FAILED);
        assert!(humanize(&wrapped).contains("degenerate"));
        assert_eq!(exit_code_for_error(&eyre::eyre!("boom")), 1);
    }

    #[test]
    fn fault_is_explained() {
        let err = eyre::Report::new(TunerError::DrivetrainFault("overcurrent".into()));
        let text = humanize(&err);
        assert!(text.starts_with("What happened: The drivetrain reported a fault"));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "DrivetrainFault");
    }

    #[test]
    fn header_error_is_special_cased() {
        let err = eyre::eyre!("sample CSV must have headers 'time,position,power', got: t,x");
        assert_eq!(
            humanize(&err),
            "Invalid headers in sample CSV. Expected 'time,position,power'."
        );
    }
}
