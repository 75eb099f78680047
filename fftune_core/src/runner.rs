use std::time::Duration;

use eyre::WrapErr;
use fftune_traits::{Clock, Drivetrain, LogSink, OperatorInput};

use crate::effect::{Effect, Prompt};
use crate::error::{Report, Result, TunerError};
use crate::hw_error::map_drive_error;
use crate::report::TuneReport;
use crate::sequencer::{TickInputs, TunerState, tick};

/// Host loop cadence and limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunParams {
    pub tick_hz: u32,
    /// Hard cap on the whole run, waiting states included.
    pub timeout: Option<Duration>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            tick_hz: 100,
            timeout: None,
        }
    }
}

/// Drive `state` to a terminal phase, one tick per period of `params.tick_hz`.
///
/// Each tick reads the drivetrain position and the operator buttons, runs the
/// pure sequencer, then applies the returned effects in order. Log sink
/// failures are recorded in the report and never end the run; drivetrain
/// failures stop the motor (best-effort) and are returned.
pub fn run<D, O, L, C>(
    drive: &mut D,
    operator: &mut O,
    sink: &mut L,
    clock: &C,
    state: TunerState,
    params: &RunParams,
    mut on_prompt: impl FnMut(&Prompt),
) -> Result<TuneReport>
where
    D: Drivetrain + ?Sized,
    O: OperatorInput + ?Sized,
    L: LogSink + ?Sized,
    C: Clock + ?Sized,
{
    let period = Duration::from_micros(crate::util::period_us(params.tick_hz));
    let epoch = clock.now();
    let mut report = TuneReport::default();
    let mut state = state;

    {
        let s = state.schedule();
        tracing::info!(
            v_max = s.v_max,
            v_final = s.v_final,
            accel = s.accel,
            ramp_duration = s.ramp_duration,
            max_power_time = s.max_power_time,
            tick_hz = params.tick_hz,
            "tuning start"
        );
    }
    on_prompt(&state.opening_prompt());

    loop {
        let now = clock.secs_since(epoch);
        if let Some(limit) = params.timeout
            && now > limit.as_secs_f64()
        {
            stop_best_effort(drive);
            tracing::error!(elapsed_s = now, phase = state.phase().name(), "run timed out");
            return Err(Report::new(TunerError::State(format!(
                "run exceeded {:.1}s in phase {}",
                limit.as_secs_f64(),
                state.phase().name()
            ))));
        }

        let position = match drive.axial_position() {
            Ok(p) => p,
            Err(e) => {
                stop_best_effort(drive);
                return Err(Report::new(map_drive_error(e.as_ref())))
                    .wrap_err("reading axial position");
            }
        };
        let inputs = TickInputs {
            now,
            position,
            confirm: operator.confirm_pressed(),
            decline: operator.decline_pressed(),
            abort: operator.abort_requested(),
        };

        let (next, effects) = tick(state, &inputs);
        state = next;
        report.ticks += 1;

        for effect in effects {
            if let Err(e) = apply(effect, drive, sink, &mut report, &mut on_prompt) {
                stop_best_effort(drive);
                return Err(e);
            }
        }

        if state.is_finished() {
            break;
        }
        clock.sleep(period);
    }

    report.fit_intercept = state.config().fit_intercept;
    report.aborted = state.is_aborted();
    if !report.aborted {
        report.ramp = state.ramp_result();
        report.accel = state.accel_result();
    }
    tracing::info!(
        ticks = report.ticks,
        aborted = report.aborted,
        logs = report.logs.len(),
        log_failures = report.log_failures.len(),
        "tuning finished"
    );
    Ok(report)
}

fn apply<D, L>(
    effect: Effect,
    drive: &mut D,
    sink: &mut L,
    report: &mut TuneReport,
    on_prompt: &mut impl FnMut(&Prompt),
) -> Result<()>
where
    D: Drivetrain + ?Sized,
    L: LogSink + ?Sized,
{
    match effect {
        Effect::SetAxialPower(power) => drive
            .set_axial_power(power)
            .map_err(|e| Report::new(map_drive_error(e.as_ref())))
            .wrap_err_with(|| format!("setting axial power {power:.3}")),
        Effect::AdvancePoseEstimate => drive
            .advance_pose_estimate()
            .map_err(|e| Report::new(map_drive_error(e.as_ref())))
            .wrap_err("advancing pose estimate"),
        Effect::Prompt(prompt) => {
            tracing::debug!(prompt = %prompt, "prompt");
            on_prompt(&prompt);
            Ok(())
        }
        Effect::WriteLog { kind, samples } => {
            let filename = format!(
                "{}-{}.csv",
                kind.log_prefix(),
                crate::util::unix_millis()
            );
            match sink.write(&samples, &filename) {
                Ok(()) => {
                    tracing::info!(test = kind.name(), file = %filename, rows = samples.len(), "samples logged");
                    report.logs.push(filename);
                }
                Err(e) => {
                    tracing::warn!(test = kind.name(), file = %filename, error = %e, "sample log failed");
                    report
                        .log_failures
                        .push(TunerError::LogWrite(format!("{filename}: {e}")));
                }
            }
            Ok(())
        }
    }
}

fn stop_best_effort<D: Drivetrain + ?Sized>(drive: &mut D) {
    if let Err(e) = drive.set_axial_power(0.0) {
        tracing::warn!(error = %e, "failed to stop drivetrain");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TestConfig;
    use crate::mocks::{FailingSink, MemorySink, ScriptedButtons, StillDrive};
    use fftune_traits::clock::test_clock::TestClock;

    fn state() -> TunerState {
        TunerState::new(TestConfig::default(), 60.0).unwrap()
    }

    #[test]
    fn abort_stops_drive_and_reports_no_result() {
        let mut drive = StillDrive::default();
        let mut buttons = ScriptedButtons::abort_after(3);
        let mut sink = MemorySink::default();
        let clock = TestClock::new();
        let mut prompts = Vec::new();
        let report = run(
            &mut drive,
            &mut buttons,
            &mut sink,
            &clock,
            state(),
            &RunParams::default(),
            |p| prompts.push(p.clone()),
        )
        .unwrap();
        assert!(report.aborted);
        assert!(report.ramp.is_none());
        assert_eq!(report.ticks, 4);
        assert_eq!(drive.last_power, Some(0.0));
        assert_eq!(prompts.first(), Some(&Prompt::PressStart));
        assert_eq!(prompts.last(), Some(&Prompt::Aborted));
        assert!(sink.tables.is_empty());
    }

    #[test]
    fn timeout_is_an_error() {
        let mut drive = StillDrive::default();
        let mut buttons = ScriptedButtons::idle();
        let mut sink = FailingSink;
        let clock = TestClock::new();
        let params = RunParams {
            tick_hz: 100,
            timeout: Some(Duration::from_millis(500)),
        };
        let err = run(
            &mut drive,
            &mut buttons,
            &mut sink,
            &clock,
            state(),
            &params,
            |_| {},
        )
        .unwrap_err();
        assert!(err.to_string().contains("exceeded"));
        assert_eq!(drive.last_power, Some(0.0));
    }
}
