//! Phase state machine for the two-test characterization routine.
//!
//! [`tick`] is pure: it consumes the current [`TunerState`] plus one tick's
//! inputs and returns the next state with the effects the host must apply.
//! Drivetrain, operator, clock and log sink are never touched here.
//!
//! Choice states act on a full press: the button's rising edge arms the
//! choice and its falling edge fires it, so a held button moves the machine
//! exactly once.

use fftune_traits::Sample;

use crate::config::{RampSchedule, TestConfig};
use crate::effect::{Effect, Prompt, TestKind};
use crate::error::{FitError, Result};
use crate::regression::{AccelResult, RampResult, fit_accel, fit_ramp};
use crate::sample::SampleBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
    High,
    Low,
}

/// Tracks one button level across ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeDetector {
    prev: bool,
}

impl EdgeDetector {
    pub fn update(&mut self, level: bool) -> Edge {
        let edge = match (self.prev, level) {
            (false, true) => Edge::Rising,
            (true, false) => Edge::Falling,
            (true, true) => Edge::High,
            (false, false) => Edge::Low,
        };
        self.prev = level;
        edge
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Idle {
        pending: Option<Answer>,
    },
    AwaitInterceptChoice {
        pending: Option<Answer>,
    },
    AwaitRampStartConfirm {
        pending: Option<Answer>,
    },
    RunningRampTest {
        started_at: Option<f64>,
        buffer: SampleBuffer,
    },
    RampComplete {
        result: std::result::Result<RampResult, FitError>,
    },
    AwaitAccelChoice {
        ramp: RampResult,
        pending: Option<Answer>,
    },
    AwaitAccelStartConfirm {
        ramp: RampResult,
        pending: Option<Answer>,
    },
    RunningAccelTest {
        ramp: RampResult,
        started_at: Option<f64>,
        buffer: SampleBuffer,
    },
    AccelComplete {
        ramp: RampResult,
        /// `None` when the operator declined the constant-power test.
        accel: Option<std::result::Result<AccelResult, FitError>>,
    },
    Aborted,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle { .. } => "idle",
            Phase::AwaitInterceptChoice { .. } => "await_intercept_choice",
            Phase::AwaitRampStartConfirm { .. } => "await_ramp_start",
            Phase::RunningRampTest { .. } => "running_ramp",
            Phase::RampComplete { .. } => "ramp_complete",
            Phase::AwaitAccelChoice { .. } => "await_accel_choice",
            Phase::AwaitAccelStartConfirm { .. } => "await_accel_start",
            Phase::RunningAccelTest { .. } => "running_accel",
            Phase::AccelComplete { .. } => "accel_complete",
            Phase::Aborted => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Phase::RampComplete { result: Err(_) } | Phase::AccelComplete { .. } | Phase::Aborted
        )
    }
}

/// Button levels, abort flag, clock reading and drivetrain position for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInputs {
    /// Seconds since the run started.
    pub now: f64,
    pub position: f64,
    pub confirm: bool,
    pub decline: bool,
    pub abort: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TunerState {
    phase: Phase,
    config: TestConfig,
    schedule: RampSchedule,
    confirm: EdgeDetector,
    decline: EdgeDetector,
}

impl TunerState {
    pub fn new(config: TestConfig, max_velocity: f64) -> Result<Self> {
        let schedule = RampSchedule::new(&config, max_velocity)?;
        Ok(Self {
            phase: Phase::Idle { pending: None },
            config,
            schedule,
            confirm: EdgeDetector::default(),
            decline: EdgeDetector::default(),
        })
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Config in effect, including the operator's kStatic answer once given.
    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    pub fn schedule(&self) -> &RampSchedule {
        &self.schedule
    }

    pub fn opening_prompt(&self) -> Prompt {
        Prompt::PressStart
    }

    /// Samples of the running test phase; empty in every other phase.
    pub fn active_samples(&self) -> &[Sample] {
        match &self.phase {
            Phase::RunningRampTest { buffer, .. } | Phase::RunningAccelTest { buffer, .. } => {
                buffer.as_slice()
            }
            _ => &[],
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.phase, Phase::Aborted)
    }

    pub fn ramp_result(&self) -> Option<std::result::Result<RampResult, FitError>> {
        match &self.phase {
            Phase::RampComplete { result } => Some(result.clone()),
            Phase::AwaitAccelChoice { ramp, .. }
            | Phase::AwaitAccelStartConfirm { ramp, .. }
            | Phase::RunningAccelTest { ramp, .. }
            | Phase::AccelComplete { ramp, .. } => Some(Ok(*ramp)),
            _ => None,
        }
    }

    pub fn accel_result(&self) -> Option<std::result::Result<AccelResult, FitError>> {
        match &self.phase {
            Phase::AccelComplete { accel, .. } => accel.clone(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Buttons {
    confirm: Edge,
    decline: Edge,
}

enum Poll {
    Waiting(Option<Answer>),
    Fired(Answer),
}

/// Arm on a rising edge, fire on the armed button's falling edge.
fn poll(pending: Option<Answer>, buttons: Buttons, accepts_decline: bool) -> Poll {
    match pending {
        None if buttons.confirm == Edge::Rising => Poll::Waiting(Some(Answer::Yes)),
        None if accepts_decline && buttons.decline == Edge::Rising => {
            Poll::Waiting(Some(Answer::No))
        }
        Some(Answer::Yes) if buttons.confirm == Edge::Falling => Poll::Fired(Answer::Yes),
        Some(Answer::No) if buttons.decline == Edge::Falling => Poll::Fired(Answer::No),
        other => Poll::Waiting(other),
    }
}

fn record(buffer: &mut SampleBuffer, sample: Sample) {
    if let Err(e) = buffer.push(sample) {
        tracing::warn!(error = %e, "sample not recorded");
    }
}

/// Advance the machine by one tick.
pub fn tick(state: TunerState, inputs: &TickInputs) -> (TunerState, Vec<Effect>) {
    let TunerState {
        phase,
        mut config,
        schedule,
        mut confirm,
        mut decline,
    } = state;
    let buttons = Buttons {
        confirm: confirm.update(inputs.confirm),
        decline: decline.update(inputs.decline),
    };
    let mut effects = Vec::new();
    let from = phase.name();

    let next = if inputs.abort && !phase.is_terminal() {
        tracing::warn!(phase = from, "abort requested");
        effects.push(Effect::SetAxialPower(0.0));
        effects.push(Effect::Prompt(Prompt::Aborted));
        Phase::Aborted
    } else {
        match phase {
            Phase::Idle { pending } => match poll(pending, buttons, false) {
                Poll::Fired(_) => {
                    effects.push(Effect::Prompt(Prompt::AskFitIntercept));
                    Phase::AwaitInterceptChoice { pending: None }
                }
                Poll::Waiting(pending) => Phase::Idle { pending },
            },
            Phase::AwaitInterceptChoice { pending } => match poll(pending, buttons, true) {
                Poll::Fired(answer) => {
                    config = config.with_fit_intercept(answer == Answer::Yes);
                    effects.push(Effect::Prompt(Prompt::PlaceRobot {
                        distance: config.target_distance,
                    }));
                    Phase::AwaitRampStartConfirm { pending: None }
                }
                Poll::Waiting(pending) => Phase::AwaitInterceptChoice { pending },
            },
            Phase::AwaitRampStartConfirm { pending } => match poll(pending, buttons, false) {
                Poll::Fired(_) => {
                    effects.push(Effect::Prompt(Prompt::Running));
                    Phase::RunningRampTest {
                        started_at: None,
                        buffer: SampleBuffer::new(),
                    }
                }
                Poll::Waiting(pending) => Phase::AwaitRampStartConfirm { pending },
            },
            Phase::RunningRampTest {
                started_at,
                mut buffer,
            } => {
                let start = started_at.unwrap_or(inputs.now);
                let t = inputs.now - start;
                if t > schedule.ramp_duration {
                    effects.push(Effect::SetAxialPower(0.0));
                    let result = fit_ramp(buffer.as_slice(), config.fit_intercept);
                    effects.push(Effect::WriteLog {
                        kind: TestKind::Ramp,
                        samples: buffer.into_samples(),
                    });
                    effects.push(Effect::Prompt(match &result {
                        Ok(r) => Prompt::RampReport {
                            result: *r,
                            fit_intercept: config.fit_intercept,
                        },
                        Err(e) => Prompt::FitFailed {
                            kind: TestKind::Ramp,
                            error: e.clone(),
                        },
                    }));
                    Phase::RampComplete { result }
                } else {
                    let power = schedule.ramp_power(t);
                    record(&mut buffer, Sample::new(t, inputs.position, power));
                    effects.push(Effect::SetAxialPower(power));
                    effects.push(Effect::AdvancePoseEstimate);
                    Phase::RunningRampTest {
                        started_at: Some(start),
                        buffer,
                    }
                }
            }
            Phase::RampComplete { result: Ok(ramp) } => {
                effects.push(Effect::Prompt(Prompt::AskFitAccel));
                Phase::AwaitAccelChoice {
                    ramp,
                    pending: None,
                }
            }
            Phase::AwaitAccelChoice { ramp, pending } => match poll(pending, buttons, true) {
                Poll::Fired(Answer::Yes) => {
                    effects.push(Effect::Prompt(Prompt::PlaceRobotBack));
                    Phase::AwaitAccelStartConfirm {
                        ramp,
                        pending: None,
                    }
                }
                Poll::Fired(Answer::No) => {
                    effects.push(Effect::Prompt(Prompt::Finished));
                    Phase::AccelComplete { ramp, accel: None }
                }
                Poll::Waiting(pending) => Phase::AwaitAccelChoice { ramp, pending },
            },
            Phase::AwaitAccelStartConfirm { ramp, pending } => {
                match poll(pending, buttons, false) {
                    Poll::Fired(_) => {
                        effects.push(Effect::Prompt(Prompt::Running));
                        Phase::RunningAccelTest {
                            ramp,
                            started_at: None,
                            buffer: SampleBuffer::new(),
                        }
                    }
                    Poll::Waiting(pending) => Phase::AwaitAccelStartConfirm { ramp, pending },
                }
            }
            Phase::RunningAccelTest {
                ramp,
                started_at,
                mut buffer,
            } => {
                let start = started_at.unwrap_or(inputs.now);
                let t = inputs.now - start;
                if t > schedule.max_power_time {
                    effects.push(Effect::SetAxialPower(0.0));
                    let result = fit_accel(buffer.as_slice(), &ramp);
                    effects.push(Effect::WriteLog {
                        kind: TestKind::Accel,
                        samples: buffer.into_samples(),
                    });
                    effects.push(Effect::Prompt(match &result {
                        Ok(a) => Prompt::AccelReport(*a),
                        Err(e) => Prompt::FitFailed {
                            kind: TestKind::Accel,
                            error: e.clone(),
                        },
                    }));
                    effects.push(Effect::Prompt(Prompt::Finished));
                    Phase::AccelComplete {
                        ramp,
                        accel: Some(result),
                    }
                } else {
                    let power = schedule.max_power;
                    record(&mut buffer, Sample::new(t, inputs.position, power));
                    effects.push(Effect::SetAxialPower(power));
                    effects.push(Effect::AdvancePoseEstimate);
                    Phase::RunningAccelTest {
                        ramp,
                        started_at: Some(start),
                        buffer,
                    }
                }
            }
            terminal @ (Phase::RampComplete { result: Err(_) }
            | Phase::AccelComplete { .. }
            | Phase::Aborted) => terminal,
        }
    };

    if next.name() != from {
        tracing::info!(from, to = next.name(), "phase transition");
    }
    (
        TunerState {
            phase: next,
            config,
            schedule,
            confirm,
            decline,
        },
        effects,
    )
}
