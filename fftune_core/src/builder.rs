//! Type-state builder for `Tuner`.
//!
//! The builder enforces at compile time that the drivetrain, operator input
//! and max velocity are provided before `build()` is available. `try_build()`
//! is always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use fftune_traits::clock::{Clock, MonotonicClock};
use fftune_traits::{Drivetrain, LogSink, OperatorInput};

use crate::config::{RampSchedule, TestConfig};
use crate::effect::Prompt;
use crate::error::{BuildError, Result};
use crate::mocks::MemorySink;
use crate::report::TuneReport;
use crate::runner::{RunParams, run};
use crate::sequencer::TunerState;

/// Owns the collaborators of one tuning session.
pub struct Tuner {
    drive: Box<dyn Drivetrain>,
    operator: Box<dyn OperatorInput>,
    sink: Box<dyn LogSink>,
    clock: Arc<dyn Clock + Send + Sync>,
    config: TestConfig,
    schedule: RampSchedule,
    params: RunParams,
}

impl core::fmt::Debug for Tuner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tuner")
            .field("config", &self.config)
            .field("schedule", &self.schedule)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl Tuner {
    /// Start building a Tuner.
    pub fn builder() -> TunerBuilder<Missing, Missing, Missing> {
        TunerBuilder::default()
    }

    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    pub fn schedule(&self) -> &RampSchedule {
        &self.schedule
    }

    /// Run the routine from `Idle` to a terminal phase.
    ///
    /// Every session starts from a fresh state, so a tuner can be run again
    /// after the robot is reset.
    pub fn run(&mut self, on_prompt: impl FnMut(&Prompt)) -> Result<TuneReport> {
        let state = TunerState::new(self.config, self.schedule.v_max)?;
        run(
            self.drive.as_mut(),
            self.operator.as_mut(),
            self.sink.as_mut(),
            self.clock.as_ref(),
            state,
            &self.params,
            on_prompt,
        )
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Tuner`. All values are validated on `build()`.
pub struct TunerBuilder<D, O, V> {
    drive: Option<Box<dyn Drivetrain>>,
    operator: Option<Box<dyn OperatorInput>>,
    max_velocity: Option<f64>,
    sink: Option<Box<dyn LogSink>>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    config: Option<TestConfig>,
    params: Option<RunParams>,
    _d: PhantomData<D>,
    _o: PhantomData<O>,
    _v: PhantomData<V>,
}

impl Default for TunerBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            drive: None,
            operator: None,
            max_velocity: None,
            sink: None,
            clock: None,
            config: None,
            params: None,
            _d: PhantomData,
            _o: PhantomData,
            _v: PhantomData,
        }
    }
}

impl<D, O, V> TunerBuilder<D, O, V> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<Tuner> {
        let drive = self
            .drive
            .ok_or_else(|| eyre::Report::new(BuildError::MissingDrivetrain))?;
        let operator = self
            .operator
            .ok_or_else(|| eyre::Report::new(BuildError::MissingOperator))?;
        let max_velocity = self
            .max_velocity
            .ok_or_else(|| eyre::Report::new(BuildError::MissingMaxVelocity))?;

        let config = self.config.unwrap_or_default();
        let schedule = RampSchedule::new(&config, max_velocity)?;
        let params = self.params.unwrap_or_default();
        if params.tick_hz == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "tick_hz must be > 0",
            )));
        }

        Ok(Tuner {
            drive,
            operator,
            sink: self.sink.unwrap_or_else(|| Box::new(MemorySink::default())),
            clock: self.clock.unwrap_or_else(|| Arc::new(MonotonicClock::new())),
            config,
            schedule,
            params,
        })
    }

    /// Retype the builder after a type-state setter.
    fn retype<D2, O2, V2>(self) -> TunerBuilder<D2, O2, V2> {
        TunerBuilder {
            drive: self.drive,
            operator: self.operator,
            max_velocity: self.max_velocity,
            sink: self.sink,
            clock: self.clock,
            config: self.config,
            params: self.params,
            _d: PhantomData,
            _o: PhantomData,
            _v: PhantomData,
        }
    }
}

/// Chainable setters that do not affect type-state.
impl<D, O, V> TunerBuilder<D, O, V> {
    pub fn with_config(mut self, config: TestConfig) -> Self {
        self.config = Some(config);
        self
    }
    /// Destination for per-phase sample tables; defaults to an in-memory sink.
    pub fn with_log_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
    pub fn with_run_params(mut self, params: RunParams) -> Self {
        self.params = Some(params);
        self
    }
    pub fn with_tick_hz(mut self, tick_hz: u32) -> Self {
        let mut p = self.params.unwrap_or_default();
        p.tick_hz = tick_hz;
        self.params = Some(p);
        self
    }
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let mut p = self.params.unwrap_or_default();
        p.timeout = Some(timeout);
        self.params = Some(p);
        self
    }
}

// Setters that advance type-state
impl<O, V> TunerBuilder<Missing, O, V> {
    pub fn with_drivetrain(self, drive: impl Drivetrain + 'static) -> TunerBuilder<Set, O, V> {
        let mut next = self.retype();
        next.drive = Some(Box::new(drive));
        next
    }
}

impl<D, V> TunerBuilder<D, Missing, V> {
    pub fn with_operator(self, operator: impl OperatorInput + 'static) -> TunerBuilder<D, Set, V> {
        let mut next = self.retype();
        next.operator = Some(Box::new(operator));
        next
    }
}

impl<D, O> TunerBuilder<D, O, Missing> {
    /// Top linear speed of the drivetrain at full power.
    pub fn with_max_velocity(self, v_max: f64) -> TunerBuilder<D, O, Set> {
        let mut next = self.retype();
        next.max_velocity = Some(v_max);
        next
    }
}

impl TunerBuilder<Set, Set, Set> {
    /// Validate and build the Tuner. Only available when all required pieces are set.
    pub fn build(self) -> Result<Tuner> {
        self.try_build()
    }
}
