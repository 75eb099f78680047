#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core feedforward tuning logic (hardware-agnostic).
//!
//! This crate characterizes a drivetrain's open-loop feedforward gains. All
//! hardware interactions go through the `fftune_traits` collaborators.
//!
//! ## Architecture
//!
//! - **Configuration**: `TestConfig` and the derived `RampSchedule` (`config` module)
//! - **Sequencer**: pure phase machine with debounced operator choices (`sequencer` module)
//! - **Fitters**: kV/kStatic from the quasi-static ramp, kA from the constant-power run
//!   (`regression` module)
//! - **Runner**: host loop applying the sequencer's effects to the collaborators
//!   (`runner` module), wrapped by the `Tuner` builder
//! - **Reporting**: result formatting, prompts and CSV sample logs (`report`, `logger`)
//!
//! ## Numerics
//!
//! Everything runs in `f64`. The ramp fit integrates power instead of
//! differentiating position, so encoder noise is never amplified there.

pub mod builder;
pub mod config;
pub mod conversions;
pub mod effect;
pub mod error;
pub mod hw_error;
pub mod logger;
pub mod mocks;
pub mod regression;
pub mod report;
pub mod runner;
pub mod sample;
pub mod sequencer;
pub mod util;

pub use builder::{Missing, Set, Tuner, TunerBuilder};
pub use config::{RampSchedule, TestConfig, rpm_to_velocity};
pub use effect::{Effect, Prompt, TestKind};
pub use error::{BuildError, FitError, Report, Result, SampleError, TunerError};
pub use fftune_traits::Sample;
pub use logger::CsvLogSink;
pub use regression::{AccelResult, RampResult, fit_accel, fit_ramp};
pub use report::{TuneReport, format_accel, format_ramp};
pub use runner::RunParams;
pub use sample::SampleBuffer;
pub use sequencer::{Phase, TickInputs, TunerState, tick};
