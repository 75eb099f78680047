//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

/// Config path tried when `--config` is not given.
pub const DEFAULT_CONFIG: &str = "etc/fftune.toml";

#[derive(Parser, Debug)]
#[command(
    name = "fftune",
    version,
    about = "Drivetrain feedforward tuner (kV, kStatic, kA)"
)]
pub struct Cli {
    /// Path to config TOML; defaults to etc/fftune.toml when present
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print results and errors as JSON instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides logging.level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the ramp and constant-power tests against the simulated drivetrain
    Run {
        /// Peak ramp power and accel-test power, in (0, 1]
        #[arg(long, value_name = "FRACTION")]
        max_power: Option<f64>,
        /// Room in front of the robot, in wheel_radius units
        #[arg(long, value_name = "DIST")]
        distance: Option<f64>,
        /// Answer "no" to fitting kStatic
        #[arg(long, action = ArgAction::SetTrue)]
        no_intercept: bool,
        /// Decline the constant-power (kA) test
        #[arg(long, action = ArgAction::SetTrue)]
        skip_accel: bool,
        /// Answer prompts from the keyboard (y = confirm, n = decline, q = abort)
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Answer prompts from the keyboard instead of the built-in script.\n\nType y (or just Enter) to confirm, n to decline and q to abort, each followed by Enter. Implies --realtime."
        )]
        interactive: bool,
        /// Pace the loop with the wall clock instead of simulated time
        #[arg(long, action = ArgAction::SetTrue)]
        realtime: bool,
        /// Override runner.tick_hz
        #[arg(long, value_name = "HZ")]
        tick_hz: Option<u32>,
        /// Directory for the per-phase CSV sample logs; overrides logging.dir
        #[arg(long, value_name = "DIR")]
        log_dir: Option<PathBuf>,
    },
    /// Re-fit gains from CSV sample logs written by a previous run
    Fit {
        /// Ramp-test sample log (time,position,power)
        #[arg(long, value_name = "FILE")]
        ramp: PathBuf,
        /// Constant-power sample log; fits kA on top of the ramp result
        #[arg(long, value_name = "FILE")]
        accel: Option<PathBuf>,
        /// Fit kV only, with kStatic fixed at zero
        #[arg(long, action = ArgAction::SetTrue)]
        no_intercept: bool,
    },
    /// Print the ramp schedule the configuration produces
    Schedule {
        #[arg(long, value_name = "FRACTION")]
        max_power: Option<f64>,
        #[arg(long, value_name = "DIST")]
        distance: Option<f64>,
    },
    /// Validate the configuration and exit
    SelfCheck,
}
