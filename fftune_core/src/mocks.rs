//! Test and helper doubles for fftune_core

use fftune_traits::{BoxError, Drivetrain, LogSink, OperatorInput, Sample};

/// Log sink that keeps every table in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub tables: Vec<(String, Vec<Sample>)>,
}

impl LogSink for MemorySink {
    fn write(&mut self, samples: &[Sample], filename: &str) -> Result<(), BoxError> {
        self.tables.push((filename.to_string(), samples.to_vec()));
        Ok(())
    }
}

/// Log sink that refuses every write.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingSink;

impl LogSink for FailingSink {
    fn write(&mut self, _samples: &[Sample], _filename: &str) -> Result<(), BoxError> {
        Err(Box::new(std::io::Error::other("log storage unavailable")))
    }
}

/// Drivetrain that never moves; remembers the last commanded power.
#[derive(Debug, Default, Clone)]
pub struct StillDrive {
    pub position: f64,
    pub last_power: Option<f64>,
}

impl Drivetrain for StillDrive {
    fn set_axial_power(&mut self, power: f64) -> Result<(), BoxError> {
        self.last_power = Some(power);
        Ok(())
    }
    fn axial_position(&mut self) -> Result<f64, BoxError> {
        Ok(self.position)
    }
    fn advance_pose_estimate(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Button levels for one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Levels {
    pub confirm: bool,
    pub decline: bool,
    pub abort: bool,
}

/// Operator replaying one `Levels` entry per tick; all released once exhausted.
///
/// The host polls confirm, decline, then abort each tick, so the script
/// advances on `abort_requested`.
#[derive(Debug, Default, Clone)]
pub struct ScriptedButtons {
    levels: Vec<Levels>,
    tick: usize,
}

impl ScriptedButtons {
    pub fn new(levels: Vec<Levels>) -> Self {
        Self { levels, tick: 0 }
    }

    /// Never presses anything.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Released for `ticks` ticks, then abort.
    pub fn abort_after(ticks: usize) -> Self {
        let mut levels = vec![Levels::default(); ticks];
        levels.push(Levels {
            abort: true,
            ..Levels::default()
        });
        Self::new(levels)
    }

    fn current(&self) -> Levels {
        self.levels.get(self.tick).copied().unwrap_or_default()
    }
}

impl OperatorInput for ScriptedButtons {
    fn confirm_pressed(&mut self) -> bool {
        self.current().confirm
    }
    fn decline_pressed(&mut self) -> bool {
        self.current().decline
    }
    fn abort_requested(&mut self) -> bool {
        let abort = self.current().abort;
        self.tick += 1;
        abort
    }
}
