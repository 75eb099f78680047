use thiserror::Error;

/// Why a regression could not produce coefficients.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FitError {
    #[error("insufficient data: need at least {needed} samples, got {got}")]
    InsufficientData { needed: usize, got: usize },
    #[error("singular fit: {0}")]
    SingularFit(&'static str),
    #[error("incompatible baseline: {0}")]
    IncompatibleBaseline(&'static str),
}

#[derive(Debug, Error, Clone)]
pub enum TunerError {
    #[error("drivetrain error: {0}")]
    Drivetrain(String),
    #[error("drivetrain fault: {0}")]
    DrivetrainFault(String),
    #[error("log write failed: {0}")]
    LogWrite(String),
    #[error("fit failed: {0}")]
    Fit(#[from] FitError),
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing drivetrain")]
    MissingDrivetrain,
    #[error("missing operator input")]
    MissingOperator,
    #[error("missing max velocity")]
    MissingMaxVelocity,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

/// A sample the buffer refused to append.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum SampleError {
    #[error("sample time {t} does not follow previous time {last}")]
    OutOfOrder { t: f64, last: f64 },
    #[error("sample has a negative or non-finite time: {0}")]
    BadTime(f64),
    #[error("sample power {0} outside [-1, 1]")]
    PowerOutOfRange(f64),
    #[error("sample position is not finite")]
    BadPosition,
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
