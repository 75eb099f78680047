use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("commanded power {0} outside [-1, 1]")]
    PowerOutOfRange(f64),
    #[error("non-finite {0}")]
    NonFinite(&'static str),
    #[error("drivetrain fault: {0}")]
    Fault(String),
}

pub type Result<T> = std::result::Result<T, SimError>;
