//! Maps `Box<dyn Error>` from trait boundaries to typed `TunerError`.
//!
//! The drivetrain trait returns boxed errors so any backend can plug in; this
//! module turns them into our error enum, with a feature-gated path that
//! downcasts `fftune_hardware::SimError` precisely.

use crate::error::TunerError;

/// Map a drivetrain error to a typed `TunerError`.
///
/// Known hardware error types are downcast first, then the message is
/// inspected as a fallback.
pub fn map_drive_error(e: &(dyn std::error::Error + 'static)) -> TunerError {
    #[cfg(feature = "hardware-errors")]
    {
        use fftune_hardware::SimError;
        if let Some(sim) = e.downcast_ref::<SimError>() {
            return match sim {
                SimError::PowerOutOfRange(_) | SimError::NonFinite(_) => {
                    TunerError::Drivetrain(sim.to_string())
                }
                SimError::Fault(_) => TunerError::DrivetrainFault(sim.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("fault") {
        TunerError::DrivetrainFault(s)
    } else {
        TunerError::Drivetrain(s)
    }
}
