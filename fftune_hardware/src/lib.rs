//! Drivetrain and operator backends for the feedforward tuner.
//!
//! Only simulated backends live here: a first-order drivetrain plant with
//! static friction and a time-scripted operator. Both read time through the
//! shared `Clock` so a test clock drives them deterministically.

pub mod error;
pub mod operator;
pub mod sim;

pub use error::SimError;
pub use operator::{Button, Press, ScriptedOperator};
pub use sim::{PlantParams, SimulatedDrivetrain};
