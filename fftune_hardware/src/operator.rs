//! Operator stand-in that presses buttons on a time script.

use std::sync::Arc;
use std::time::Instant;

use fftune_traits::{Clock, OperatorInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Confirm,
    Decline,
    Abort,
}

/// One button held from `start_s` for `duration_s` seconds after construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Press {
    pub start_s: f64,
    pub duration_s: f64,
    pub button: Button,
}

impl Press {
    pub fn new(button: Button, start_s: f64, duration_s: f64) -> Self {
        Self {
            start_s,
            duration_s,
            button,
        }
    }

    fn held_at(&self, t: f64) -> bool {
        t >= self.start_s && t < self.start_s + self.duration_s
    }
}

const HOLD_S: f64 = 0.1;
const GAP_S: f64 = 0.3;

pub struct ScriptedOperator {
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    presses: Vec<Press>,
}

impl core::fmt::Debug for ScriptedOperator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScriptedOperator")
            .field("presses", &self.presses)
            .finish_non_exhaustive()
    }
}

impl ScriptedOperator {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>, presses: Vec<Press>) -> Self {
        let epoch = clock.now();
        Self {
            clock,
            epoch,
            presses,
        }
    }

    /// Answer every prompt of a full routine in order.
    ///
    /// `ramp_duration` is the ramp test length in seconds; the accel-choice
    /// answer is placed safely after it. When `run_accel` is false the
    /// constant-power test is declined.
    pub fn auto(
        clock: Arc<dyn Clock + Send + Sync>,
        ramp_duration: f64,
        fit_intercept: bool,
        run_accel: bool,
    ) -> Self {
        let mut t = 0.1;
        let mut presses = vec![Press::new(Button::Confirm, t, HOLD_S)];
        t += GAP_S;
        let intercept = if fit_intercept {
            Button::Confirm
        } else {
            Button::Decline
        };
        presses.push(Press::new(intercept, t, HOLD_S));
        t += GAP_S;
        presses.push(Press::new(Button::Confirm, t, HOLD_S));
        // Ramp starts on release; leave margin for tick quantization.
        t += HOLD_S + ramp_duration + 0.5;
        if run_accel {
            presses.push(Press::new(Button::Confirm, t, HOLD_S));
            t += GAP_S;
            presses.push(Press::new(Button::Confirm, t, HOLD_S));
        } else {
            presses.push(Press::new(Button::Decline, t, HOLD_S));
        }
        Self::new(clock, presses)
    }

    /// Also request an abort from `at_s` onwards.
    #[must_use]
    pub fn with_abort_at(mut self, at_s: f64) -> Self {
        self.presses
            .push(Press::new(Button::Abort, at_s, f64::INFINITY));
        self
    }

    pub fn presses(&self) -> &[Press] {
        &self.presses
    }

    fn level(&self, button: Button) -> bool {
        let t = self.clock.secs_since(self.epoch);
        self.presses
            .iter()
            .any(|p| p.button == button && p.held_at(t))
    }
}

impl OperatorInput for ScriptedOperator {
    fn confirm_pressed(&mut self) -> bool {
        self.level(Button::Confirm)
    }
    fn decline_pressed(&mut self) -> bool {
        self.level(Button::Decline)
    }
    fn abort_requested(&mut self) -> bool {
        self.level(Button::Abort)
    }
}
