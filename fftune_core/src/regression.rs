//! Least-squares fitters for the ramp and constant-power tests.
//!
//! The ramp fit never differentiates position. Integrating the quasi-static
//! model `power = kV * v + kStatic` over the recorded power profile gives a
//! position curve that is linear in `1/kV` and `kStatic/kV`:
//!
//! ```text
//! x(t) = c + (1/kV) * P(t) - (kStatic/kV) * (t - t0),   P(t) = ∫ power dτ from t0
//! ```
//!
//! `P(t)` is accumulated with the trapezoid rule, exact for a linear ramp.
//! The starting position `c` is fitted like any other coefficient, so a bad
//! first reading weighs no more than any other sample. Regressors and response
//! are centered before solving, which removes `c` from the normal equations.
//!
//! The accel fit differentiates position twice by central differences and
//! regresses the power left over after the ramp baseline against acceleration
//! through the origin.

use fftune_traits::Sample;

use crate::error::FitError;

/// Fewest samples the ramp fitter accepts.
pub const MIN_RAMP_SAMPLES: usize = 2;
/// Fewest samples that leave two acceleration estimates after differencing twice.
pub const MIN_ACCEL_SAMPLES: usize = 6;

/// Velocity gain, static-friction offset and fit quality from the ramp test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampResult {
    pub k_v: f64,
    pub k_static: f64,
    pub r_square: f64,
}

/// Acceleration gain and fit quality from the constant-power test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelResult {
    pub k_a: f64,
    pub r_square: f64,
}

impl RampResult {
    /// Power the velocity/friction terms predict at velocity `v`.
    #[inline]
    pub fn baseline_power(&self, v: f64) -> f64 {
        self.k_v * v + self.k_static * direction(v)
    }

    fn check_baseline(&self) -> Result<(), FitError> {
        if !(self.r_square.is_finite() && (0.0..=1.0).contains(&self.r_square)) {
            return Err(FitError::IncompatibleBaseline(
                "ramp r_square is not a valid fit statistic",
            ));
        }
        if !self.k_v.is_finite() || self.k_v == 0.0 {
            return Err(FitError::IncompatibleBaseline("ramp k_v is zero or non-finite"));
        }
        if !self.k_static.is_finite() {
            return Err(FitError::IncompatibleBaseline("ramp k_static is non-finite"));
        }
        Ok(())
    }
}

#[inline]
fn direction(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Fit kV (and kStatic when `fit_intercept`) to the quasi-static ramp samples.
pub fn fit_ramp(samples: &[Sample], fit_intercept: bool) -> Result<RampResult, FitError> {
    if samples.len() < MIN_RAMP_SAMPLES {
        return Err(FitError::InsufficientData {
            needed: MIN_RAMP_SAMPLES,
            got: samples.len(),
        });
    }
    if is_constant(samples.iter().map(|s| s.applied_power)) {
        return Err(FitError::SingularFit("power signal has zero variance"));
    }

    let t0 = samples[0].elapsed_time;
    let x0 = samples[0].position;

    // Regressors: integrated power `u`, elapsed time `w`; response: displacement `y`.
    let mut u = Vec::with_capacity(samples.len());
    let mut w = Vec::with_capacity(samples.len());
    let mut y = Vec::with_capacity(samples.len());
    u.push(0.0);
    w.push(0.0);
    y.push(0.0);
    let mut integral = 0.0f64;
    for pair in samples.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let dt = b.elapsed_time - a.elapsed_time;
        if !(dt > 0.0) {
            return Err(FitError::SingularFit("sample times must be strictly increasing"));
        }
        integral += 0.5 * (a.applied_power + b.applied_power) * dt;
        u.push(integral);
        w.push(b.elapsed_time - t0);
        y.push(b.position - x0);
    }

    let (alpha, beta, offset) = if fit_intercept {
        solve_two(&u, &w, &y)?
    } else {
        let (alpha, offset) = solve_one(&u, &y)?;
        (alpha, 0.0, offset)
    };
    if !alpha.is_finite() || alpha.abs() <= f64::EPSILON {
        return Err(FitError::SingularFit("no displacement, velocity gain undefined"));
    }

    let k_v = 1.0 / alpha;
    let k_static = -beta / alpha;
    let predicted = u
        .iter()
        .zip(&w)
        .map(|(ui, wi)| offset + alpha * ui + beta * wi);
    let r_square = r_square(&y, predicted);

    tracing::debug!(
        n = samples.len(),
        k_v,
        k_static,
        r_square,
        fit_intercept,
        "ramp regression"
    );
    Ok(RampResult {
        k_v,
        k_static,
        r_square,
    })
}

/// Fit kA to constant-power samples on top of a ramp baseline.
pub fn fit_accel(samples: &[Sample], ramp: &RampResult) -> Result<AccelResult, FitError> {
    ramp.check_baseline()?;
    if samples.len() < MIN_ACCEL_SAMPLES {
        return Err(FitError::InsufficientData {
            needed: MIN_ACCEL_SAMPLES,
            got: samples.len(),
        });
    }

    let t: Vec<f64> = samples.iter().map(|s| s.elapsed_time).collect();
    let x: Vec<f64> = samples.iter().map(|s| s.position).collect();
    // vel[k] is the velocity at sample k + 1.
    let vel = central_difference(&t, &x)?;
    // acc[j] is the acceleration at sample j + 2.
    let acc = central_difference(&t[1..t.len() - 1], &vel)?;

    let mut residual = Vec::with_capacity(acc.len());
    let mut saa = 0.0f64;
    let mut sar = 0.0f64;
    for (j, a) in acc.iter().copied().enumerate() {
        let v = vel[j + 1];
        let r = samples[j + 2].applied_power - ramp.baseline_power(v);
        saa += a * a;
        sar += a * r;
        residual.push(r);
    }
    if !(saa.is_finite() && saa > 0.0) || has_no_spread(&acc, saa) {
        return Err(FitError::SingularFit("acceleration estimate has zero variance"));
    }

    let k_a = sar / saa;
    let r_square = r_square(&residual, acc.iter().map(|a| k_a * a));

    tracing::debug!(n = samples.len(), k_a, r_square, "accel regression");
    Ok(AccelResult { k_a, r_square })
}

/// Central-difference derivative of `y` over `t`; drops both endpoints.
fn central_difference(t: &[f64], y: &[f64]) -> Result<Vec<f64>, FitError> {
    debug_assert_eq!(t.len(), y.len());
    let n = t.len().min(y.len());
    let mut out = Vec::with_capacity(n.saturating_sub(2));
    for i in 1..n.saturating_sub(1) {
        let dt = t[i + 1] - t[i - 1];
        if !(dt > 0.0) {
            return Err(FitError::SingularFit("sample times must be strictly increasing"));
        }
        out.push((y[i + 1] - y[i - 1]) / dt);
    }
    Ok(out)
}

fn mean(v: &[f64]) -> f64 {
    v.iter().sum::<f64>() / v.len() as f64
}

/// True when the spread of `v` about its mean is negligible next to its
/// raw sum of squares `sum_sq`.
fn has_no_spread(v: &[f64], sum_sq: f64) -> bool {
    let m = mean(v);
    let spread: f64 = v.iter().map(|a| (a - m) * (a - m)).sum();
    spread <= 1e-12 * sum_sq
}

/// Least squares for `y ≈ c + a * u`; returns `(a, c)`.
fn solve_one(u: &[f64], y: &[f64]) -> Result<(f64, f64), FitError> {
    let (mu, my) = (mean(u), mean(y));
    let (mut suu, mut suy) = (0.0f64, 0.0f64);
    for (a, b) in u.iter().zip(y) {
        suu += (a - mu) * (a - mu);
        suy += (a - mu) * (b - my);
    }
    if !(suu.is_finite() && suu > 0.0) {
        return Err(FitError::SingularFit("integrated power does not vary"));
    }
    let a = suy / suu;
    Ok((a, my - a * mu))
}

/// Least squares for `y ≈ c + a * u + b * w`; returns `(a, b, c)`.
///
/// Centering reduces the 3x3 normal equations to a 2x2 system in `a` and `b`,
/// solved by Cramer's rule.
fn solve_two(u: &[f64], w: &[f64], y: &[f64]) -> Result<(f64, f64, f64), FitError> {
    let (mu, mw, my) = (mean(u), mean(w), mean(y));
    let (mut suu, mut suw, mut sww, mut suy, mut swy) = (0.0f64, 0.0f64, 0.0f64, 0.0f64, 0.0f64);
    for ((a, b), c) in u.iter().zip(w).zip(y) {
        let (a, b, c) = (a - mu, b - mw, c - my);
        suu += a * a;
        suw += a * b;
        sww += b * b;
        suy += a * c;
        swy += b * c;
    }
    let det = suu * sww - suw * suw;
    // Relative test: det is a difference of two products of the same magnitude.
    if !det.is_finite() || det <= 1e-12 * suu * sww {
        return Err(FitError::SingularFit("power integral and time are collinear"));
    }
    let a = (suy * sww - swy * suw) / det;
    let b = (suu * swy - suw * suy) / det;
    Ok((a, b, my - a * mu - b * mw))
}

/// Coefficient of determination, clamped to [0, 1].
fn r_square(observed: &[f64], predicted: impl Iterator<Item = f64>) -> f64 {
    if observed.is_empty() {
        return 0.0;
    }
    let mean = observed.iter().sum::<f64>() / observed.len() as f64;
    let mut ss_tot = 0.0f64;
    let mut ss_res = 0.0f64;
    for (o, p) in observed.iter().zip(predicted) {
        ss_tot += (o - mean) * (o - mean);
        ss_res += (o - p) * (o - p);
    }
    if !(ss_tot > 0.0) {
        return if ss_res <= f64::EPSILON { 1.0 } else { 0.0 };
    }
    (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
}

fn is_constant(mut values: impl Iterator<Item = f64>) -> bool {
    let Some(first) = values.next() else {
        return true;
    };
    let (mut lo, mut hi) = (first, first);
    for v in values {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    let scale = lo.abs().max(hi.abs()).max(1.0);
    hi - lo <= f64::EPSILON * scale
}
