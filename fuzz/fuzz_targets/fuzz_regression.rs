#![no_main]
use libfuzzer_sys::fuzz_target;

use fftune_core::{Sample, SampleBuffer, fit_accel, fit_ramp};

fuzz_target!(|rows: Vec<(f64, f64, f64)>| {
    // Only rows the live buffer accepts reach the fitters.
    let mut buffer = SampleBuffer::with_capacity(rows.len());
    for (t, x, p) in rows {
        let _ = buffer.push(Sample::new(t, x, p));
    }
    let samples = buffer.into_samples();
    for fit_intercept in [true, false] {
        if let Ok(ramp) = fit_ramp(&samples, fit_intercept) {
            assert!(ramp.k_v.is_finite() && ramp.k_v != 0.0);
            let _ = fit_accel(&samples, &ramp);
        }
    }
});
