use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use fftune_core::{RampResult, RampSchedule, Sample, TestConfig, fit_accel, fit_ramp};

// Quasi-static ramp positions with additive white noise
fn synth_ramp(dt: f64, noise_amp: f64, seed: u32) -> Vec<Sample> {
    // tiny PRNG
    let mut state = seed.max(1);
    let mut next_f64 = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        f64::from(x) / (f64::from(u32::MAX) + 1.0)
    };
    let cfg = TestConfig::default();
    let s = RampSchedule::new(&cfg, 60.0).unwrap_or_else(|e| panic!("{e}"));
    let n = (s.ramp_duration / dt) as usize;
    (0..=n)
        .map(|i| {
            let t = i as f64 * dt;
            let noise = (next_f64() * 2.0 - 1.0) * noise_amp;
            Sample::new(
                t,
                s.ideal_ramp_position(t, 0.0167, 0.02) + noise,
                s.ramp_power(t),
            )
        })
        .collect()
}

// First-order response to a constant power step
fn synth_accel(dt: f64, n: usize) -> Vec<Sample> {
    let (k_v, k_s, k_a, p) = (0.0167, 0.02, 0.002, 0.7);
    let v_ss = (p - k_s) / k_v;
    let tau = k_a / k_v;
    (0..n)
        .map(|i| {
            let t = i as f64 * dt;
            Sample::new(t, v_ss * (t - tau * (1.0 - (-t / tau).exp())), p)
        })
        .collect()
}

fn configure(g: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>) {
    // Allow quick tweaking without CLI flags (Criterion 0.5):
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p fftune_core --bench regression
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(10));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms.max(1)));
    }
}

pub fn bench_fit_ramp(c: &mut Criterion) {
    let mut g = c.benchmark_group("fit_ramp");
    configure(&mut g);
    for &(name, dt) in &[("100hz", 0.01), ("1khz", 0.001)] {
        let samples = synth_ramp(dt, 0.2, 12345);
        g.bench_function(name, |b| {
            b.iter_batched(
                || samples.clone(),
                |s| black_box(fit_ramp(black_box(&s), true)),
                BatchSize::SmallInput,
            )
        });
    }
    g.finish();
}

pub fn bench_fit_accel(c: &mut Criterion) {
    let mut g = c.benchmark_group("fit_accel");
    configure(&mut g);
    let ramp = RampResult {
        k_v: 0.0167,
        k_static: 0.02,
        r_square: 1.0,
    };
    let samples = synth_accel(0.005, 334);
    g.bench_function("200hz", |b| {
        b.iter(|| black_box(fit_accel(black_box(&samples), black_box(&ramp))))
    });
    g.finish();
}

criterion_group!(benches, bench_fit_ramp, bench_fit_accel);
criterion_main!(benches);
