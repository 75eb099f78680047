#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validate arbitrary TOML; errors are fine, panics are not.
    if let Ok(cfg) = fftune_config::load_toml(data) {
        if cfg.validate().is_ok() {
            // A valid config must always map onto a schedule.
            let tc = fftune_core::TestConfig::try_from(&cfg.test);
            if let Ok(tc) = tc {
                let _ = fftune_core::RampSchedule::new(&tc, cfg.drive.max_velocity());
            }
        }
    }
});
