//! Conversions bridging `fftune_config` types to `fftune_core` types.

use fftune_traits::Sample;

use crate::config::TestConfig;
use crate::error::{Report, SampleError};
use crate::runner::RunParams;
use crate::sample::SampleBuffer;

impl TryFrom<&fftune_config::TestCfg> for TestConfig {
    type Error = Report;
    fn try_from(c: &fftune_config::TestCfg) -> Result<Self, Self::Error> {
        Self::new(c.max_power, c.distance, c.fit_intercept)
    }
}

impl From<&fftune_config::RunnerCfg> for RunParams {
    fn from(c: &fftune_config::RunnerCfg) -> Self {
        Self {
            tick_hz: c.tick_hz,
            timeout: (c.timeout_s > 0).then(|| std::time::Duration::from_secs(c.timeout_s)),
        }
    }
}

/// Validate CSV rows into samples, rejecting anything the live buffer would.
pub fn samples_from_rows(rows: &[fftune_config::SampleRow]) -> Result<Vec<Sample>, SampleError> {
    let mut buffer = SampleBuffer::with_capacity(rows.len());
    for row in rows {
        buffer.push(Sample::new(row.time, row.position, row.power))?;
    }
    Ok(buffer.into_samples())
}
