//! Append-only telemetry buffer owned by one running test phase.

use fftune_traits::Sample;

use crate::error::SampleError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<Sample>,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            samples: Vec::with_capacity(n),
        }
    }

    /// Append a sample, keeping elapsed time strictly increasing.
    pub fn push(&mut self, sample: Sample) -> Result<(), SampleError> {
        if !sample.elapsed_time.is_finite() || sample.elapsed_time < 0.0 {
            return Err(SampleError::BadTime(sample.elapsed_time));
        }
        if !sample.position.is_finite() {
            return Err(SampleError::BadPosition);
        }
        if !(-1.0..=1.0).contains(&sample.applied_power) {
            return Err(SampleError::PowerOutOfRange(sample.applied_power));
        }
        if let Some(last) = self.samples.last()
            && sample.elapsed_time <= last.elapsed_time
        {
            return Err(SampleError::OutOfOrder {
                t: sample.elapsed_time,
                last: last.elapsed_time,
            });
        }
        self.samples.push(sample);
        Ok(())
    }

    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }
}
