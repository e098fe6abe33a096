use crate::error::StreamError;
use crate::SynthesisResult;

/// Collects every produced chunk, in production order, into one buffer.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    samples: Vec<i16>,
    chunks: usize,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `samples` onto the end of the buffer.
    pub fn append(&mut self, samples: &[i16]) -> Result<(), StreamError> {
        self.samples
            .try_reserve(samples.len())
            .map_err(|_| StreamError::AllocationFailure {
                requested: samples.len(),
            })?;
        self.samples.extend_from_slice(samples);
        self.chunks += 1;
        Ok(())
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn into_result(self, sample_rate: u32) -> SynthesisResult {
        SynthesisResult {
            samples: self.samples,
            sample_rate,
        }
    }
}
