use std::path::Path;
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::StreamError;
use crate::playback::{PlaybackConfig, SinkParams};
use crate::session::SynthesisParams;
use crate::BITS_PER_SAMPLE;

/// Default bound on chunks per run.
pub const DEFAULT_MAX_CHUNKS: usize = 500;

/// Upper bound accepted for `max_chunks`.
pub const MAX_CHUNKS_LIMIT: usize = 100_000;

/// Settings for one streaming run.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(default)]
#[serde(default)]
pub struct StreamConfig {
    /// Most chunks a run may produce; more is a `TooManyChunks` error.
    pub max_chunks: usize,
    /// Longest the playback thread waits on an empty queue, in milliseconds.
    pub backoff_ms: u64,
    /// Chunks to buffer before playback starts.
    pub wait_chunks: usize,
    /// Device-side buffer length requested from the sink, in milliseconds.
    pub buffering_ms: u32,
    /// Output device; `None` is the system default.
    #[builder(setter(into, strip_option))]
    pub device_index: Option<usize>,
    /// Speech pace in [0.7, 1.3]; `None` is the engine default.
    #[builder(setter(into, strip_option))]
    pub speech_rate: Option<f32>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_chunks: DEFAULT_MAX_CHUNKS,
            backoff_ms: 10,
            wait_chunks: 0,
            buffering_ms: 1000,
            device_index: None,
            speech_rate: None,
        }
    }
}

impl From<StreamConfigBuilderError> for StreamError {
    fn from(err: StreamConfigBuilderError) -> Self {
        StreamError::Config(err.to_string())
    }
}

impl StreamConfig {
    pub fn builder() -> StreamConfigBuilder {
        StreamConfigBuilder::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, StreamError> {
        let config: StreamConfig = serde_json::from_str(json)
            .map_err(|e| StreamError::Config(format!("Failed to parse JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, StreamError> {
        let content = std::fs::read_to_string(path)?;
        log::info!("Loading stream config from {}", path.display());
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), StreamError> {
        if self.max_chunks == 0 {
            return Err(StreamError::Config("max_chunks must be at least 1".to_string()));
        }
        if self.max_chunks > MAX_CHUNKS_LIMIT {
            return Err(StreamError::Config(format!(
                "max_chunks must be at most {MAX_CHUNKS_LIMIT}, got {}",
                self.max_chunks
            )));
        }
        if self.backoff_ms == 0 {
            return Err(StreamError::Config("backoff_ms must be at least 1".to_string()));
        }
        if self.buffering_ms == 0 {
            return Err(StreamError::Config("buffering_ms must be at least 1".to_string()));
        }
        self.synthesis_params().validate()
    }

    pub fn playback(&self) -> PlaybackConfig {
        PlaybackConfig {
            backoff: Duration::from_millis(self.backoff_ms),
            wait_chunks: self.wait_chunks,
        }
    }

    pub fn synthesis_params(&self) -> SynthesisParams {
        SynthesisParams {
            speech_rate: self.speech_rate,
        }
    }

    pub fn sink_params(&self, sample_rate: u32) -> SinkParams {
        SinkParams {
            sample_rate,
            bits_per_sample: BITS_PER_SAMPLE,
            buffering_ms: self.buffering_ms,
            device_index: self.device_index,
        }
    }
}
