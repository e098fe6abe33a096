//! # tts-stream
//!
//! Incremental text-to-speech: text is fed to a streaming synthesis session
//! one codepoint at a time, the audio it produces is played back in real time
//! on a dedicated thread, and the whole signal is collected for saving as WAV.
//!
//! ## Features
//!
//! - **Codepoint tokenizer**: never splits a multi-byte character across feeds
//! - **Playback queue**: short device writes are requeued at the front, so no
//!   sample is dropped or reordered
//! - **Timing report**: per-chunk processing time, audio length and time to
//!   first audio
//! - **Batch engine adapter**: any [`SynthesisEngine`] can be streamed by
//!   sentence with [`engines::buffered::BufferedEngine`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::path::Path;
//! use tts_stream::{CaptureSink, StreamConfig, StreamPipeline};
//!
//! let mut engine = MyStreamingEngine::open("models/voice")?;
//! let pipeline = StreamPipeline::new(StreamConfig::default())?;
//! let outcome = pipeline.run(&mut engine, &CaptureSink::new(), "Hello, world!")?;
//! outcome.audio.write_wav(Path::new("output.wav"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod accumulator;
pub mod chunk;
pub mod config;
pub mod engines;
pub mod error;
pub mod pipeline;
pub mod playback;
pub mod queue;
pub mod session;
pub mod timing;
pub mod tokenizer;

pub use accumulator::Accumulator;
pub use chunk::{Chunk, Message};
pub use config::{StreamConfig, StreamConfigBuilder};
pub use error::{EngineError, StreamError};
pub use pipeline::{StreamOutcome, StreamPipeline};
pub use playback::{AudioSink, CaptureSink, PlaybackReport, SinkFactory, SinkParams};
pub use queue::ChunkQueue;
pub use session::{StreamingEngine, StreamingSession, SynthesisParams};
pub use timing::{TimingRecorder, TimingReport};
pub use tokenizer::{tokenize, Token, Tokens};

use std::path::Path;

/// Bit depth of all audio handled by this crate.
pub const BITS_PER_SAMPLE: u16 = 16;

/// Synthesized audio: mono 16-bit PCM and its sample rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisResult {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl SynthesisResult {
    /// Write the audio to a mono 16-bit PCM WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<(), StreamError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: BITS_PER_SAMPLE,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        log::info!("Saved {} samples to {}", self.samples.len(), path.display());
        Ok(())
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Common interface for whole-utterance text-to-speech engines.
///
/// These engines take a complete piece of text and return all of its audio
/// at once. Wrap one in [`engines::buffered::BufferedEngine`] to stream it.
pub trait SynthesisEngine {
    /// Parameters for configuring inference behavior (voice, speed, etc.)
    type SynthesisParams;
    /// Parameters for configuring model loading (threads, etc.)
    type ModelParams: Default;

    /// Load a model from the specified path using default parameters.
    fn load_model(&mut self, model_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        self.load_model_with_params(model_path, Self::ModelParams::default())
    }

    /// Load a model from the specified path with custom parameters.
    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Unload the currently loaded model and free associated resources.
    fn unload_model(&mut self);

    /// Sample rate of the audio returned by [`synthesize`](Self::synthesize).
    fn sample_rate(&self) -> u32;

    /// Synthesize speech from the given text.
    fn synthesize(
        &mut self,
        text: &str,
        params: Option<Self::SynthesisParams>,
    ) -> Result<SynthesisResult, Box<dyn std::error::Error>>;

    /// Synthesize speech from the given text and write to a WAV file.
    fn synthesize_to_file(
        &mut self,
        text: &str,
        wav_path: &Path,
        params: Option<Self::SynthesisParams>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.synthesize(text, params)?.write_wav(wav_path)?;
        Ok(())
    }
}
