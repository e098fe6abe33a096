//! Streaming synthesis sessions and the producer side of a run.
//!
//! A [`StreamingEngine`] opens [`StreamingSession`]s. A session is fed text
//! one token at a time and returns audio whenever it has enough context to
//! produce some; `flush` returns whatever is still pending at the end.
//!
//! [`Producer`] drives a session over tokenized text and hands each chunk to
//! both the playback queue and the accumulator, timing every engine call.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::accumulator::Accumulator;
use crate::chunk::Chunk;
use crate::error::{EngineError, StreamError};
use crate::queue::ChunkQueue;
use crate::timing::TimingRecorder;
use crate::tokenizer::tokenize;

/// Valid range for [`SynthesisParams::speech_rate`].
pub const SPEECH_RATE_RANGE: (f32, f32) = (0.7, 1.3);

/// Parameters applied to a whole streaming session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthesisParams {
    /// Pace of the speech. `None` uses the engine default.
    pub speech_rate: Option<f32>,
}

impl SynthesisParams {
    pub fn validate(&self) -> Result<(), StreamError> {
        let (lo, hi) = SPEECH_RATE_RANGE;
        match self.speech_rate {
            Some(rate) if !(lo..=hi).contains(&rate) => Err(StreamError::Config(format!(
                "speech_rate {rate} outside [{lo}, {hi}]"
            ))),
            _ => Ok(()),
        }
    }
}

/// An engine able to open incremental synthesis sessions.
///
/// Sessions may borrow the engine for as long as they are open.
pub trait StreamingEngine {
    type Session<'a>: StreamingSession
    where
        Self: 'a;

    /// Sample rate of every chunk this engine produces.
    fn sample_rate(&self) -> u32;

    fn open(&mut self, params: &SynthesisParams) -> Result<Self::Session<'_>, EngineError>;
}

/// One open incremental synthesis stream.
///
/// After any method returns an error the session state is undefined; the
/// only valid call left is [`close`](StreamingSession::close).
pub trait StreamingSession {
    /// Add one token of text, returning audio if some became available.
    fn feed(&mut self, token: &str) -> Result<Option<Vec<i16>>, EngineError>;

    /// Synthesize whatever text is still buffered.
    fn flush(&mut self) -> Result<Option<Vec<i16>>, EngineError>;

    fn close(self);
}

/// Producer half of a streaming run.
pub struct Producer<'a> {
    queue: &'a ChunkQueue,
    accumulator: &'a mut Accumulator,
    timing: &'a mut TimingRecorder,
    max_chunks: usize,
    chunks: usize,
}

impl<'a> Producer<'a> {
    pub fn new(
        queue: &'a ChunkQueue,
        accumulator: &'a mut Accumulator,
        timing: &'a mut TimingRecorder,
        max_chunks: usize,
    ) -> Self {
        Self {
            queue,
            accumulator,
            timing,
            max_chunks,
            chunks: 0,
        }
    }

    /// Chunks delivered so far.
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// Feed every token of `text` to `session`, flush it, and signal end of
    /// stream on the queue.
    ///
    /// Stops early without error if the queue was aborted by the consumer.
    /// The session is always closed.
    pub fn run<S: StreamingSession>(
        &mut self,
        mut session: S,
        text: &[u8],
    ) -> Result<usize, StreamError> {
        let result = self.feed_all(&mut session, text);
        session.close();
        result
    }

    fn feed_all<S: StreamingSession>(
        &mut self,
        session: &mut S,
        text: &[u8],
    ) -> Result<usize, StreamError> {
        for token in tokenize(text) {
            let token = token?;
            if self.queue.is_aborted() {
                log::warn!("Playback stopped; abandoning synthesis at byte {}", token.offset());
                return Ok(self.chunks);
            }
            if self.chunks >= self.max_chunks {
                return Err(StreamError::TooManyChunks {
                    limit: self.max_chunks,
                });
            }

            let start = Instant::now();
            let pcm = session.feed(token.as_str()).map_err(|e| {
                log::error!("Error adding token {:?}: {}", token.as_str(), e.message);
                e
            })?;
            self.deliver(pcm, start)?;
        }

        let start = Instant::now();
        let pcm = session.flush().map_err(|e| {
            log::error!("Error flushing stream: {}", e.message);
            e
        })?;
        self.deliver(pcm, start)?;

        self.queue.finish();
        Ok(self.chunks)
    }

    fn deliver(&mut self, pcm: Option<Vec<i16>>, start: Instant) -> Result<(), StreamError> {
        let end = Instant::now();
        let samples = match pcm {
            Some(samples) if !samples.is_empty() => samples,
            _ => return Ok(()),
        };
        if self.chunks >= self.max_chunks {
            return Err(StreamError::TooManyChunks {
                limit: self.max_chunks,
            });
        }

        self.accumulator.append(&samples)?;
        self.timing.record(samples.len(), start, end);
        self.chunks += 1;
        self.queue.push_rear(Chunk::new(samples));
        Ok(())
    }
}
