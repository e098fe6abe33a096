//! Playback consumer: drains the chunk queue into an audio sink on its own thread.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::chunk::Message;
use crate::error::StreamError;
use crate::queue::ChunkQueue;

/// Output device parameters handed to a [`SinkFactory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkParams {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub buffering_ms: u32,
    /// `None` selects the default device.
    pub device_index: Option<usize>,
}

/// A real-time audio output.
///
/// `write` may accept fewer samples than offered; the caller is responsible
/// for resubmitting the remainder. Counts are in samples, not bytes.
pub trait AudioSink {
    fn start(&mut self) -> Result<(), StreamError>;

    fn write(&mut self, samples: &[i16]) -> Result<usize, StreamError>;

    /// Write `samples` and block until everything buffered has been played.
    fn flush(&mut self, samples: &[i16]) -> Result<usize, StreamError>;

    fn stop(&mut self) -> Result<(), StreamError>;
}

/// Opens [`AudioSink`]s for a given output format.
pub trait SinkFactory {
    type Sink: AudioSink + Send + 'static;

    fn open(&self, params: &SinkParams) -> Result<Self::Sink, StreamError>;

    /// Names of the available output devices, indexed by `device_index`.
    fn devices(&self) -> Result<Vec<String>, StreamError> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// Longest the consumer sleeps on an empty queue before checking again.
    pub backoff: Duration,
    /// Chunks to buffer before the first write.
    pub wait_chunks: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            backoff: Duration::from_millis(10),
            wait_chunks: 0,
        }
    }
}

/// What the consumer did over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackReport {
    pub chunks_played: usize,
    pub samples_written: usize,
    pub writes: usize,
    pub short_writes: usize,
    /// True when the run ended on an abort rather than end of stream.
    pub aborted: bool,
}

/// Drain `queue` into `sink` until end of stream or abort.
///
/// The sink must already be started; it is stopped before returning.
pub fn drain_queue<S: AudioSink>(
    sink: &mut S,
    queue: &ChunkQueue,
    config: PlaybackConfig,
) -> Result<PlaybackReport, StreamError> {
    let result = play(sink, queue, config);
    if result.is_err() {
        queue.abort();
    }
    let stopped = sink.stop();
    let report = result?;
    stopped?;
    Ok(report)
}

fn play<S: AudioSink>(
    sink: &mut S,
    queue: &ChunkQueue,
    config: PlaybackConfig,
) -> Result<PlaybackReport, StreamError> {
    let mut report = PlaybackReport::default();

    if config.wait_chunks > 0 {
        log::debug!("Buffering {} chunks before playback", config.wait_chunks);
        while !queue.wait_buffered(config.wait_chunks, config.backoff) {}
    }

    loop {
        let Some(message) = queue.pop_front_timeout(config.backoff) else {
            continue;
        };

        let chunk = match message {
            Message::Chunk(chunk) => chunk,
            Message::EndOfStream => {
                sink.flush(&[])?;
                log::debug!("Playback reached end of stream");
                return Ok(report);
            }
            Message::Abort => {
                log::debug!("Playback aborted");
                report.aborted = true;
                return Ok(report);
            }
        };

        let requested = chunk.len();
        let written = sink.write(chunk.samples())?.min(requested);
        report.writes += 1;
        report.samples_written += written;

        match chunk.into_tail(written) {
            Some(tail) => {
                log::debug!(
                    "Short write: {written} of {requested} samples, requeueing {}",
                    tail.len()
                );
                report.short_writes += 1;
                queue.push_front(tail);
                if written == 0 {
                    // Device buffer is full; give it time to drain.
                    thread::sleep(config.backoff);
                }
            }
            None => report.chunks_played += 1,
        }
    }
}

/// Handle to the playback thread of one run.
#[derive(Debug)]
pub struct PlaybackWorker {
    handle: JoinHandle<Result<PlaybackReport, StreamError>>,
}

impl PlaybackWorker {
    /// Move a started sink onto a dedicated thread that drains `queue`.
    pub fn spawn<S>(
        mut sink: S,
        queue: Arc<ChunkQueue>,
        config: PlaybackConfig,
    ) -> Result<Self, StreamError>
    where
        S: AudioSink + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name("tts-playback".to_string())
            .spawn(move || drain_queue(&mut sink, &queue, config))?;
        Ok(Self { handle })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the playback thread to exit.
    pub fn join(self) -> Result<PlaybackReport, StreamError> {
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => {
                log::error!("Playback worker panicked");
                Err(StreamError::WorkerPanicked)
            }
        }
    }
}

/// A sink that records everything written to it instead of playing it.
///
/// Clones share the same recording, so a clone kept by the caller can read
/// what the playback thread wrote. `max_write` caps how many samples a single
/// `write` accepts, which forces short writes.
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    recorded: Arc<Mutex<Vec<i16>>>,
    max_write: Option<usize>,
    running: bool,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_write(max_write: usize) -> Self {
        Self {
            max_write: Some(max_write),
            ..Self::default()
        }
    }

    pub fn recorded(&self) -> Vec<i16> {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, samples: &[i16]) {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(samples);
    }
}

impl AudioSink for CaptureSink {
    fn start(&mut self) -> Result<(), StreamError> {
        self.running = true;
        Ok(())
    }

    fn write(&mut self, samples: &[i16]) -> Result<usize, StreamError> {
        if !self.running {
            return Err(StreamError::sink("capture sink written before start"));
        }
        let n = self.max_write.map_or(samples.len(), |m| m.min(samples.len()));
        self.record(&samples[..n]);
        Ok(n)
    }

    fn flush(&mut self, samples: &[i16]) -> Result<usize, StreamError> {
        if !self.running {
            return Err(StreamError::sink("capture sink flushed before start"));
        }
        self.record(samples);
        Ok(samples.len())
    }

    fn stop(&mut self) -> Result<(), StreamError> {
        self.running = false;
        Ok(())
    }
}

impl SinkFactory for CaptureSink {
    type Sink = CaptureSink;

    fn open(&self, _params: &SinkParams) -> Result<Self::Sink, StreamError> {
        Ok(self.clone())
    }

    fn devices(&self) -> Result<Vec<String>, StreamError> {
        Ok(vec!["capture".to_string()])
    }
}
