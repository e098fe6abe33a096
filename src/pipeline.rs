//! One streaming run: synthesis on the calling thread, playback on a worker.

use std::sync::Arc;
use std::time::Instant;

use crate::accumulator::Accumulator;
use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::playback::{AudioSink, PlaybackReport, PlaybackWorker, SinkFactory};
use crate::queue::ChunkQueue;
use crate::session::{Producer, StreamingEngine, StreamingSession};
use crate::timing::{TimingRecorder, TimingReport};
use crate::SynthesisResult;

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct StreamOutcome {
    /// All produced audio, in production order.
    pub audio: SynthesisResult,
    pub timing: TimingReport,
    pub playback: PlaybackReport,
}

impl StreamOutcome {
    pub fn num_chunks(&self) -> usize {
        self.timing.chunks().len()
    }
}

/// Owns the playback worker for the duration of a run.
///
/// Unwinding out of `run` drops the guard, which aborts the queue and joins
/// the worker so the sink is always stopped.
struct PlaybackGuard {
    queue: Arc<ChunkQueue>,
    worker: Option<PlaybackWorker>,
}

impl PlaybackGuard {
    fn join(mut self) -> Result<PlaybackReport, StreamError> {
        match self.worker.take() {
            Some(worker) => worker.join(),
            None => Err(StreamError::WorkerPanicked),
        }
    }
}

impl Drop for PlaybackGuard {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.queue.abort();
            if let Err(e) = worker.join() {
                log::warn!("Playback ended with error during unwind: {e}");
            }
        }
    }
}

pub struct StreamPipeline {
    config: StreamConfig,
}

impl StreamPipeline {
    pub fn new(config: StreamConfig) -> Result<Self, StreamError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Output devices offered by `sinks`, for diagnostics.
    pub fn devices<F: SinkFactory>(sinks: &F) -> Result<Vec<String>, StreamError> {
        let devices = sinks.devices()?;
        for (i, name) in devices.iter().enumerate() {
            log::info!("Device #{i}: {name}");
        }
        Ok(devices)
    }

    /// Synthesize `text`, playing it through a sink from `sinks` as it is
    /// produced.
    ///
    /// Returns once the playback thread has drained the queue and exited. On
    /// failure the session is closed, playback is aborted, the sink is stopped
    /// and the worker joined before the error is returned.
    pub fn run<E, F, T>(
        &self,
        engine: &mut E,
        sinks: &F,
        text: &T,
    ) -> Result<StreamOutcome, StreamError>
    where
        E: StreamingEngine,
        F: SinkFactory,
        T: AsRef<[u8]> + ?Sized,
    {
        let run_start = Instant::now();
        let sample_rate = engine.sample_rate();
        let session = engine.open(&self.config.synthesis_params())?;
        log::info!("Opened synthesis stream at {sample_rate} Hz");

        let queue = Arc::new(ChunkQueue::new());
        let guard = match self.start_playback(sinks, sample_rate, &queue) {
            Ok(worker) => PlaybackGuard {
                queue: Arc::clone(&queue),
                worker: Some(worker),
            },
            Err(e) => {
                session.close();
                return Err(e);
            }
        };

        let mut accumulator = Accumulator::new();
        let mut timing = TimingRecorder::starting_at(run_start, self.config.max_chunks);
        let produced = Producer::new(
            &queue,
            &mut accumulator,
            &mut timing,
            self.config.max_chunks,
        )
        .run(session, text.as_ref());

        if let Err(e) = &produced {
            log::error!("Synthesis failed: {e}");
            queue.abort();
        }
        let playback = guard.join();

        let chunks = produced?;
        let playback = playback?;
        log::info!(
            "Produced {chunks} chunks ({} samples); played {} samples with {} short writes",
            accumulator.num_samples(),
            playback.samples_written,
            playback.short_writes
        );

        Ok(StreamOutcome {
            audio: accumulator.into_result(sample_rate),
            timing: timing.finish(sample_rate),
            playback,
        })
    }

    fn start_playback<F: SinkFactory>(
        &self,
        sinks: &F,
        sample_rate: u32,
        queue: &Arc<ChunkQueue>,
    ) -> Result<PlaybackWorker, StreamError> {
        let mut sink = sinks.open(&self.config.sink_params(sample_rate))?;
        sink.start()?;
        PlaybackWorker::spawn(sink, Arc::clone(queue), self.config.playback())
    }
}
