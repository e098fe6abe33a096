//! Per-chunk synthesis timing.

use std::time::{Duration, Instant};

/// Timing of one produced chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkTiming {
    pub num_samples: usize,
    pub start: Instant,
    pub end: Instant,
}

impl ChunkTiming {
    /// Wall time the engine spent producing the chunk.
    pub fn processing_time(&self) -> Duration {
        self.end.saturating_duration_since(self.start)
    }

    /// Length of the produced audio.
    pub fn audio_duration(&self, sample_rate: u32) -> Duration {
        if sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.num_samples as f64 / sample_rate as f64)
    }

    /// Audio seconds produced per second of processing.
    pub fn real_time_factor(&self, sample_rate: u32) -> Option<f64> {
        ratio(self.audio_duration(sample_rate), self.processing_time())
    }
}

fn ratio(audio: Duration, processing: Duration) -> Option<f64> {
    let secs = processing.as_secs_f64();
    (secs > 0.0).then(|| audio.as_secs_f64() / secs)
}

// Larger tables grow on demand.
const PREALLOCATED_ENTRIES: usize = 512;

/// Records one [`ChunkTiming`] per produced chunk, up to a fixed capacity.
#[derive(Debug, Clone)]
pub struct TimingRecorder {
    run_start: Instant,
    entries: Vec<ChunkTiming>,
    capacity: usize,
    dropped: usize,
}

impl TimingRecorder {
    pub fn new(capacity: usize) -> Self {
        Self::starting_at(Instant::now(), capacity)
    }

    pub fn starting_at(run_start: Instant, capacity: usize) -> Self {
        Self {
            run_start,
            entries: Vec::with_capacity(capacity.min(PREALLOCATED_ENTRIES)),
            capacity,
            dropped: 0,
        }
    }

    /// Record a chunk. Entries past capacity are discarded with a warning;
    /// a missing entry only degrades the report.
    pub fn record(&mut self, num_samples: usize, start: Instant, end: Instant) {
        if self.entries.len() >= self.capacity {
            self.dropped += 1;
            log::warn!(
                "Timing table full ({} entries); chunk of {num_samples} samples not recorded",
                self.capacity
            );
            return;
        }
        self.entries.push(ChunkTiming {
            num_samples,
            start,
            end,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn finish(self, sample_rate: u32) -> TimingReport {
        TimingReport {
            run_start: self.run_start,
            entries: self.entries,
            dropped: self.dropped,
            sample_rate,
        }
    }
}

/// Read-only timing summary of a finished run.
#[derive(Debug, Clone)]
pub struct TimingReport {
    run_start: Instant,
    entries: Vec<ChunkTiming>,
    dropped: usize,
    sample_rate: u32,
}

impl TimingReport {
    pub fn chunks(&self) -> &[ChunkTiming] {
        &self.entries
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Entries that did not fit the timing table.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Last chunk's end minus first chunk's start.
    pub fn total_elapsed(&self) -> Duration {
        match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => last.end.saturating_duration_since(first.start),
            _ => Duration::ZERO,
        }
    }

    /// Delay from the start of the run until the first chunk was available.
    pub fn first_audio_latency(&self) -> Option<Duration> {
        self.entries
            .first()
            .map(|first| first.end.saturating_duration_since(self.run_start))
    }

    pub fn total_audio(&self) -> Duration {
        self.entries
            .iter()
            .map(|e| e.audio_duration(self.sample_rate))
            .sum()
    }

    pub fn real_time_factor(&self) -> Option<f64> {
        ratio(self.total_audio(), self.total_elapsed())
    }

    pub fn log_summary(&self) {
        let n = self.entries.len();
        log::info!(
            "Generated {n} audio chunk{} in {:.2} seconds",
            if n == 1 { "" } else { "s" },
            self.total_elapsed().as_secs_f64()
        );
        if let Some(latency) = self.first_audio_latency() {
            log::info!("Audio available after {:.2} seconds", latency.as_secs_f64());
        }
        for (i, entry) in self.entries.iter().enumerate() {
            log::info!(
                "Audio chunk #{i}: length: {:.2} s, processing time {:.2} s",
                entry.audio_duration(self.sample_rate).as_secs_f64(),
                entry.processing_time().as_secs_f64()
            );
        }
        if self.dropped > 0 {
            log::warn!("{} chunks missing from timing report", self.dropped);
        }
    }
}
