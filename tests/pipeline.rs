use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tts_stream::engines::buffered::BufferedEngine;
use tts_stream::{
    AudioSink, CaptureSink, EngineError, SinkFactory, SinkParams, StreamConfig, StreamError,
    StreamPipeline, StreamingEngine, StreamingSession, SynthesisEngine, SynthesisParams,
    SynthesisResult,
};

/// Engine whose feed results are scripted per token index.
struct ScriptedEngine {
    feeds: Vec<Result<Option<Vec<i16>>, EngineError>>,
    flush: Result<Option<Vec<i16>>, EngineError>,
    closed: Arc<Mutex<bool>>,
}

impl ScriptedEngine {
    fn new(feeds: Vec<Option<Vec<i16>>>, flush: Option<Vec<i16>>) -> Self {
        Self {
            feeds: feeds.into_iter().map(Ok).collect(),
            flush: Ok(flush),
            closed: Arc::default(),
        }
    }
}

struct ScriptedSession {
    feeds: VecDeque<Result<Option<Vec<i16>>, EngineError>>,
    flush: Option<Result<Option<Vec<i16>>, EngineError>>,
    closed: Arc<Mutex<bool>>,
}

impl StreamingSession for ScriptedSession {
    fn feed(&mut self, _token: &str) -> Result<Option<Vec<i16>>, EngineError> {
        self.feeds.pop_front().unwrap_or(Ok(None))
    }

    fn flush(&mut self) -> Result<Option<Vec<i16>>, EngineError> {
        self.flush.take().unwrap_or(Ok(None))
    }

    fn close(self) {
        *self.closed.lock().unwrap() = true;
    }
}

impl StreamingEngine for ScriptedEngine {
    type Session<'a>
        = ScriptedSession
    where
        Self: 'a;

    fn sample_rate(&self) -> u32 {
        1000
    }

    fn open(&mut self, _params: &SynthesisParams) -> Result<Self::Session<'_>, EngineError> {
        Ok(ScriptedSession {
            feeds: self.feeds.drain(..).collect(),
            flush: Some(std::mem::replace(&mut self.flush, Ok(None))),
            closed: Arc::clone(&self.closed),
        })
    }
}

#[derive(Debug, Default)]
struct SinkLog {
    requests: Vec<Vec<i16>>,
    played: Vec<i16>,
    flushed: bool,
    stopped: bool,
}

/// Sink following a script of write results, then accepting everything.
#[derive(Clone, Default)]
struct ScriptedSink {
    script: Arc<Mutex<VecDeque<Result<usize, String>>>>,
    log: Arc<Mutex<SinkLog>>,
}

impl ScriptedSink {
    fn new(script: Vec<Result<usize, String>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            log: Arc::default(),
        }
    }
}

impl AudioSink for ScriptedSink {
    fn start(&mut self) -> Result<(), StreamError> {
        Ok(())
    }

    fn write(&mut self, samples: &[i16]) -> Result<usize, StreamError> {
        let step = self.script.lock().unwrap().pop_front();
        let n = match step {
            Some(Ok(n)) => n.min(samples.len()),
            Some(Err(e)) => return Err(StreamError::Sink(e)),
            None => samples.len(),
        };
        let mut log = self.log.lock().unwrap();
        log.requests.push(samples.to_vec());
        log.played.extend_from_slice(&samples[..n]);
        Ok(n)
    }

    fn flush(&mut self, samples: &[i16]) -> Result<usize, StreamError> {
        let mut log = self.log.lock().unwrap();
        log.played.extend_from_slice(samples);
        log.flushed = true;
        Ok(samples.len())
    }

    fn stop(&mut self) -> Result<(), StreamError> {
        self.log.lock().unwrap().stopped = true;
        Ok(())
    }
}

impl SinkFactory for ScriptedSink {
    type Sink = ScriptedSink;

    fn open(&self, params: &SinkParams) -> Result<Self::Sink, StreamError> {
        assert_eq!(params.bits_per_sample, 16);
        Ok(self.clone())
    }
}

fn pipeline() -> StreamPipeline {
    StreamPipeline::new(StreamConfig {
        backoff_ms: 2,
        ..StreamConfig::default()
    })
    .unwrap()
}

fn hello_engine() -> ScriptedEngine {
    ScriptedEngine::new(
        vec![None, None, Some(vec![1; 100]), None, Some(vec![2; 50])],
        Some(vec![3; 20]),
    )
}

fn expected_hello_audio() -> Vec<i16> {
    let mut expected = vec![1; 100];
    expected.extend(vec![2; 50]);
    expected.extend(vec![3; 20]);
    expected
}

#[test]
fn hello_produces_three_chunks_in_order() {
    let sink = ScriptedSink::new(vec![]);
    let mut engine = hello_engine();
    let outcome = pipeline().run(&mut engine, &sink, "Hello").unwrap();

    assert_eq!(outcome.audio.samples, expected_hello_audio());
    assert_eq!(outcome.audio.sample_rate, 1000);
    assert_eq!(outcome.num_chunks(), 3);
    let sizes: Vec<usize> = outcome.timing.chunks().iter().map(|c| c.num_samples).collect();
    assert_eq!(sizes, vec![100, 50, 20]);
    assert_eq!(outcome.timing.total_audio(), Duration::from_millis(170));

    let log = sink.log.lock().unwrap();
    assert_eq!(log.played, expected_hello_audio());
    assert_eq!(log.requests.len(), 3);
    assert!(log.flushed);
    assert!(log.stopped);
    assert!(*engine.closed.lock().unwrap());
}

#[test]
fn full_writes_never_requeue() {
    let sink = ScriptedSink::new(vec![]);
    let outcome = pipeline().run(&mut hello_engine(), &sink, "Hello").unwrap();
    assert_eq!(outcome.playback.short_writes, 0);
    assert_eq!(outcome.playback.writes, 3);
    assert_eq!(outcome.playback.chunks_played, 3);
}

#[test]
fn zero_write_requeues_chunk_as_next_item() {
    let sink = ScriptedSink::new(vec![Ok(0)]);
    let outcome = pipeline().run(&mut hello_engine(), &sink, "Hello").unwrap();

    assert_eq!(outcome.playback.short_writes, 1);
    let log = sink.log.lock().unwrap();
    assert_eq!(log.requests.len(), 4);
    assert_eq!(log.requests[0], vec![1; 100]);
    assert_eq!(log.requests[1], vec![1; 100]);
    assert_eq!(log.played, expected_hello_audio());
}

#[test]
fn short_write_plays_every_sample_once() {
    let chunk: Vec<i16> = (0..64).collect();
    let mut engine = ScriptedEngine::new(vec![Some(chunk.clone())], None);
    let sink = ScriptedSink::new(vec![Ok(10)]);
    let outcome = pipeline().run(&mut engine, &sink, "x").unwrap();

    let log = sink.log.lock().unwrap();
    assert_eq!(log.requests[1], chunk[10..].to_vec());
    assert_eq!(log.played, chunk);
    assert_eq!(outcome.playback.samples_written, 64);
}

#[test]
fn capped_device_never_loses_or_duplicates_samples() {
    let mut engine = hello_engine();
    let sink = CaptureSink::with_max_write(7);
    let outcome = pipeline().run(&mut engine, &sink, "Hello").unwrap();
    assert_eq!(sink.recorded(), expected_hello_audio());
    assert!(outcome.playback.short_writes > 0);
}

#[test]
fn prebuffered_playback_plays_everything() {
    let pipeline = StreamPipeline::new(StreamConfig {
        backoff_ms: 2,
        wait_chunks: 10,
        ..StreamConfig::default()
    })
    .unwrap();
    let sink = CaptureSink::new();
    pipeline.run(&mut hello_engine(), &sink, "Hello").unwrap();
    assert_eq!(sink.recorded(), expected_hello_audio());
}

#[test]
fn engine_error_aborts_playback_and_closes_session() {
    let mut engine = hello_engine();
    engine.feeds[3] = Err(EngineError::with_stack(
        "synthesis failed",
        vec!["invalid token".to_string()],
    ));
    let sink = ScriptedSink::new(vec![]);
    let err = pipeline().run(&mut engine, &sink, "Hello").unwrap_err();

    assert!(matches!(err, StreamError::Engine(ref e) if e.stack == vec!["invalid token"]));
    assert!(*engine.closed.lock().unwrap());
    let log = sink.log.lock().unwrap();
    assert!(log.stopped);
    assert!(!log.flushed);
}

#[test]
fn sink_error_fails_the_run() {
    let mut engine = hello_engine();
    let sink = ScriptedSink::new(vec![Err("device unplugged".to_string())]);
    let err = pipeline().run(&mut engine, &sink, "Hello").unwrap_err();
    assert!(matches!(err, StreamError::Sink(ref m) if m == "device unplugged"));
    assert!(sink.log.lock().unwrap().stopped);
    assert!(*engine.closed.lock().unwrap());
}

#[test]
fn invalid_text_fails_with_encoding_error() {
    let sink = ScriptedSink::new(vec![]);
    let err = pipeline()
        .run(&mut hello_engine(), &sink, b"He\xBFllo".as_slice())
        .unwrap_err();
    assert!(matches!(
        err,
        StreamError::InvalidEncoding { byte: 0xBF, offset: 2 }
    ));
}

#[test]
fn chunk_limit_is_enforced() {
    let pipeline = StreamPipeline::new(StreamConfig {
        max_chunks: 2,
        backoff_ms: 2,
        ..StreamConfig::default()
    })
    .unwrap();
    let err = pipeline
        .run(&mut hello_engine(), &CaptureSink::new(), "Hello")
        .unwrap_err();
    assert!(matches!(err, StreamError::TooManyChunks { limit: 2 }));
}

#[derive(Default)]
struct BeepEngine;

impl SynthesisEngine for BeepEngine {
    type SynthesisParams = ();
    type ModelParams = ();

    fn load_model_with_params(
        &mut self,
        _model_path: &Path,
        _params: (),
    ) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }

    fn unload_model(&mut self) {}

    fn sample_rate(&self) -> u32 {
        16000
    }

    fn synthesize(
        &mut self,
        text: &str,
        _params: Option<()>,
    ) -> Result<SynthesisResult, Box<dyn std::error::Error>> {
        Ok(SynthesisResult {
            samples: vec![100; text.trim().len() * 10],
            sample_rate: 16000,
        })
    }
}

#[test]
fn buffered_engine_streams_sentences_and_saves_wav() {
    let mut engine = BufferedEngine::new(BeepEngine);
    let sink = CaptureSink::new();
    let outcome = pipeline()
        .run(&mut engine, &sink, "One. Two! Three")
        .unwrap();

    let sizes: Vec<usize> = outcome.timing.chunks().iter().map(|c| c.num_samples).collect();
    assert_eq!(sizes, vec![40, 40, 50]);
    assert_eq!(sink.recorded().len(), 130);

    let path = std::env::temp_dir().join(format!("tts-stream-it-{}.wav", std::process::id()));
    outcome.audio.write_wav(&path).unwrap();
    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().sample_rate, 16000);
    assert_eq!(reader.len(), 130);
    std::fs::remove_file(&path).unwrap();
}
