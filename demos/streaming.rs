use std::f32::consts::TAU;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tts_stream::engines::buffered::BufferedEngine;
use tts_stream::{
    AudioSink, SinkFactory, SinkParams, StreamConfig, StreamError, StreamPipeline,
    SynthesisEngine, SynthesisResult,
};

const SAMPLE_RATE: u32 = 16000;

/// Stand-in engine: one short tone per word, pitch by word length.
#[derive(Default)]
struct ToneEngine;

impl SynthesisEngine for ToneEngine {
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
        SAMPLE_RATE
    }

    fn synthesize(
        &mut self,
        text: &str,
        _params: Option<()>,
    ) -> Result<SynthesisResult, Box<dyn std::error::Error>> {
        let mut samples = Vec::new();
        for word in text.split_whitespace() {
            let freq = 200.0 + 40.0 * word.chars().count() as f32;
            let len = SAMPLE_RATE as usize / 5;
            samples.extend((0..len).map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                ((TAU * freq * t).sin() * 8000.0) as i16
            }));
            samples.extend(std::iter::repeat(0).take(len / 4));
        }
        // Pretend inference takes a while.
        thread::sleep(Duration::from_millis(50));
        Ok(SynthesisResult {
            samples,
            sample_rate: SAMPLE_RATE,
        })
    }
}

/// Simulated device that accepts at most 100 ms of audio per write and
/// takes real time to play it.
struct PacedDevice;

struct PacedSink {
    sample_rate: u32,
}

impl AudioSink for PacedSink {
    fn start(&mut self) -> Result<(), StreamError> {
        Ok(())
    }

    fn write(&mut self, samples: &[i16]) -> Result<usize, StreamError> {
        let n = samples.len().min(self.sample_rate as usize / 10);
        thread::sleep(Duration::from_secs_f64(n as f64 / self.sample_rate as f64));
        Ok(n)
    }

    fn flush(&mut self, samples: &[i16]) -> Result<usize, StreamError> {
        self.write(samples)
    }

    fn stop(&mut self) -> Result<(), StreamError> {
        Ok(())
    }
}

impl SinkFactory for PacedDevice {
    type Sink = PacedSink;

    fn open(&self, params: &SinkParams) -> Result<Self::Sink, StreamError> {
        Ok(PacedSink {
            sample_rate: params.sample_rate,
        })
    }

    fn devices(&self) -> Result<Vec<String>, StreamError> {
        Ok(vec!["paced (simulated)".to_string()])
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => StreamConfig::from_json_file(&PathBuf::from(path))?,
        None => StreamConfig::builder().wait_chunks(1usize).build()?,
    };
    let pipeline = StreamPipeline::new(config)?;
    StreamPipeline::devices(&PacedDevice)?;

    let text = "Streaming speech starts playing before the text is done. \
                Each sentence is synthesized as soon as it ends! Short writes are fine.";

    let mut engine = BufferedEngine::new(ToneEngine);
    let start = Instant::now();
    let outcome = pipeline.run(&mut engine, &PacedDevice, text)?;
    println!("Run finished in {:.2?}", start.elapsed());

    outcome.timing.log_summary();
    println!(
        "Generated {} chunks, {:.2}s of audio; {} short writes during playback",
        outcome.num_chunks(),
        outcome.audio.duration_secs(),
        outcome.playback.short_writes
    );

    let output = PathBuf::from("output.wav");
    outcome.audio.write_wav(&output)?;
    println!("Saved to {}", output.display());
    Ok(())
}
