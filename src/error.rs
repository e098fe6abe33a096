use std::fmt;

/// Failure reported by a synthesis engine.
///
/// Engines report a top-level message plus an ordered stack of diagnostic
/// messages, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub message: String,
    pub stack: Vec<String>,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: Vec::new(),
        }
    }

    pub fn with_stack(message: impl Into<String>, stack: Vec<String>) -> Self {
        Self {
            message: message.into(),
            stack,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        for (i, line) in self.stack.iter().enumerate() {
            write!(f, "\n  [{i}] {line}")?;
        }
        Ok(())
    }
}

impl std::error::Error for EngineError {}

#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    #[error("Invalid UTF-8 byte 0x{byte:02x} at offset {offset}")]
    InvalidEncoding { byte: u8, offset: usize },
    #[error("Synthesis engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("Audio sink error: {0}")]
    Sink(String),
    #[error("Trying to synthesize too many chunks. Only {limit} chunks are supported.")]
    TooManyChunks { limit: usize },
    #[error("Failed to allocate room for {requested} samples")]
    AllocationFailure { requested: usize },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Playback worker panicked")]
    WorkerPanicked,
}

impl StreamError {
    pub fn sink(message: impl fmt::Display) -> Self {
        StreamError::Sink(message.to_string())
    }
}
