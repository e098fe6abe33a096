/// A block of mono 16-bit PCM produced by one engine call.
///
/// A chunk is owned by exactly one holder at a time. The producer hands the
/// playback queue and the accumulator independent copies.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Chunk {
    samples: Vec<i16>,
}

impl Chunk {
    pub fn new(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drop the first `written` samples, keeping the unwritten tail in place.
    ///
    /// Returns `None` when nothing is left.
    pub fn into_tail(mut self, written: usize) -> Option<Chunk> {
        if written >= self.samples.len() {
            return None;
        }
        self.samples.drain(..written);
        Some(self)
    }

    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }
}

impl From<Vec<i16>> for Chunk {
    fn from(samples: Vec<i16>) -> Self {
        Self::new(samples)
    }
}

/// An entry on the playback queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Audio to play.
    Chunk(Chunk),
    /// No more audio will follow; drain the device and stop.
    EndOfStream,
    /// The run failed; stop without playing anything else.
    Abort,
}

impl Message {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Message::Chunk(_))
    }
}
