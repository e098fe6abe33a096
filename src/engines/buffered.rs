//! Sentence-buffered streaming over a whole-utterance engine.
//!
//! Tokens are collected until a sentence ends, then the sentence is
//! synthesized in one call and returned as a chunk. A `.` between two digits
//! (as in `2.5`) does not end a sentence, so the cut is made on the token
//! after the punctuation, once it is known not to be a digit.

use crate::error::EngineError;
use crate::session::{StreamingEngine, StreamingSession, SynthesisParams};
use crate::SynthesisEngine;

fn is_sentence_end(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?' | ';' | ':' | '…')
}

fn is_line_break(ch: char) -> bool {
    matches!(ch, '\n' | '\r')
}

/// Convert an engine's boxed error into an [`EngineError`], keeping its
/// source chain as the diagnostic stack.
pub fn engine_error(err: Box<dyn std::error::Error>) -> EngineError {
    let mut stack = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        stack.push(cause.to_string());
        source = cause.source();
    }
    EngineError::with_stack(err.to_string(), stack)
}

/// A [`StreamingEngine`] over any [`SynthesisEngine`].
pub struct BufferedEngine<E: SynthesisEngine> {
    engine: E,
    params: Option<E::SynthesisParams>,
}

impl<E: SynthesisEngine> BufferedEngine<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            params: None,
        }
    }

    /// Engine-specific parameters passed to every synthesis call.
    pub fn with_params(engine: E, params: E::SynthesisParams) -> Self {
        Self {
            engine,
            params: Some(params),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn into_inner(self) -> E {
        self.engine
    }
}

impl<E> StreamingEngine for BufferedEngine<E>
where
    E: SynthesisEngine,
    E::SynthesisParams: Clone,
{
    type Session<'a>
        = BufferedStream<'a, E>
    where
        Self: 'a;

    fn sample_rate(&self) -> u32 {
        self.engine.sample_rate()
    }

    fn open(&mut self, params: &SynthesisParams) -> Result<Self::Session<'_>, EngineError> {
        if params.speech_rate.is_some() {
            log::warn!("speech_rate is not supported by buffered engines; set it in the engine params");
        }
        Ok(BufferedStream {
            sample_rate: self.engine.sample_rate(),
            engine: &mut self.engine,
            params: self.params.as_ref(),
            pending: String::new(),
            boundary: None,
        })
    }
}

/// Session of a [`BufferedEngine`].
pub struct BufferedStream<'a, E: SynthesisEngine> {
    engine: &'a mut E,
    params: Option<&'a E::SynthesisParams>,
    sample_rate: u32,
    pending: String,
    /// Character preceding sentence punctuation awaiting confirmation.
    boundary: Option<Option<char>>,
}

impl<E> BufferedStream<'_, E>
where
    E: SynthesisEngine,
    E::SynthesisParams: Clone,
{
    fn synthesize(&mut self, text: &str) -> Result<Option<Vec<i16>>, EngineError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        log::debug!("Synthesizing buffered sentence {text:?}");
        let result = self
            .engine
            .synthesize(text, self.params.cloned())
            .map_err(engine_error)?;
        if result.sample_rate != self.sample_rate {
            return Err(EngineError::new(format!(
                "engine returned {} Hz audio, expected {} Hz",
                result.sample_rate, self.sample_rate
            )));
        }
        Ok(Some(result.samples))
    }

    fn take_pending(&mut self) -> String {
        std::mem::take(&mut self.pending)
    }
}

impl<E> StreamingSession for BufferedStream<'_, E>
where
    E: SynthesisEngine,
    E::SynthesisParams: Clone,
{
    fn feed(&mut self, token: &str) -> Result<Option<Vec<i16>>, EngineError> {
        let ch = token.chars().next();

        let mut sentence = None;
        if let Some(before) = self.boundary.take() {
            let decimal_point = self.pending.ends_with('.')
                && before.is_some_and(|c| c.is_ascii_digit())
                && ch.is_some_and(|c| c.is_ascii_digit());
            if !decimal_point {
                sentence = Some(self.take_pending());
            }
        }

        let before = self.pending.chars().next_back();
        self.pending.push_str(token);

        match ch {
            Some(c) if is_line_break(c) => {
                let mut text = sentence.unwrap_or_default();
                text.push_str(&self.take_pending());
                sentence = Some(text);
            }
            Some(c) if is_sentence_end(c) => self.boundary = Some(before),
            _ => {}
        }

        match sentence {
            Some(text) => self.synthesize(&text),
            None => Ok(None),
        }
    }

    fn flush(&mut self) -> Result<Option<Vec<i16>>, EngineError> {
        self.boundary = None;
        let text = self.take_pending();
        self.synthesize(&text)
    }

    fn close(self) {
        if !self.pending.trim().is_empty() {
            log::debug!("Closing stream with unsynthesized text {:?}", self.pending);
        }
    }
}
