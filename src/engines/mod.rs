//! Streaming engine implementations.
//!
//! - [`buffered`] - streams any whole-utterance [`SynthesisEngine`](crate::SynthesisEngine)
//!   by cutting the incoming text at sentence boundaries

pub mod buffered;
