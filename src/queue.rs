//! Ordered hand-off between the synthesis producer and the playback consumer.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::chunk::{Chunk, Message};

#[derive(Debug, Default)]
struct State {
    items: VecDeque<Message>,
    finished: bool,
    aborted: bool,
    requeues: usize,
}

impl State {
    fn buffered_chunks(&self) -> usize {
        self.items.iter().filter(|m| !m.is_terminal()).count()
    }

    fn has_terminal(&self) -> bool {
        self.items.iter().any(Message::is_terminal)
    }
}

/// Thread-safe double-ended queue of playback messages.
///
/// Pushes never block, so a slow sink only grows memory and never stalls
/// synthesis. Every push signals a condition variable, which lets the
/// consumer sleep instead of polling.
#[derive(Debug, Default)]
pub struct ChunkQueue {
    state: Mutex<State>,
    ready: Condvar,
}

impl ChunkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    // Every operation leaves `State` consistent, so a poisoned lock is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a freshly produced chunk.
    pub fn push_rear(&self, chunk: Chunk) {
        let mut state = self.lock();
        log::debug!(
            "Queued chunk of {} samples ({} pending)",
            chunk.len(),
            state.items.len() + 1
        );
        state.items.push_back(Message::Chunk(chunk));
        drop(state);
        self.ready.notify_one();
    }

    /// Put the unwritten tail of a chunk back so it is played next.
    pub fn push_front(&self, chunk: Chunk) {
        let mut state = self.lock();
        state.requeues += 1;
        state.items.push_front(Message::Chunk(chunk));
        drop(state);
        self.ready.notify_one();
    }

    /// Push the end-of-stream marker behind all queued audio.
    ///
    /// Only the first call has an effect.
    pub fn finish(&self) {
        let mut state = self.lock();
        if state.finished {
            log::warn!("End of stream already signalled; ignoring");
            return;
        }
        state.finished = true;
        state.items.push_back(Message::EndOfStream);
        drop(state);
        self.ready.notify_all();
    }

    /// Stop the consumer ahead of any queued audio.
    pub fn abort(&self) {
        let mut state = self.lock();
        if state.aborted {
            return;
        }
        state.aborted = true;
        state.items.push_front(Message::Abort);
        drop(state);
        self.ready.notify_all();
    }

    pub fn is_aborted(&self) -> bool {
        self.lock().aborted
    }

    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    /// Take the next message without waiting.
    pub fn pop_front(&self) -> Option<Message> {
        self.lock().items.pop_front()
    }

    /// Take the next message, waiting up to `timeout` for one to arrive.
    pub fn pop_front_timeout(&self, timeout: Duration) -> Option<Message> {
        let state = self.lock();
        let (mut state, _) = self
            .ready
            .wait_timeout_while(state, timeout, |s| s.items.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        state.items.pop_front()
    }

    /// Wait until at least `min_chunks` chunks are queued or a terminal
    /// message is present. Returns `false` if `timeout` elapsed first.
    pub fn wait_buffered(&self, min_chunks: usize, timeout: Duration) -> bool {
        let state = self.lock();
        let (_state, result) = self
            .ready
            .wait_timeout_while(state, timeout, |s| {
                s.buffered_chunks() < min_chunks && !s.has_terminal()
            })
            .unwrap_or_else(PoisonError::into_inner);
        !result.timed_out()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Number of partial-write tails pushed back to the front.
    pub fn requeue_count(&self) -> usize {
        self.lock().requeues
    }
}
