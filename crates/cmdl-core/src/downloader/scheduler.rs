//! Admission of planned chunks under a fixed concurrency ceiling.

use std::collections::VecDeque;

use crate::cancel::CancelToken;
use crate::planner::Chunk;

/// Ordered queue of not-yet-started chunks plus a running-slot count.
///
/// The whole plan is enqueued up front; chunks leave in plan order.
#[derive(Debug)]
pub struct Scheduler {
    queue: VecDeque<Chunk>,
    limit: usize,
    running: usize,
}

impl Scheduler {
    pub fn new(chunks: impl IntoIterator<Item = Chunk>, limit: usize) -> Self {
        Self {
            queue: chunks.into_iter().collect(),
            limit: limit.max(1),
            running: 0,
        }
    }

    /// Next chunk to start, consuming a slot. None when every slot is busy,
    /// the queue is empty, or cancellation has been raised.
    pub fn next_admission(&mut self, cancel: &CancelToken) -> Option<Chunk> {
        if cancel.is_cancelled() || self.running >= self.limit {
            return None;
        }
        let chunk = self.queue.pop_front()?;
        self.running += 1;
        Some(chunk)
    }

    /// A started fetch terminated (any outcome).
    pub fn release(&mut self) {
        debug_assert!(self.running > 0, "release without a running fetch");
        self.running = self.running.saturating_sub(1);
    }

    pub fn running(&self) -> usize {
        self.running
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
