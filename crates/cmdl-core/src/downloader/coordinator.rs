//! Completion and cancellation accounting for one run.

use crate::cancel::CancelToken;
use crate::error::DownloadError;

use super::outcome::{ChunkOutcome, ChunkStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Completed,
    Failed,
}

/// Final tallies of a run, returned by the event loop.
#[derive(Debug)]
pub struct RunSummary {
    pub state: RunState,
    pub target: usize,
    pub succeeded: usize,
    pub aborted: usize,
    /// Outcomes that arrived after the run had already failed.
    pub discarded: usize,
    pub bytes_written: u64,
    pub error: Option<DownloadError>,
}

impl RunSummary {
    pub fn into_result(self) -> Result<(), DownloadError> {
        match self.error {
            Some(e) => Err(e),
            None if self.state == RunState::Completed => Ok(()),
            None => Err(DownloadError::Incomplete {
                succeeded: self.succeeded,
                total: self.target,
            }),
        }
    }
}

/// Owns the aggregate state: success count, target, cancellation, first error.
#[derive(Debug)]
pub struct Coordinator {
    target: usize,
    succeeded: usize,
    aborted: usize,
    discarded: usize,
    bytes_written: u64,
    cancel: CancelToken,
    failure: Option<DownloadError>,
    state: RunState,
}

impl Coordinator {
    pub fn new(target: usize, cancel: CancelToken) -> Self {
        Self {
            target,
            succeeded: 0,
            aborted: 0,
            discarded: 0,
            bytes_written: 0,
            cancel,
            failure: None,
            state: if target == 0 {
                RunState::Completed
            } else {
                RunState::Running
            },
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    /// Account for one outcome and return the run state after it.
    pub fn on_outcome(&mut self, outcome: ChunkOutcome) -> RunState {
        self.bytes_written += outcome.bytes_written;
        let chunk = outcome.chunk;

        if self.state != RunState::Running {
            match outcome.status {
                ChunkStatus::Aborted => self.aborted += 1,
                _ => self.discarded += 1,
            }
            return self.state;
        }

        match outcome.status {
            ChunkStatus::Success => {
                self.succeeded += 1;
                if self.succeeded == self.target {
                    self.state = RunState::Completed;
                }
            }
            ChunkStatus::Failed(source) => {
                if self.cancel.cancel() {
                    tracing::warn!(index = chunk.index, "cancelling remaining chunks");
                }
                tracing::error!(
                    index = chunk.index,
                    start = chunk.start,
                    end = chunk.end,
                    error = %source,
                    "chunk failed"
                );
                self.failure = Some(DownloadError::ChunkIo {
                    index: chunk.index,
                    start: chunk.start,
                    end: chunk.end,
                    source,
                });
                self.state = RunState::Failed;
            }
            ChunkStatus::Aborted => self.aborted += 1,
        }
        self.state
    }

    pub fn finish(self) -> RunSummary {
        RunSummary {
            state: self.state,
            target: self.target,
            succeeded: self.succeeded,
            aborted: self.aborted,
            discarded: self.discarded,
            bytes_written: self.bytes_written,
            error: self.failure,
        }
    }
}
