//! Terminal outcome of one chunk fetch.

use crate::error::ChunkError;
use crate::planner::Chunk;

/// How a chunk fetch ended.
#[derive(Debug)]
pub enum ChunkStatus {
    Success,
    Failed(ChunkError),
    /// Stopped because a sibling's failure raised cancellation.
    Aborted,
}

/// Emitted exactly once per started chunk, consumed once by the coordinator.
#[derive(Debug)]
pub struct ChunkOutcome {
    pub chunk: Chunk,
    pub status: ChunkStatus,
    pub bytes_written: u64,
}

impl ChunkOutcome {
    pub fn success(chunk: Chunk, bytes_written: u64) -> Self {
        Self {
            chunk,
            status: ChunkStatus::Success,
            bytes_written,
        }
    }

    pub fn failed(chunk: Chunk, error: ChunkError, bytes_written: u64) -> Self {
        Self {
            chunk,
            status: ChunkStatus::Failed(error),
            bytes_written,
        }
    }

    pub fn aborted(chunk: Chunk, bytes_written: u64) -> Self {
        Self {
            chunk,
            status: ChunkStatus::Aborted,
            bytes_written,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, ChunkStatus::Success)
    }
}
