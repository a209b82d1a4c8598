//! Error taxonomy for a download run.
//!
//! `DownloadError` is the single terminal error a caller sees. Config and
//! allocation errors are raised before any chunk starts; `ChunkIo` carries the
//! first chunk failure, which cancels every sibling.

use std::path::PathBuf;

use thiserror::Error;

use crate::transport::TransportError;

/// Why a single chunk fetch failed.
#[derive(Debug, Error)]
pub enum ChunkError {
    /// The ranged GET itself failed (connection, TLS, non-2xx status, ...).
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Opening, seeking or writing the destination file failed.
    #[error("storage: {0}")]
    Storage(#[from] std::io::Error),
    /// The body did not match the chunk length (short read or overrun).
    #[error("length mismatch: expected {expected} bytes, received {received}")]
    LengthMismatch { expected: u64, received: u64 },
    /// The worker thread could not be started or panicked mid-fetch.
    #[error("worker: {0}")]
    Worker(String),
}

/// Terminal error of a download run.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Invalid thread count, chunk size or total size.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The size probe against the download URL failed.
    #[error("size discovery for {url} failed: {source}")]
    SizeDiscovery {
        url: String,
        #[source]
        source: TransportError,
    },

    /// The destination file could not be created or sized.
    #[error("cannot allocate {}: {source}", path.display())]
    Allocation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The first chunk that failed; every other chunk was cancelled.
    #[error("chunk {index} (bytes {start}-{end}) failed: {source}")]
    ChunkIo {
        index: usize,
        start: u64,
        end: u64,
        #[source]
        source: ChunkError,
    },

    /// The event loop stopped before every chunk succeeded, with no chunk error.
    #[error("run stopped after {succeeded} of {total} chunks")]
    Incomplete { succeeded: usize, total: usize },

    /// Single-stream (non-ranged) transfer failed.
    #[error("stream transfer failed: {0}")]
    Stream(#[source] ChunkError),

    /// The blocking download task could not be joined.
    #[error("download task: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl DownloadError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        DownloadError::Config(msg.into())
    }
}
