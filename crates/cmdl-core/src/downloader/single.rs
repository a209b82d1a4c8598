//! Single-stream GET downloader (no Range requests).
//!
//! Writes the response body sequentially from offset 0. With a known size the
//! file is preallocated and the body is held to exactly that length.

use std::fs::{self, File};
use std::path::Path;

use crate::error::{ChunkError, DownloadError};
use crate::progress::ProgressSink;
use crate::storage::{allocate, ChunkWriter};
use crate::transport::Transport;

/// Download `url` into `dest` with one plain GET. Returns the bytes written.
pub fn download_single(
    transport: &dyn Transport,
    url: &str,
    dest: &Path,
    expected_len: Option<u64>,
    progress: &dyn ProgressSink,
) -> Result<u64, DownloadError> {
    let limit = match expected_len.filter(|n| *n > 0) {
        Some(n) => {
            allocate(dest, n)?;
            n
        }
        None => {
            create_empty(dest)?;
            u64::MAX
        }
    };

    let mut writer = ChunkWriter::open(dest, 0, limit)
        .map_err(|e| DownloadError::Stream(ChunkError::Storage(e)))?;

    tracing::info!(url, dest = %dest.display(), expected = ?expected_len, "single-stream download");

    let mut storage_err = None;
    let mut overrun = 0u64;
    let result = transport.get(url, &mut |data| match writer.write(data) {
        Ok(taken) => {
            progress.add(taken as u64);
            if taken < data.len() {
                overrun = (data.len() - taken) as u64;
                return false;
            }
            true
        }
        Err(e) => {
            storage_err = Some(e);
            false
        }
    });

    if let Some(e) = storage_err {
        return Err(DownloadError::Stream(ChunkError::Storage(e)));
    }
    let written = writer.written();
    if overrun > 0 {
        return Err(DownloadError::Stream(ChunkError::LengthMismatch {
            expected: limit,
            received: written + overrun,
        }));
    }
    result.map_err(|e| DownloadError::Stream(ChunkError::Transport(e)))?;

    let written = writer
        .finish()
        .map_err(|e| DownloadError::Stream(ChunkError::Storage(e)))?;
    if let Some(expected) = expected_len.filter(|n| *n > 0) {
        if written != expected {
            return Err(DownloadError::Stream(ChunkError::LengthMismatch {
                expected,
                received: written,
            }));
        }
    }

    tracing::info!(bytes = written, "single-stream download complete");
    Ok(written)
}

/// Create (or truncate) `dest` and its parent directories.
fn create_empty(dest: &Path) -> Result<(), DownloadError> {
    let fail = |source| DownloadError::Allocation {
        path: dest.to_path_buf(),
        source,
    };
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(fail)?;
    }
    File::create(dest).map_err(fail)?;
    Ok(())
}
