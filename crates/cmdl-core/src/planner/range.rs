//! Chunk type and range planning.

use std::path::Path;
use std::sync::Arc;

use crate::error::DownloadError;

/// One contiguous byte range of the target file: `[start, end]` (inclusive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the plan; admission follows this order.
    pub index: usize,
    /// First byte offset (inclusive).
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
    pub url: Arc<str>,
    pub dest: Arc<Path>,
}

impl Chunk {
    /// Number of bytes this chunk owns.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// HTTP Range header value: `bytes=start-end`.
    pub fn range_header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Largest number of chunks a plan may hold.
pub const MAX_CHUNKS: u64 = 1 << 20;

/// Effective chunk size for a plan.
///
/// `total_size / threads`, replaced by `max_chunk_size` when that candidate is
/// larger than the cap or rounds down to zero (fewer bytes than threads).
pub fn effective_chunk_size(total_size: u64, threads: usize, max_chunk_size: u64) -> u64 {
    let candidate = total_size / threads as u64;
    if candidate > max_chunk_size || candidate == 0 {
        max_chunk_size
    } else {
        candidate
    }
}

/// Inclusive `(start, end)` ranges covering `[0, total_size)`.
///
/// All ranges have the effective chunk size except the last, whose end is
/// pinned to `total_size - 1` and absorbs the remainder.
pub fn plan_ranges(
    total_size: u64,
    threads: usize,
    max_chunk_size: u64,
) -> Result<Vec<(u64, u64)>, DownloadError> {
    if total_size == 0 {
        return Err(DownloadError::config("total size must be positive"));
    }
    if threads == 0 {
        return Err(DownloadError::config("thread count must be positive"));
    }
    if max_chunk_size == 0 {
        return Err(DownloadError::config("max chunk size must be positive"));
    }

    let chunk_size = effective_chunk_size(total_size, threads, max_chunk_size);
    let count = total_size.div_ceil(chunk_size);
    if count > MAX_CHUNKS {
        return Err(DownloadError::config(format!(
            "{total_size} bytes in chunks of {chunk_size} would need {count} chunks (limit {MAX_CHUNKS})"
        )));
    }

    let mut out = Vec::with_capacity(count as usize);
    for i in 0..count {
        let start = i * chunk_size;
        let end = if i == count - 1 {
            total_size - 1
        } else {
            start + chunk_size - 1
        };
        out.push((start, end));
    }
    Ok(out)
}

/// Immutable plan for one download: total size plus the ordered chunk list.
#[derive(Debug, Clone)]
pub struct DownloadPlan {
    total_size: u64,
    chunk_size: u64,
    chunks: Vec<Chunk>,
}

impl DownloadPlan {
    pub fn new(
        url: &str,
        dest: &Path,
        total_size: u64,
        threads: usize,
        max_chunk_size: u64,
    ) -> Result<Self, DownloadError> {
        let ranges = plan_ranges(total_size, threads, max_chunk_size)?;
        let url: Arc<str> = Arc::from(url);
        let dest: Arc<Path> = Arc::from(dest);
        let chunks = ranges
            .into_iter()
            .enumerate()
            .map(|(index, (start, end))| Chunk {
                index,
                start,
                end,
                url: Arc::clone(&url),
                dest: Arc::clone(&dest),
            })
            .collect();
        Ok(Self {
            total_size,
            chunk_size: effective_chunk_size(total_size, threads, max_chunk_size),
            chunks,
        })
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Nominal chunk size (the last chunk may be longer or shorter).
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}
