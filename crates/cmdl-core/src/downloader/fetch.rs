//! One ranged transfer for one chunk.

use std::io;

use crate::cancel::CancelToken;
use crate::error::ChunkError;
use crate::planner::Chunk;
use crate::progress::ProgressSink;
use crate::storage::ChunkWriter;
use crate::transport::{Transport, TransportError};

use super::outcome::ChunkOutcome;

/// Why the body callback stopped the transfer early.
enum Stop {
    Cancelled,
    Storage(io::Error),
    /// Bytes the server sent past the chunk's end.
    Overrun(u64),
}

/// Fetch `chunk` with a ranged GET and write it at the chunk's offset.
///
/// Always returns exactly one outcome. Cancellation is checked before the
/// request, before every buffer the transport delivers, and by the transport
/// itself while the connection is idle; a fetch stopped that way ends as
/// `Aborted`, never `Failed`.
pub fn fetch_chunk(
    transport: &dyn Transport,
    chunk: Chunk,
    cancel: &CancelToken,
    progress: &dyn ProgressSink,
) -> ChunkOutcome {
    if cancel.is_cancelled() {
        return ChunkOutcome::aborted(chunk, 0);
    }

    let expected = chunk.len();
    let mut writer = match ChunkWriter::open(&chunk.dest, chunk.start, expected) {
        Ok(w) => w,
        Err(e) => return ChunkOutcome::failed(chunk, ChunkError::Storage(e), 0),
    };

    tracing::debug!(index = chunk.index, range = %chunk.range_header_value(), "chunk started");

    let mut stop: Option<Stop> = None;
    let result = transport.get_range(&chunk.url, chunk.start, chunk.end, cancel, &mut |data| {
        if cancel.is_cancelled() {
            stop = Some(Stop::Cancelled);
            return false;
        }
        match writer.write(data) {
            Ok(taken) => {
                if taken > 0 {
                    progress.add(taken as u64);
                }
                if taken < data.len() {
                    stop = Some(Stop::Overrun((data.len() - taken) as u64));
                    return false;
                }
                true
            }
            Err(e) => {
                stop = Some(Stop::Storage(e));
                false
            }
        }
    });

    let written = writer.written();
    match stop {
        Some(Stop::Cancelled) => {
            tracing::debug!(index = chunk.index, written, "chunk aborted by cancellation");
            return ChunkOutcome::aborted(chunk, written);
        }
        Some(Stop::Storage(e)) => {
            return ChunkOutcome::failed(chunk, ChunkError::Storage(e), written);
        }
        Some(Stop::Overrun(extra)) => {
            let err = ChunkError::LengthMismatch {
                expected,
                received: written + extra,
            };
            return ChunkOutcome::failed(chunk, err, written);
        }
        None => {}
    }

    match result {
        Ok(()) => {}
        Err(TransportError::Aborted) if cancel.is_cancelled() => {
            tracing::debug!(index = chunk.index, written, "chunk aborted by cancellation");
            return ChunkOutcome::aborted(chunk, written);
        }
        Err(e) => return ChunkOutcome::failed(chunk, ChunkError::Transport(e), written),
    }

    let written = match writer.finish() {
        Ok(n) => n,
        Err(e) => return ChunkOutcome::failed(chunk, ChunkError::Storage(e), written),
    };
    if written != expected {
        let err = ChunkError::LengthMismatch {
            expected,
            received: written,
        };
        return ChunkOutcome::failed(chunk, err, written);
    }

    tracing::debug!(index = chunk.index, bytes = written, "chunk finished");
    ChunkOutcome::success(chunk, written)
}
