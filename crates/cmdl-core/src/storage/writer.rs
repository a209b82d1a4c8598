//! Positioned writer for one chunk.

use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

/// Own file handle for one chunk, positioned at the chunk's start offset.
///
/// Accepts at most `len` bytes; anything beyond is refused so a misbehaving
/// server can never spill into a sibling chunk's range.
pub struct ChunkWriter {
    file: File,
    len: u64,
    written: u64,
}

impl ChunkWriter {
    /// Open the (already allocated) file at `path` and seek to `start`.
    pub fn open(path: &Path, start: u64, len: u64) -> io::Result<Self> {
        let mut file = File::options().write(true).open(path)?;
        file.seek(SeekFrom::Start(start))?;
        Ok(Self {
            file,
            len,
            written: 0,
        })
    }

    /// Write as much of `data` as fits in the chunk. Returns the bytes taken.
    pub fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let room = self.remaining().min(data.len() as u64) as usize;
        if room == 0 {
            return Ok(0);
        }
        self.file.write_all(&data[..room])?;
        self.written += room as u64;
        Ok(room)
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn remaining(&self) -> u64 {
        self.len - self.written
    }

    /// Flush and close the handle. Returns the bytes written.
    pub fn finish(mut self) -> io::Result<u64> {
        self.file.flush()?;
        Ok(self.written)
    }
}
