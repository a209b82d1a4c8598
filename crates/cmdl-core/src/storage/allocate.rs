//! Preallocation of the destination file.

use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::DownloadError;

/// Ensure `path` exists with exactly `size` bytes.
///
/// Creates missing parent directories, then sets the length with a sparse
/// `set_len`. If that fails, forces the length by writing one zero byte at
/// `size - 1`. Existing content is not truncated, so allocating twice keeps
/// previously written bytes.
pub fn allocate(path: &Path, size: u64) -> Result<(), DownloadError> {
    let fail = |source: io::Error| DownloadError::Allocation {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(fail)?;
    }

    let mut file = File::options()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(fail)?;

    if let Err(e) = file.set_len(size) {
        tracing::warn!(error = %e, size, "set_len failed, forcing length with a trailing zero byte");
        force_len(&mut file, size).map_err(fail)?;
    }

    let actual = file.metadata().map_err(fail)?.len();
    if actual != size {
        return Err(fail(io::Error::new(
            io::ErrorKind::Other,
            format!("file is {actual} bytes after allocation, expected {size}"),
        )));
    }

    tracing::debug!(path = %path.display(), size, "destination preallocated");
    Ok(())
}

/// Grow `file` to `size` bytes by writing a single zero byte at the last offset.
pub(crate) fn force_len(file: &mut File, size: u64) -> io::Result<()> {
    if size == 0 {
        return Ok(());
    }
    file.seek(SeekFrom::Start(size - 1))?;
    file.write_all(&[0])?;
    file.flush()?;
    file.seek(SeekFrom::Start(0))?;
    Ok(())
}
