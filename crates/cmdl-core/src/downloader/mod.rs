//! Concurrent ranged-download engine.
//!
//! Plans the file into chunks, preallocates the destination, then runs the
//! admission/outcome loop: at most `threads` ranged GETs in flight, each writing
//! at its own offset. The first chunk failure cancels everything else and is
//! the single error returned. No retries, no resume.

mod coordinator;
mod fetch;
mod outcome;
mod run;
mod scheduler;
pub mod single;

#[cfg(test)]
pub(crate) mod testing;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;
use crate::error::DownloadError;
use crate::planner::DownloadPlan;
use crate::progress::ProgressSink;
use crate::storage::allocate;
use crate::transport::{Transport, TransportError};

pub use coordinator::{Coordinator, RunState, RunSummary};
pub use fetch::fetch_chunk;
pub use outcome::{ChunkOutcome, ChunkStatus};
pub use run::run_plan;
pub use scheduler::Scheduler;

/// Default number of concurrent chunk fetches.
pub const DEFAULT_THREADS: usize = 8;
/// Default upper bound on a chunk's length (1 GiB).
pub const DEFAULT_MAX_CHUNK_SIZE: u64 = 1 << 30;

/// What to download and how to split it.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub dest: PathBuf,
    /// Total size in bytes; 0 means unknown and triggers a size probe.
    pub expected_size: u64,
    pub threads: usize,
    pub max_chunk_size: u64,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            dest: dest.into(),
            expected_size: 0,
            threads: DEFAULT_THREADS,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
        }
    }

    pub fn expected_size(mut self, size: u64) -> Self {
        self.expected_size = size;
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn max_chunk_size(mut self, size: u64) -> Self {
        self.max_chunk_size = size;
        self
    }
}

/// Summary of a completed download.
#[derive(Debug, Clone)]
pub struct DownloadReport {
    pub total_size: u64,
    /// 1 for a single-stream download.
    pub chunk_count: usize,
    pub elapsed: Duration,
}

/// Entry point of the engine; holds the injected transport.
#[derive(Clone)]
pub struct Downloader {
    transport: Arc<dyn Transport>,
}

impl Downloader {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Ask the server for the resource size.
    pub fn discover_size(&self, url: &str) -> Result<u64, DownloadError> {
        let fail = |source| DownloadError::SizeDiscovery {
            url: url.to_string(),
            source,
        };
        let info = self.transport.head(url).map_err(fail)?;
        let size = info.content_length.ok_or_else(|| {
            fail(TransportError::Protocol(
                "server did not report a content length".to_string(),
            ))
        })?;
        tracing::debug!(url, size, accept_ranges = info.accept_ranges, "size discovered");
        Ok(size)
    }

    /// Download `request` to completion on the calling thread.
    pub fn download(
        &self,
        request: &DownloadRequest,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<DownloadReport, DownloadError> {
        if request.threads == 0 {
            return Err(DownloadError::config("thread count must be positive"));
        }
        if request.max_chunk_size == 0 {
            return Err(DownloadError::config("max chunk size must be positive"));
        }

        let started = Instant::now();
        let total = match request.expected_size {
            0 => self.discover_size(&request.url)?,
            n => n,
        };

        let plan = DownloadPlan::new(
            &request.url,
            &request.dest,
            total,
            request.threads,
            request.max_chunk_size,
        )?;
        allocate(&request.dest, total)?;

        tracing::info!(
            url = %request.url,
            dest = %request.dest.display(),
            total_size = total,
            chunks = plan.len(),
            chunk_size = plan.chunk_size(),
            threads = request.threads,
            "starting ranged download"
        );

        let summary = run_plan(
            &plan,
            request.threads,
            Arc::clone(&self.transport),
            progress,
            CancelToken::new(),
        );
        summary.into_result()?;

        let elapsed = started.elapsed();
        tracing::info!(
            dest = %request.dest.display(),
            bytes = total,
            secs = elapsed.as_secs_f64(),
            "download complete"
        );
        Ok(DownloadReport {
            total_size: total,
            chunk_count: plan.len(),
            elapsed,
        })
    }

    /// Run `download` on tokio's blocking pool.
    pub async fn download_async(
        &self,
        request: DownloadRequest,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<DownloadReport, DownloadError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.download(&request, progress)).await?
    }

    /// Plain single-stream GET into `request.dest`; ignores chunking settings.
    pub fn download_direct(
        &self,
        request: &DownloadRequest,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<DownloadReport, DownloadError> {
        let started = Instant::now();
        let expected = (request.expected_size > 0).then_some(request.expected_size);
        let total_size = single::download_single(
            &*self.transport,
            &request.url,
            &request.dest,
            expected,
            &*progress,
        )?;
        Ok(DownloadReport {
            total_size,
            chunk_count: 1,
            elapsed: started.elapsed(),
        })
    }

    /// Run `download_direct` on tokio's blocking pool.
    pub async fn download_direct_async(
        &self,
        request: DownloadRequest,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<DownloadReport, DownloadError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.download_direct(&request, progress)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Fault, FakeTransport};
    use super::*;
    use crate::error::ChunkError;
    use crate::progress::{ByteCounter, NoProgress};

    fn payload(n: usize) -> Vec<u8> {
        (0..n).map(|i| (i % 253) as u8).collect()
    }

    #[test]
    fn downloads_with_known_size() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a/b/model.safetensors");
        let body = payload(2500);
        let dl = Downloader::new(Arc::new(FakeTransport::new(body.clone())));
        let req = DownloadRequest::new("http://fake/m", &dest)
            .expected_size(2500)
            .threads(4)
            .max_chunk_size(1000);

        let report = dl.download(&req, Arc::new(NoProgress)).unwrap();
        assert_eq!(report.total_size, 2500);
        assert_eq!(report.chunk_count, 4);
        assert_eq!(std::fs::read(&dest).unwrap(), body);
    }

    #[test]
    fn unknown_size_is_probed() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("m.bin");
        let body = payload(10_000);
        let dl = Downloader::new(Arc::new(FakeTransport::new(body.clone())));
        let req = DownloadRequest::new("http://fake/m", &dest).max_chunk_size(1000);
        let counter = Arc::new(ByteCounter::new());

        let report = dl.download(&req, counter.clone()).unwrap();
        assert_eq!(report.total_size, 10_000);
        assert_eq!(report.chunk_count, 10);
        assert_eq!(counter.get(), 10_000);
        assert_eq!(std::fs::read(&dest).unwrap(), body);
    }

    #[test]
    fn missing_length_is_size_discovery_error() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FakeTransport::new(payload(10)).head_length(None);
        let dl = Downloader::new(Arc::new(transport));
        let req = DownloadRequest::new("http://fake/m", dir.path().join("m.bin"));
        let err = dl.download(&req, Arc::new(NoProgress)).unwrap_err();
        assert!(matches!(err, DownloadError::SizeDiscovery { .. }));
        assert!(!dir.path().join("m.bin").exists());
    }

    #[test]
    fn invalid_settings_fail_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FakeTransport::new(payload(10)));
        let dl = Downloader::new(transport.clone());
        let dest = dir.path().join("m.bin");

        let err = dl
            .download(&DownloadRequest::new("http://fake/m", &dest).threads(0), Arc::new(NoProgress))
            .unwrap_err();
        assert!(matches!(err, DownloadError::Config(_)));

        let err = dl
            .download(
                &DownloadRequest::new("http://fake/m", &dest).max_chunk_size(0),
                Arc::new(NoProgress),
            )
            .unwrap_err();
        assert!(matches!(err, DownloadError::Config(_)));

        // A zero-length resource cannot be planned.
        let dl = Downloader::new(Arc::new(FakeTransport::new(Vec::new())));
        let err = dl
            .download(&DownloadRequest::new("http://fake/m", &dest), Arc::new(NoProgress))
            .unwrap_err();
        assert!(matches!(err, DownloadError::Config(_)));
        assert!(transport.requests().is_empty());
        assert!(!dest.exists());
    }

    #[test]
    fn chunk_failure_is_the_only_error() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FakeTransport::new(payload(4000)).fault(3000, Fault::Short(1));
        let dl = Downloader::new(Arc::new(transport));
        let req = DownloadRequest::new("http://fake/m", dir.path().join("m.bin"))
            .threads(4)
            .max_chunk_size(1000);
        match dl.download(&req, Arc::new(NoProgress)).unwrap_err() {
            DownloadError::ChunkIo {
                index: 3,
                source: ChunkError::LengthMismatch { expected: 1000, received: 999 },
                ..
            } => {}
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn async_bridge_runs_on_blocking_pool() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("m.bin");
        let body = payload(3000);
        let dl = Downloader::new(Arc::new(FakeTransport::new(body.clone())));
        let req = DownloadRequest::new("http://fake/m", &dest).threads(3);

        let report = dl.download_async(req, Arc::new(NoProgress)).await.unwrap();
        assert_eq!(report.chunk_count, 3);
        assert_eq!(std::fs::read(&dest).unwrap(), body);

        let direct = dir.path().join("direct.bin");
        let report = dl
            .download_direct_async(DownloadRequest::new("http://fake/m", &direct), Arc::new(NoProgress))
            .await
            .unwrap();
        assert_eq!(report.total_size, 3000);
        assert_eq!(report.chunk_count, 1);
        assert_eq!(std::fs::read(&direct).unwrap(), body);
    }
}
