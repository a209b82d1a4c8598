//! Progress reporting (bytes written, rate, ETA).
//!
//! Fetches push additive byte deltas into a `ProgressSink`; the CLI samples a
//! `ByteCounter` and renders `ProgressStats`.

use std::sync::atomic::{AtomicU64, Ordering};

/// Receives byte-count deltas from concurrent fetches.
pub trait ProgressSink: Send + Sync {
    fn add(&self, bytes: u64);
}

/// Thread-safe accumulator of bytes written.
#[derive(Debug, Default)]
pub struct ByteCounter {
    bytes: AtomicU64,
}

impl ByteCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

impl ProgressSink for ByteCounter {
    fn add(&self, bytes: u64) {
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }
}

/// Sink that drops every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn add(&self, _bytes: u64) {}
}

/// Snapshot of download progress (CLI-friendly).
#[derive(Debug, Clone)]
pub struct ProgressStats {
    pub bytes_done: u64,
    pub total_bytes: u64,
    /// Seconds since the download started.
    pub elapsed_secs: f64,
}

impl ProgressStats {
    /// Average rate in bytes per second (0 if nothing elapsed).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None while the rate is still 0).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total_bytes.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.bytes_done as f64 / self.total_bytes as f64).min(1.0)
    }
}
