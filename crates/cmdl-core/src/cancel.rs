//! Cooperative cancellation token shared by a run's fetches.
//!
//! Raised once by the coordinator on the first chunk failure and never
//! cleared. Fetches poll it between buffered reads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Monotonic cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    raised: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Returns true only for the call that raised it.
    pub fn cancel(&self) -> bool {
        !self.raised.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}
