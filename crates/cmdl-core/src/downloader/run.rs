//! The admission/outcome event loop.
//!
//! One OS thread per in-flight chunk; the loop itself runs on the caller's
//! thread and is the only owner of the scheduler and coordinator state.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::cancel::CancelToken;
use crate::error::ChunkError;
use crate::planner::{Chunk, DownloadPlan};
use crate::progress::ProgressSink;
use crate::transport::Transport;

use super::coordinator::{Coordinator, RunState, RunSummary};
use super::fetch::fetch_chunk;
use super::outcome::ChunkOutcome;
use super::scheduler::Scheduler;

/// Run every chunk of `plan` with at most `threads` concurrent fetches.
///
/// Returns once the run is Completed, or once it has Failed and every
/// in-flight fetch has reported back, so no worker is still writing.
pub fn run_plan(
    plan: &DownloadPlan,
    threads: usize,
    transport: Arc<dyn Transport>,
    progress: Arc<dyn ProgressSink>,
    cancel: CancelToken,
) -> RunSummary {
    let mut scheduler = Scheduler::new(plan.chunks().iter().cloned(), threads);
    let mut coordinator = Coordinator::new(plan.len(), cancel.clone());
    let (tx, rx) = mpsc::channel::<ChunkOutcome>();
    let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(plan.len());

    loop {
        if coordinator.state() == RunState::Running {
            while let Some(chunk) = scheduler.next_admission(&cancel) {
                match spawn_fetch(chunk, &transport, &progress, &cancel, &tx) {
                    Ok(handle) => handles.push(handle),
                    Err(outcome) => {
                        scheduler.release();
                        coordinator.on_outcome(outcome);
                    }
                }
            }
        }

        if scheduler.running() == 0 {
            break;
        }

        // The loop holds a sender, so recv only fails if every worker vanished.
        let Ok(outcome) = rx.recv() else {
            break;
        };
        scheduler.release();
        coordinator.on_outcome(outcome);
    }

    for handle in handles {
        let _ = handle.join();
    }

    let summary = coordinator.finish();
    if summary.state == RunState::Failed {
        tracing::debug!(
            succeeded = summary.succeeded,
            aborted = summary.aborted,
            discarded = summary.discarded,
            never_started = scheduler.pending(),
            "run drained after failure"
        );
    }
    summary
}

/// Start one worker thread for `chunk`. If the thread cannot be created, the
/// chunk's failure outcome is returned instead.
fn spawn_fetch(
    chunk: Chunk,
    transport: &Arc<dyn Transport>,
    progress: &Arc<dyn ProgressSink>,
    cancel: &CancelToken,
    tx: &Sender<ChunkOutcome>,
) -> Result<JoinHandle<()>, ChunkOutcome> {
    let transport = Arc::clone(transport);
    let progress = Arc::clone(progress);
    let cancel = cancel.clone();
    let tx = tx.clone();
    let owned = chunk.clone();

    thread::Builder::new()
        .name(format!("cmdl-chunk-{}", chunk.index))
        .spawn(move || {
            let fallback = owned.clone();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                fetch_chunk(&*transport, owned, &cancel, &*progress)
            }))
            .unwrap_or_else(|payload| {
                ChunkOutcome::failed(fallback, ChunkError::Worker(panic_message(&*payload)), 0)
            });
            let _ = tx.send(outcome);
        })
        .map_err(|e| ChunkOutcome::failed(chunk, ChunkError::Worker(e.to_string()), 0))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
