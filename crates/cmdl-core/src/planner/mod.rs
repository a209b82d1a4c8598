//! Chunk planning.
//!
//! Turns (total size, thread count, max chunk size) into an ordered,
//! gap-free partition of inclusive byte ranges. Pure computation; the plan is
//! fixed once built and never re-chunked.

mod range;

pub use range::{effective_chunk_size, plan_ranges, Chunk, DownloadPlan, MAX_CHUNKS};
