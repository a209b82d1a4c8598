//! Destination file lifecycle.
//!
//! `allocate` sizes the destination to its final length before any chunk
//! starts; each fetch then opens its own `ChunkWriter` handle positioned at
//! the chunk's offset, so concurrent writers never share a file cursor.

mod allocate;
mod writer;

pub use allocate::allocate;
pub use writer::ChunkWriter;
