//! Chunk scheduler.
//!
//! Fans work items out to fetch workers over a bounded thread pool and
//! aggregates per-chunk results. Individual item failures never abort the
//! batch; the only thing that stops a chunk before it starts is a fatal
//! generation error (no tiles, unreadable output directory).

mod pool;
mod progress;
mod run;

pub use pool::{default_slots, run_bounded};
pub use progress::ChunkProgress;
pub use run::{run_chunk, ChunkRunSummary};
