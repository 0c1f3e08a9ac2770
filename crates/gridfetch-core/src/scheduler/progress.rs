//! Progress reporting for one chunk's run.

/// Snapshot after each completed item; consumers render it however they like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    /// Items finished (fetched, skipped, or failed).
    pub completed: usize,
    /// Items attempted this run.
    pub total: usize,
}

impl ChunkProgress {
    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.completed as f64 / self.total as f64).min(1.0)
    }
}
