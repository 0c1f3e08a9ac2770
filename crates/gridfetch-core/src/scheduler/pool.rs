//! Bounded worker pool: a shared queue drained by a fixed set of threads.

use std::collections::VecDeque;
use std::sync::{mpsc, Arc, Mutex};

use super::progress::ChunkProgress;
use crate::fetcher::ItemOutcome;

/// Pool size for this host: one slot per hardware thread, minus one for
/// the coordinating thread, never below one.
pub fn default_slots() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
        .saturating_sub(1)
        .max(1)
}

/// Runs `worker` over every item with at most `slots` items in flight.
///
/// Results are returned in item order; completion order across workers is
/// unordered and deliberately not observable beyond the progress callback,
/// which fires on the coordinating thread after each completion.
pub fn run_bounded<I, F>(
    items: Vec<I>,
    slots: usize,
    worker: Arc<F>,
    mut on_progress: impl FnMut(ChunkProgress),
) -> Vec<ItemOutcome>
where
    I: Send + 'static,
    F: Fn(&I) -> ItemOutcome + Send + Sync + 'static,
{
    let total = items.len();
    if total == 0 {
        return Vec::new();
    }

    let queue: Arc<Mutex<VecDeque<(usize, I)>>> =
        Arc::new(Mutex::new(items.into_iter().enumerate().collect()));
    let (tx, rx) = mpsc::channel();

    let num_workers = slots.max(1).min(total);
    let mut handles = Vec::with_capacity(num_workers);
    for _ in 0..num_workers {
        let queue = Arc::clone(&queue);
        let worker = Arc::clone(&worker);
        let tx = tx.clone();
        handles.push(std::thread::spawn(move || loop {
            let (index, item) = match queue.lock().unwrap().pop_front() {
                Some(pair) => pair,
                None => break,
            };
            let outcome = worker(&item);
            if tx.send((index, outcome)).is_err() {
                break;
            }
        }));
    }
    drop(tx);

    let mut results = vec![ItemOutcome::Failed; total];
    let mut completed = 0usize;
    while completed < total {
        let (index, outcome) = match rx.recv() {
            Ok(pair) => pair,
            Err(_) => {
                // A worker panicked; remaining items stay Failed.
                tracing::error!("worker pool channel closed with {} items pending", total - completed);
                break;
            }
        };
        results[index] = outcome;
        completed += 1;
        on_progress(ChunkProgress { completed, total });
    }

    for h in handles {
        let _ = h.join();
    }
    results
}
