//! A small fork/join helper for build passes.
//!
//! No shared thread pool: subprocess latency dwarfs thread-creation cost,
//! so each pass spawns its workers, drains a mutex-guarded queue, and
//! joins. The first failure stops hand-out of new items; items already in
//! flight run to completion so child processes exit cleanly.

use crate::error::BuildError;
use std::sync::Mutex;
use tracing::error;

/// Resolve a worker count: zero means "pick for me".
pub fn effective_jobs(n_jobs: usize) -> usize {
    if n_jobs > 0 {
        return n_jobs;
    }
    std::thread::available_parallelism()
        .map(|n| n.get() + 2)
        .unwrap_or(4)
}

/// Run `work` over every item with `n_jobs` workers.
///
/// Items are handed out in order; completion order is unspecified. Returns
/// every collected error (in an unspecified order) after all workers have
/// joined, logging each one.
pub fn parallel_run<T, F>(items: Vec<T>, n_jobs: usize, work: F) -> Result<(), Vec<BuildError>>
where
    T: Send,
    F: Fn(T) -> Result<(), BuildError> + Send + Sync,
{
    struct Queue<T> {
        items: std::vec::IntoIter<T>,
        errors: Vec<BuildError>,
    }

    let queue = Mutex::new(Queue {
        items: items.into_iter(),
        errors: Vec::new(),
    });

    let n_jobs = effective_jobs(n_jobs);
    std::thread::scope(|scope| {
        for _ in 0..n_jobs {
            scope.spawn(|| loop {
                let item = {
                    let mut q = queue.lock().unwrap();
                    if !q.errors.is_empty() {
                        break;
                    }
                    match q.items.next() {
                        Some(item) => item,
                        None => break,
                    }
                };
                // The item runs outside the lock.
                if let Err(e) = work(item) {
                    queue.lock().unwrap().errors.push(e);
                    break;
                }
            });
        }
    });

    let errors = queue.into_inner().unwrap().errors;
    if errors.is_empty() {
        Ok(())
    } else {
        for e in &errors {
            error!("{e}");
        }
        Err(errors)
    }
}
