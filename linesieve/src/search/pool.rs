use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, trace, warn};

use super::chunker::Chunk;
use super::matcher::LinePredicate;
use crate::errors::{EngineResult, SearchError};
use crate::results::{MatchRecord, PartialResult};

/// A fixed-size set of worker threads that scan chunks.
///
/// Chunks are queued one job each, so a worker always finishes the chunk it
/// picked up before taking the next one. The first failing line cancels every
/// other worker; nothing partial is returned.
#[derive(Clone)]
pub struct WorkerPool {
    pool: Arc<ThreadPool>,
    workers: usize,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .finish()
    }
}

impl WorkerPool {
    /// Creates a pool with exactly `workers` threads
    pub fn new(workers: usize) -> EngineResult<Self> {
        if workers == 0 {
            return Err(SearchError::invalid_argument(
                "max_workers must be at least 1",
            ));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("linesieve-worker-{}", i))
            .build()
            .map_err(|e| SearchError::config_error(format!("Failed to start worker pool: {}", e)))?;

        debug!("Started worker pool with {} threads", workers);
        Ok(Self {
            pool: Arc::new(pool),
            workers,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Applies `predicate` to every line of every chunk.
    ///
    /// Returns one partial result per chunk, in chunk order. Blocks until all
    /// chunks are done or one of them fails.
    pub fn run<P>(&self, chunks: &[Chunk<'_>], predicate: &P) -> EngineResult<Vec<PartialResult>>
    where
        P: LinePredicate + ?Sized,
    {
        self.run_limited(chunks, predicate, None)
    }

    /// Like [`run`](Self::run), but each chunk stops scanning once it holds
    /// `max_matches` matches.
    ///
    /// Matches a chunk skips can never be among the first `max_matches` of the
    /// merged result, so truncating the merge keeps line order intact.
    pub fn run_limited<P>(
        &self,
        chunks: &[Chunk<'_>],
        predicate: &P,
        max_matches: Option<usize>,
    ) -> EngineResult<Vec<PartialResult>>
    where
        P: LinePredicate + ?Sized,
    {
        let cancelled = AtomicBool::new(false);
        let failure: Mutex<Option<SearchError>> = Mutex::new(None);

        let outcomes: Vec<Option<PartialResult>> = self.pool.install(|| {
            chunks
                .par_iter()
                .with_max_len(1)
                .enumerate()
                .map(|(chunk_index, chunk)| {
                    if cancelled.load(Ordering::Acquire) {
                        return None;
                    }
                    match scan_chunk(chunk_index, chunk, predicate, max_matches, &cancelled) {
                        Ok(partial) => partial,
                        Err(err) => {
                            cancelled.store(true, Ordering::Release);
                            let mut slot = failure.lock().unwrap_or_else(PoisonError::into_inner);
                            if slot.is_none() {
                                *slot = Some(err);
                            }
                            None
                        }
                    }
                })
                .collect()
        });

        if let Some(err) = failure.into_inner().unwrap_or_else(PoisonError::into_inner) {
            warn!("Search aborted: {}", err);
            return Err(err);
        }

        outcomes
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| SearchError::match_execution(0, 0, "search was cancelled"))
    }
}

/// Scans one chunk. `Ok(None)` means another worker failed and this one stopped early.
fn scan_chunk<P>(
    chunk_index: usize,
    chunk: &Chunk<'_>,
    predicate: &P,
    max_matches: Option<usize>,
    cancelled: &AtomicBool,
) -> EngineResult<Option<PartialResult>>
where
    P: LinePredicate + ?Sized,
{
    trace!(
        "Worker scanning chunk {} (lines {}..{})",
        chunk_index,
        chunk.start_line_index,
        chunk.start_line_index + chunk.len()
    );

    let mut matches = Vec::new();
    for (line_index, line) in chunk.indexed_lines() {
        if cancelled.load(Ordering::Relaxed) {
            return Ok(None);
        }

        let verdict = panic::catch_unwind(AssertUnwindSafe(|| predicate.test(line)))
            .map_err(|payload| {
                SearchError::match_execution(chunk_index, line_index, panic_message(&*payload))
            })?;

        match verdict {
            Ok(true) => {
                matches.push(MatchRecord {
                    line_index,
                    text: line.to_string(),
                });
                if max_matches.is_some_and(|limit| matches.len() >= limit) {
                    trace!("Chunk {} reached its match limit", chunk_index);
                    break;
                }
            }
            Ok(false) => {}
            Err(err) => {
                return Err(SearchError::match_execution(
                    chunk_index,
                    line_index,
                    err.to_string(),
                ))
            }
        }
    }

    Ok(Some(PartialResult {
        chunk_index,
        line_count: chunk.len(),
        matches,
    }))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("predicate panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("predicate panicked: {}", msg)
    } else {
        "predicate panicked".to_string()
    }
}
