/// Repeatable timing of the full search pipeline.
///
/// Runs are sequential so they do not compete for the worker threads. Only
/// the search time and the match count of each run are kept; the matched
/// lines themselves are dropped right away.
///
/// Identical input must give identical counts on every run. A run that
/// disagrees with the first one fails the whole measurement with
/// [`SearchError::NonDeterministic`] instead of being averaged in.
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::criteria::{Criteria, SearchOptions};
use crate::errors::{EngineResult, SearchError};
use crate::results::SearchResult;
use crate::search::FilterEngine;

/// Summary of repeated searches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PerformanceStats {
    pub iterations: usize,
    pub average_time: Duration,
    pub min_time: Duration,
    pub max_time: Duration,
    pub total_lines: usize,
    pub matched_line_count: usize,
}

impl PerformanceStats {
    /// Lines per second at the average search time
    pub fn throughput(&self) -> f64 {
        let secs = self.average_time.as_secs_f64();
        if secs > 0.0 {
            self.total_lines as f64 / secs
        } else {
            f64::INFINITY
        }
    }
}

/// Measures `iterations` sequential searches using the engine's default worker count
pub fn measure_performance(
    engine: &FilterEngine,
    text: &str,
    criteria: &Criteria,
    options: &SearchOptions,
    iterations: usize,
) -> EngineResult<PerformanceStats> {
    measure_performance_with(engine, text, criteria, options, iterations, |_, _| {})
}

/// Like [`measure_performance`], calling `on_iteration(index, search_time)` after each run
pub fn measure_performance_with<F>(
    engine: &FilterEngine,
    text: &str,
    criteria: &Criteria,
    options: &SearchOptions,
    iterations: usize,
    on_iteration: F,
) -> EngineResult<PerformanceStats>
where
    F: FnMut(usize, Duration),
{
    if iterations < 1 {
        return Err(SearchError::invalid_argument(
            "iterations must be at least 1",
        ));
    }

    let workers = engine.default_workers();
    info!(
        "Benchmarking {} iterations with {} workers",
        iterations, workers
    );

    let stats = run_iterations(
        iterations,
        || engine.search(text, criteria, options, workers),
        on_iteration,
    )?;
    info!(
        "Benchmark complete: avg {:?}, min {:?}, max {:?}, {:.0} lines/s",
        stats.average_time,
        stats.min_time,
        stats.max_time,
        stats.throughput()
    );
    Ok(stats)
}

/// Runs `search` repeatedly, checking each run against the first
fn run_iterations<S, F>(
    iterations: usize,
    mut search: S,
    mut on_iteration: F,
) -> EngineResult<PerformanceStats>
where
    S: FnMut() -> EngineResult<SearchResult>,
    F: FnMut(usize, Duration),
{
    let mut times = Vec::with_capacity(iterations);
    // (matched_lines, total_lines) of the first run
    let mut baseline: Option<(usize, usize)> = None;

    for iteration in 0..iterations {
        let result = search()?;
        let counts = (result.matched_line_count(), result.total_lines);

        match baseline {
            None => baseline = Some(counts),
            Some(expected) if expected != counts => {
                return Err(SearchError::non_deterministic(iteration, expected, counts));
            }
            Some(_) => {}
        }

        debug!("Iteration {} took {:?}", iteration, result.search_time);
        times.push(result.search_time);
        on_iteration(iteration, result.search_time);
    }

    let (matched_line_count, total_lines) = baseline.unwrap_or_default();
    Ok(summarize(&times, total_lines, matched_line_count))
}

fn summarize(times: &[Duration], total_lines: usize, matched_line_count: usize) -> PerformanceStats {
    let total: Duration = times.iter().sum();
    let min_time = times.iter().copied().min().unwrap_or_default();
    let max_time = times.iter().copied().max().unwrap_or_default();
    let average_time = match u32::try_from(times.len()) {
        Ok(n) if n > 0 => total / n,
        _ => Duration::from_secs_f64(total.as_secs_f64() / times.len().max(1) as f64),
    };

    PerformanceStats {
        iterations: times.len(),
        average_time,
        min_time,
        max_time,
        total_lines,
        matched_line_count,
    }
}
