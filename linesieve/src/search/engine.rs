use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::chunker;
use super::matcher::{LinePredicate, Matcher};
use super::pool::WorkerPool;
use crate::bench::{self, PerformanceStats};
use crate::config::EngineConfig;
use crate::criteria::{Criteria, SearchOptions};
use crate::errors::{EngineResult, SearchError};
use crate::metrics::EngineMetrics;
use crate::results::{self, SearchResult};
use crate::timing::SearchTimer;

// Least recently used entries are evicted past these sizes
const MAX_CACHED_MATCHERS: usize = 64;
const MAX_CACHED_POOLS: usize = 4;

/// A cache entry stamped with the engine tick of its last use
#[derive(Debug)]
struct Cached<T> {
    value: T,
    last_used: AtomicU64,
}

/// A long-lived filtering engine.
///
/// Owns the last-search-time cell, a bounded cache of compiled matchers and a
/// bounded set of worker pools keyed by thread count. Engines are independent
/// of each other. One search in flight per engine is the supported discipline.
#[derive(Debug)]
pub struct FilterEngine {
    config: EngineConfig,
    timer: SearchTimer,
    metrics: EngineMetrics,
    matchers: DashMap<(Criteria, SearchOptions), Cached<Arc<Matcher>>>,
    pools: DashMap<usize, Cached<WorkerPool>>,
    tick: AtomicU64,
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl FilterEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            timer: SearchTimer::new(),
            metrics: EngineMetrics::new(),
            matchers: DashMap::new(),
            pools: DashMap::new(),
            tick: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Worker count used by [`measure_performance`](Self::measure_performance)
    pub fn default_workers(&self) -> usize {
        self.config.max_workers.get()
    }

    /// Worker count suited to a text of `total_lines` lines.
    ///
    /// Small inputs run on one thread, since spreading a few hundred lines
    /// over a pool costs more than it saves. Never above the configured
    /// `max_workers`.
    pub fn recommended_workers(&self, total_lines: usize) -> usize {
        let suggested = match total_lines {
            0..=999 => 1,
            1_000..=9_999 => 4,
            _ => 8,
        };
        suggested.min(self.default_workers())
    }

    /// Compiles criteria, reusing a cached matcher for identical criteria and options
    pub fn compile(&self, criteria: &Criteria, options: &SearchOptions) -> EngineResult<Arc<Matcher>> {
        // show_only_matches and all_tabs never change the predicate
        let key_options = SearchOptions {
            show_only_matches: false,
            all_tabs: false,
            ..*options
        };
        let key = (criteria.clone(), key_options);

        if let Some(cached) = self.matchers.get(&key) {
            cached.last_used.store(self.next_tick(), Ordering::Relaxed);
            self.metrics.record_cache_lookup(true);
            return Ok(Arc::clone(&cached.value));
        }

        let matcher = Arc::new(Matcher::compile(criteria, options)?);
        self.metrics.record_cache_lookup(false);
        insert_bounded(
            &self.matchers,
            key,
            Arc::clone(&matcher),
            self.next_tick(),
            MAX_CACHED_MATCHERS,
        );
        Ok(matcher)
    }

    /// Drops every cached matcher and worker pool
    pub fn clear_cache(&self) {
        debug!(
            "Clearing {} cached matchers and {} worker pools",
            self.matchers.len(),
            self.pools.len()
        );
        self.matchers.clear();
        self.pools.clear();
    }

    pub fn cached_matchers(&self) -> usize {
        self.matchers.len()
    }

    pub fn cached_pools(&self) -> usize {
        self.pools.len()
    }

    /// Filters `text` line by line using up to `max_workers` threads.
    ///
    /// The criteria are compiled before any chunking happens, so an invalid
    /// pattern never dispatches work. On success the search time becomes
    /// [`last_search_time`](Self::last_search_time); on failure it is left alone.
    pub fn search(
        &self,
        text: &str,
        criteria: &Criteria,
        options: &SearchOptions,
        max_workers: usize,
    ) -> EngineResult<SearchResult> {
        info!("Starting search with criteria: {}", criteria);
        let matcher = self.prepare(criteria, options, max_workers)?;
        self.run_pipeline(text, matcher.as_ref(), max_workers, None)
    }

    /// Returns at most the first `max_results` matching lines, in line order.
    ///
    /// Workers stop scanning their chunk once it holds `max_results` matches,
    /// so a preview of a large text costs far less than a full search.
    /// `total_lines` still counts every line of `text`.
    pub fn search_preview(
        &self,
        text: &str,
        criteria: &Criteria,
        options: &SearchOptions,
        max_workers: usize,
        max_results: usize,
    ) -> EngineResult<SearchResult> {
        info!(
            "Starting preview search (first {} matches) with criteria: {}",
            max_results, criteria
        );
        if max_results == 0 {
            self.metrics.record_failure();
            return Err(SearchError::invalid_argument(
                "max_results must be at least 1",
            ));
        }
        let matcher = self.prepare(criteria, options, max_workers)?;
        self.run_pipeline(text, matcher.as_ref(), max_workers, Some(max_results))
    }

    /// Runs the chunked pipeline with a caller-supplied predicate
    pub fn search_with<P>(&self, text: &str, predicate: &P, max_workers: usize) -> EngineResult<SearchResult>
    where
        P: LinePredicate + ?Sized,
    {
        if let Err(err) = validate_workers(max_workers) {
            self.metrics.record_failure();
            return Err(err);
        }
        self.run_pipeline(text, predicate, max_workers, None)
    }

    /// Validates the worker count and compiles, counting a rejection as a failed search
    fn prepare(
        &self,
        criteria: &Criteria,
        options: &SearchOptions,
        max_workers: usize,
    ) -> EngineResult<Arc<Matcher>> {
        validate_workers(max_workers)
            .and_then(|()| self.compile(criteria, options))
            .map_err(|err| {
                self.metrics.record_failure();
                err
            })
    }

    fn run_pipeline<P>(
        &self,
        text: &str,
        predicate: &P,
        max_workers: usize,
        max_results: Option<usize>,
    ) -> EngineResult<SearchResult>
    where
        P: LinePredicate + ?Sized,
    {
        let outcome = self.timer.measure_search(|| {
            let chunks = chunker::split(text, max_workers);
            let pool = self.pool_for(max_workers.min(chunks.len()).max(1))?;
            let partials = pool.run_limited(&chunks, predicate, max_results)?;
            let mut aggregate = results::merge(partials);
            if let Some(limit) = max_results {
                aggregate.matched_lines.truncate(limit);
            }
            Ok((chunks.len(), aggregate))
        });

        match outcome {
            Ok(((chunk_count, aggregate), search_time)) => {
                let result = SearchResult::new(aggregate, search_time);
                self.metrics.record_search(
                    chunk_count,
                    result.total_lines,
                    result.matched_line_count(),
                );
                info!(
                    "Search complete. Matched {} of {} lines in {:?}",
                    result.matched_line_count(),
                    result.total_lines,
                    search_time
                );
                Ok(result)
            }
            Err(err) => {
                self.metrics.record_failure();
                Err(err)
            }
        }
    }

    /// Searches several documents with the same criteria.
    ///
    /// Without `all_tabs` only the first document, the active one, is
    /// searched. Results come back in document order.
    pub fn search_documents(
        &self,
        documents: &[&str],
        criteria: &Criteria,
        options: &SearchOptions,
        max_workers: usize,
    ) -> EngineResult<Vec<SearchResult>> {
        selected_documents(documents, options)
            .iter()
            .map(|text| self.search(text, criteria, options, max_workers))
            .collect()
    }

    /// [`search_documents`](Self::search_documents) with a per-document
    /// [`search_preview`](Self::search_preview) limit
    pub fn preview_documents(
        &self,
        documents: &[&str],
        criteria: &Criteria,
        options: &SearchOptions,
        max_workers: usize,
        max_results: usize,
    ) -> EngineResult<Vec<SearchResult>> {
        selected_documents(documents, options)
            .iter()
            .map(|text| self.search_preview(text, criteria, options, max_workers, max_results))
            .collect()
    }

    /// Repeats a search `iterations` times and summarizes the timings
    pub fn measure_performance(
        &self,
        text: &str,
        criteria: &Criteria,
        options: &SearchOptions,
        iterations: usize,
    ) -> EngineResult<PerformanceStats> {
        bench::measure_performance(self, text, criteria, options, iterations)
    }

    /// Most recent successful search time; zero before the first search
    pub fn last_search_time(&self) -> Duration {
        self.timer.last_search_time()
    }

    /// Records the caller's presentation time for the latest result
    pub fn record_apply_time(&self, apply_time: Duration) {
        self.timer.record_apply_time(apply_time);
    }

    pub fn last_apply_time(&self) -> Option<Duration> {
        self.timer.last_apply_time()
    }

    pub fn last_total_time(&self) -> Option<Duration> {
        self.timer.last_total_time()
    }

    fn next_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::Relaxed)
    }

    fn pool_for(&self, workers: usize) -> EngineResult<WorkerPool> {
        if let Some(cached) = self.pools.get(&workers) {
            cached.last_used.store(self.next_tick(), Ordering::Relaxed);
            return Ok(cached.value.clone());
        }
        let pool = WorkerPool::new(workers)?;
        insert_bounded(
            &self.pools,
            workers,
            pool.clone(),
            self.next_tick(),
            MAX_CACHED_POOLS,
        );
        Ok(pool)
    }
}

/// Inserts `value`, first evicting least recently used entries to stay within `capacity`
fn insert_bounded<K, V>(map: &DashMap<K, Cached<V>>, key: K, value: V, tick: u64, capacity: usize)
where
    K: Eq + Hash + Clone,
{
    while map.len() >= capacity && !map.contains_key(&key) {
        let oldest = map
            .iter()
            .min_by_key(|entry| entry.last_used.load(Ordering::Relaxed))
            .map(|entry| entry.key().clone());
        match oldest {
            Some(oldest) => {
                debug!("Evicting least recently used cache entry");
                map.remove(&oldest);
            }
            None => break,
        }
    }
    map.insert(
        key,
        Cached {
            value,
            last_used: AtomicU64::new(tick),
        },
    );
}

/// Every document with `all_tabs`, otherwise only the first (active) one
fn selected_documents<'a, 'b>(documents: &'a [&'b str], options: &SearchOptions) -> &'a [&'b str] {
    let selected = if options.all_tabs {
        documents
    } else {
        &documents[..documents.len().min(1)]
    };
    debug!(
        "Searching {} of {} documents",
        selected.len(),
        documents.len()
    );
    selected
}

fn validate_workers(max_workers: usize) -> EngineResult<()> {
    if max_workers == 0 {
        return Err(SearchError::invalid_argument(
            "max_workers must be at least 1",
        ));
    }
    Ok(())
}
