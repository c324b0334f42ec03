use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Cumulative counters for one engine
#[derive(Debug, Clone)]
pub struct EngineMetrics {
    // Search metrics
    searches: Arc<AtomicU64>,
    failed_searches: Arc<AtomicU64>,
    lines_scanned: Arc<AtomicU64>,
    lines_matched: Arc<AtomicU64>,
    chunks_dispatched: Arc<AtomicU64>,

    // Matcher cache metrics
    cache_hits: Arc<AtomicU64>,
    cache_misses: Arc<AtomicU64>,
}

impl EngineMetrics {
    /// Creates a new EngineMetrics instance
    pub fn new() -> Self {
        Self {
            searches: Arc::new(AtomicU64::new(0)),
            failed_searches: Arc::new(AtomicU64::new(0)),
            lines_scanned: Arc::new(AtomicU64::new(0)),
            lines_matched: Arc::new(AtomicU64::new(0)),
            chunks_dispatched: Arc::new(AtomicU64::new(0)),
            cache_hits: Arc::new(AtomicU64::new(0)),
            cache_misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records a completed search
    pub fn record_search(&self, chunks: usize, lines: usize, matched: usize) {
        self.searches.fetch_add(1, Ordering::Relaxed);
        self.chunks_dispatched
            .fetch_add(chunks as u64, Ordering::Relaxed);
        let total = self.lines_scanned.fetch_add(lines as u64, Ordering::Relaxed) + lines as u64;
        self.lines_matched
            .fetch_add(matched as u64, Ordering::Relaxed);
        debug!(
            "Search recorded: {} chunks, {} lines, {} matched, {} lines scanned so far",
            chunks, lines, matched, total
        );
    }

    /// Records a search that returned an error
    pub fn record_failure(&self) {
        self.failed_searches.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a matcher cache lookup
    pub fn record_cache_lookup(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    /// Gets a point-in-time copy of all counters
    pub fn snapshot(&self) -> EngineStats {
        EngineStats {
            searches: self.searches.load(Ordering::Relaxed),
            failed_searches: self.failed_searches.load(Ordering::Relaxed),
            lines_scanned: self.lines_scanned.load(Ordering::Relaxed),
            lines_matched: self.lines_matched.load(Ordering::Relaxed),
            chunks_dispatched: self.chunks_dispatched.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }

    /// Logs current statistics
    pub fn log_stats(&self) {
        let stats = self.snapshot();
        info!(
            "Engine stats:\n\
             Searches (ok/failed): {}/{}\n\
             Lines scanned/matched: {}/{}\n\
             Chunks dispatched: {}\n\
             Matcher cache hits/misses: {}/{}",
            stats.searches,
            stats.failed_searches,
            stats.lines_scanned,
            stats.lines_matched,
            stats.chunks_dispatched,
            stats.cache_hits,
            stats.cache_misses
        );
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time engine statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct EngineStats {
    pub searches: u64,
    pub failed_searches: u64,
    pub lines_scanned: u64,
    pub lines_matched: u64,
    pub chunks_dispatched: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_tracking() {
        let metrics = EngineMetrics::new();

        metrics.record_search(4, 1000, 12);
        metrics.record_search(2, 500, 3);
        let stats = metrics.snapshot();
        assert_eq!(stats.searches, 2);
        assert_eq!(stats.chunks_dispatched, 6);
        assert_eq!(stats.lines_scanned, 1500);
        assert_eq!(stats.lines_matched, 15);

        metrics.record_failure();
        assert_eq!(metrics.snapshot().failed_searches, 1);
    }

    #[test]
    fn test_cache_metrics() {
        let metrics = EngineMetrics::new();

        metrics.record_cache_lookup(false);
        metrics.record_cache_lookup(true);
        metrics.record_cache_lookup(true);
        assert_eq!(metrics.cache_hits(), 2);
        assert_eq!(metrics.cache_misses(), 1);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = EngineMetrics::new();
        let clone = metrics.clone();
        clone.record_search(1, 10, 1);
        assert_eq!(metrics.snapshot().searches, 1);
    }
}
