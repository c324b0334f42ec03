use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::errors::EngineResult;

/// Phase timing for one engine.
///
/// Holds the most recent search time and the most recent apply time the
/// caller reported. Each value is overwritten, never accumulated. Pairing an
/// apply time with the right search is up to the caller.
#[derive(Debug, Default)]
pub struct SearchTimer {
    last_search_nanos: AtomicU64,
    last_apply_nanos: AtomicU64,
    has_apply: AtomicBool,
}

impl SearchTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` and returns its output with the elapsed time.
    ///
    /// The elapsed time becomes the last search time only when `f` succeeds.
    pub fn measure_search<T, F>(&self, f: F) -> EngineResult<(T, Duration)>
    where
        F: FnOnce() -> EngineResult<T>,
    {
        let start = Instant::now();
        let output = f()?;
        let elapsed = start.elapsed();

        self.last_search_nanos
            .store(duration_to_nanos(elapsed), Ordering::Release);
        debug!("Search phase took {:?}", elapsed);
        Ok((output, elapsed))
    }

    /// Records how long the caller took to present the latest result
    pub fn record_apply_time(&self, apply_time: Duration) {
        self.last_apply_nanos
            .store(duration_to_nanos(apply_time), Ordering::Release);
        self.has_apply.store(true, Ordering::Release);
        debug!("Apply phase took {:?}", apply_time);
    }

    /// Most recent successful search time; zero before the first search
    pub fn last_search_time(&self) -> Duration {
        Duration::from_nanos(self.last_search_nanos.load(Ordering::Acquire))
    }

    pub fn last_apply_time(&self) -> Option<Duration> {
        self.has_apply
            .load(Ordering::Acquire)
            .then(|| Duration::from_nanos(self.last_apply_nanos.load(Ordering::Acquire)))
    }

    /// Last search time plus last apply time, once an apply time was reported
    pub fn last_total_time(&self) -> Option<Duration> {
        self.last_apply_time()
            .map(|apply| self.last_search_time() + apply)
    }
}

fn duration_to_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
