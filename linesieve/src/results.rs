/// Result types and the aggregation step.
///
/// Workers finish in any order. Each one hands back a [`PartialResult`] tagged
/// with the index of the chunk it scanned, and [`merge`] puts them back
/// together by that index:
///
/// ```text
/// completion order:  chunk 2, chunk 0, chunk 3, chunk 1
/// merge order:       chunk 0, chunk 1, chunk 2, chunk 3
/// ```
///
/// Chunks are disjoint and ordered by their first line, and each partial
/// result is already in line order. Concatenating by chunk index is therefore
/// enough to produce one globally line-ordered list, without a sort over the
/// matches themselves.
use serde::Serialize;
use std::time::Duration;
use tracing::trace;

/// A line that satisfied the criteria
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRecord {
    /// 0-based position in the original text
    pub line_index: usize,
    /// The line itself, without its terminator
    pub text: String,
}

/// Output of one worker for one chunk
#[derive(Debug, Clone, Default)]
pub struct PartialResult {
    pub chunk_index: usize,
    /// Lines in the chunk, matched or not, even when scanning stopped early
    pub line_count: usize,
    /// Matches in ascending line order
    pub matches: Vec<MatchRecord>,
}

/// Merged output of all workers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    pub matched_lines: Vec<MatchRecord>,
    pub total_lines: usize,
}

/// Merges partial results by ascending chunk index, ignoring completion order
pub fn merge(mut partials: Vec<PartialResult>) -> Aggregate {
    partials.sort_unstable_by_key(|p| p.chunk_index);

    let total_lines = partials.iter().map(|p| p.line_count).sum();
    let capacity = partials.iter().map(|p| p.matches.len()).sum();
    let mut matched_lines = Vec::with_capacity(capacity);
    for partial in partials {
        trace!(
            "Merging chunk {} ({} matches)",
            partial.chunk_index,
            partial.matches.len()
        );
        matched_lines.extend(partial.matches);
    }

    debug_assert!(
        matched_lines
            .windows(2)
            .all(|w| w[0].line_index < w[1].line_index),
        "merged matches must be strictly ascending by line index"
    );

    Aggregate {
        matched_lines,
        total_lines,
    }
}

/// The complete result of one search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    /// Sorted ascending and unique by line index
    pub matched_lines: Vec<MatchRecord>,
    pub total_lines: usize,
    /// Time spent chunking, matching and merging
    pub search_time: Duration,
    /// Time the caller spent presenting this result, once reported
    pub apply_time: Option<Duration>,
}

impl SearchResult {
    pub fn new(aggregate: Aggregate, search_time: Duration) -> Self {
        Self {
            matched_lines: aggregate.matched_lines,
            total_lines: aggregate.total_lines,
            search_time,
            apply_time: None,
        }
    }

    pub fn matched_line_count(&self) -> usize {
        self.matched_lines.len()
    }

    /// Attaches the caller's presentation time to this result
    pub fn set_apply_time(&mut self, apply_time: Duration) {
        self.apply_time = Some(apply_time);
    }

    /// Search plus apply time; `None` until the apply time is known
    pub fn total_time(&self) -> Option<Duration> {
        self.apply_time.map(|apply| self.search_time + apply)
    }

    /// Line indices of all matches, in order
    pub fn line_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.matched_lines.iter().map(|m| m.line_index)
    }

    /// Returns true if the given original line index matched
    pub fn contains_line(&self, line_index: usize) -> bool {
        self.matched_lines
            .binary_search_by_key(&line_index, |m| m.line_index)
            .is_ok()
    }
}
