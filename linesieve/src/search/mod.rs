//! The chunked, parallel search pipeline.
//!
//! A search runs in three steps:
//!
//! 1. **Split**: [`chunker::split`] cuts the text on line boundaries into one
//!    chunk per worker. Chunks borrow their lines from the input, so nothing
//!    is copied until a line actually matches.
//! 2. **Scan**: [`WorkerPool::run`] hands the chunks to a fixed-size rayon
//!    pool. Every worker applies the compiled [`Matcher`] (or any other
//!    [`LinePredicate`]) to its chunk and returns the matching lines.
//! 3. **Merge**: [`crate::results::merge`] reorders the partial results by
//!    chunk index, which restores input line order regardless of which worker
//!    finished first.
//!
//! ```rust,ignore
//! let engine = FilterEngine::default();
//! let criteria = Criteria::keywords(["ERROR", "WARNING"], ["DEBUG"]);
//! let result = engine.search(&text, &criteria, &SearchOptions::default(), 4)?;
//! for record in &result.matched_lines {
//!     println!("{}: {}", record.line_index + 1, record.text);
//! }
//! ```
//!
//! The input text and the predicate are shared read-only between workers.
//! The only shared mutable state during a search is rayon's job queue, the
//! cancellation flag and the first-error slot.

pub mod chunker;
pub mod engine;
pub mod matcher;
pub mod pool;

pub use chunker::{split, Chunk};
pub use engine::FilterEngine;
pub use matcher::{LinePredicate, MatchStrategy, Matcher};
pub use pool::WorkerPool;
