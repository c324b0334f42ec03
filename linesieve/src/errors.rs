/// Error types for the filtering engine.
///
/// Every failure is returned synchronously to the caller of
/// [`FilterEngine::search`](crate::FilterEngine::search) or
/// [`FilterEngine::measure_performance`](crate::FilterEngine::measure_performance).
/// Nothing is logged and swallowed inside the engine.
///
/// ```rust,ignore
/// match engine.search(text, &criteria, &options, 4) {
///     Ok(result) => render(&result),
///     Err(SearchError::InvalidPattern { pattern, .. }) => warn_user(&pattern),
///     Err(e) => show_error(e),
/// }
/// ```
use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, SearchError>;

/// Errors that can occur while compiling criteria, searching or benchmarking
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Match execution failed in chunk {chunk_index} at line {line_index}: {message}")]
    MatchExecution {
        chunk_index: usize,
        line_index: usize,
        message: String,
    },
    #[error(
        "Non-deterministic search: iteration {iteration} matched {found} of {found_lines} lines, \
         expected {expected} of {expected_lines}"
    )]
    NonDeterministic {
        iteration: usize,
        expected: usize,
        found: usize,
        expected_lines: usize,
        found_lines: usize,
    },
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid UTF-8 in file {path}: {source}")]
    EncodingError {
        path: PathBuf,
        source: std::str::Utf8Error,
    },
}

impl SearchError {
    pub fn invalid_pattern(pattern: impl Into<String>, source: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            source,
        }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn match_execution(chunk_index: usize, line_index: usize, msg: impl Into<String>) -> Self {
        Self::MatchExecution {
            chunk_index,
            line_index,
            message: msg.into(),
        }
    }

    /// `expected` and `found` are `(matched_lines, total_lines)` pairs
    pub fn non_deterministic(
        iteration: usize,
        expected: (usize, usize),
        found: (usize, usize),
    ) -> Self {
        Self::NonDeterministic {
            iteration,
            expected: expected.0,
            found: found.0,
            expected_lines: expected.1,
            found_lines: found.1,
        }
    }

    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn encoding_error(path: impl Into<PathBuf>, source: std::str::Utf8Error) -> Self {
        Self::EncodingError {
            path: path.into(),
            source,
        }
    }
}

impl From<config::ConfigError> for SearchError {
    fn from(err: config::ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}
