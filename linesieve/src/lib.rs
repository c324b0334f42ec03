pub mod bench;
pub mod config;
pub mod criteria;
pub mod errors;
pub mod metrics;
pub mod results;
pub mod search;
pub mod timing;

pub use bench::PerformanceStats;
pub use config::EngineConfig;
pub use criteria::{Criteria, IncludeMode, KeywordCriteria, RegexCriteria, SearchOptions};
pub use errors::{EngineResult, SearchError};
pub use results::{MatchRecord, SearchResult};
pub use search::FilterEngine;
