use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::criteria::SearchOptions;

/// Engine configuration.
///
/// # Configuration Locations
///
/// Loaded from these locations, later ones overriding earlier ones:
/// 1. Global `$HOME/.config/linesieve/config.yaml`
/// 2. Local `.linesieve.yaml` in the current directory
/// 3. Custom config file specified via `--config` flag
///
/// # Configuration Format
///
/// ```yaml
/// # Worker threads per search (default: 4, capped at the CPU count)
/// max_workers: 4
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "info"
///
/// # Repetitions for `bench` when -n is not given
/// benchmark_iterations: 5
///
/// # Default search options
/// options:
///   case_insensitive: true
///   whole_word: false
///   show_only_matches: true
/// ```
///
/// Command-line arguments take precedence over file values; see
/// [`EngineConfig::merge_with_cli`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of worker threads used when the caller does not pick one
    #[serde(default = "default_max_workers")]
    pub max_workers: NonZeroUsize,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Default search options
    #[serde(default)]
    pub options: SearchOptions,

    /// Default number of benchmark repetitions
    #[serde(default = "default_benchmark_iterations")]
    pub benchmark_iterations: usize,
}

pub(crate) const DEFAULT_MAX_WORKERS: usize = 4;

fn default_max_workers() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_MAX_WORKERS.min(num_cpus::get())).unwrap_or(NonZeroUsize::MIN)
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_benchmark_iterations() -> usize {
    3
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            log_level: default_log_level(),
            options: SearchOptions::default(),
            benchmark_iterations: default_benchmark_iterations(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration, layering a specific file over the default locations
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            dirs::config_dir().map(|p| p.join("linesieve/config.yaml")),
            Some(PathBuf::from(".linesieve.yaml")),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicit file must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder.build()?.try_deserialize()
    }

    /// Merges CLI overrides into file values
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if let Some(workers) = cli.max_workers {
            self.max_workers = workers;
        }
        if let Some(level) = cli.log_level {
            self.log_level = level;
        }
        if let Some(iterations) = cli.benchmark_iterations {
            self.benchmark_iterations = iterations;
        }
        if let Some(case_insensitive) = cli.case_insensitive {
            self.options.case_insensitive = case_insensitive;
        }
        if cli.whole_word {
            self.options.whole_word = true;
        }
        if cli.show_only_matches {
            self.options.show_only_matches = true;
        }
        if cli.all_tabs {
            self.options.all_tabs = true;
        }
        self
    }
}

/// Values given on the command line. `None`/`false` leaves the file value alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub max_workers: Option<NonZeroUsize>,
    pub log_level: Option<String>,
    pub benchmark_iterations: Option<usize>,
    pub case_insensitive: Option<bool>,
    pub whole_word: bool,
    pub show_only_matches: bool,
    pub all_tabs: bool,
}
