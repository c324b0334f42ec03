use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use linesieve::bench::measure_performance_with;
use linesieve::config::CliOverrides;
use linesieve::{Criteria, EngineConfig, FilterEngine, IncludeMode, SearchError};
use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod input;
mod render;

use input::EncodingMode;

type Result<T> = std::result::Result<T, SearchError>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file layered over the default locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CriteriaArgs {
    /// Keyword a line must contain (can be specified multiple times)
    #[arg(short = 'i', long = "include")]
    include: Vec<String>,

    /// Keyword that rejects a line (can be specified multiple times)
    #[arg(short = 'x', long = "exclude")]
    exclude: Vec<String>,

    /// Require every include keyword instead of any
    #[arg(long)]
    all_includes: bool,

    /// Regular expression; replaces the keyword sets
    #[arg(short = 'r', long = "regex", conflicts_with_all = ["include", "exclude", "all_includes"])]
    regex: Option<String>,

    /// Match case exactly
    #[arg(short = 'c', long)]
    case_sensitive: bool,

    /// Match whole words only
    #[arg(short = 'w', long)]
    whole_word: bool,

    /// Number of worker threads
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// How to handle invalid UTF-8 sequences (failfast|lossy)
    #[arg(long, default_value = "failfast")]
    encoding: String,

    /// Input files; standard input when none are given
    files: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter lines of the input
    Search {
        #[command(flatten)]
        criteria: CriteriaArgs,

        /// Print only matched lines instead of the whole text
        #[arg(short = 'o', long)]
        only_matches: bool,

        /// Search every input file, not only the first
        #[arg(short = 'a', long)]
        all_tabs: bool,

        /// Show only statistics, not lines
        #[arg(short, long)]
        stats: bool,

        /// Print results as JSON
        #[arg(long, conflicts_with = "stats")]
        json: bool,

        /// Print a description of the filter logic before the results
        #[arg(long)]
        describe: bool,

        /// Stop after this many matches per document
        #[arg(short = 'm', long)]
        max_results: Option<usize>,
    },

    /// Time repeated searches of the first input
    Bench {
        #[command(flatten)]
        criteria: CriteriaArgs,

        /// Number of repetitions
        #[arg(short = 'n', long)]
        iterations: Option<usize>,
    },
}

struct Document {
    label: String,
    text: String,
}

fn main() -> Result<()> {
    run()
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let file_config = EngineConfig::load_from(cli.config.as_deref())?;

    match cli.command {
        Commands::Search {
            criteria,
            only_matches,
            all_tabs,
            stats,
            json,
            describe,
            max_results,
        } => {
            let config = file_config.merge_with_cli(CliOverrides {
                max_workers: criteria.threads,
                log_level: cli.log_level,
                case_insensitive: criteria.case_sensitive.then_some(false),
                whole_word: criteria.whole_word,
                show_only_matches: only_matches,
                all_tabs,
                ..Default::default()
            });
            init_logging(&config.log_level);

            let documents = load_documents(&criteria)?;
            let search_criteria = build_criteria(&criteria);
            let options = config.options;
            let engine = FilterEngine::new(config);

            let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
            let workers = match criteria.threads {
                Some(threads) => threads.get(),
                None => {
                    let largest = texts.iter().map(|t| t.lines().count()).max().unwrap_or(0);
                    engine.recommended_workers(largest)
                }
            };
            debug!("Searching with {} workers", workers);
            let mut results = match max_results {
                Some(limit) => {
                    engine.preview_documents(&texts, &search_criteria, &options, workers, limit)?
                }
                None => engine.search_documents(&texts, &search_criteria, &options, workers)?,
            };
            let matcher = engine.compile(&search_criteria, &options)?;

            let apply_start = Instant::now();
            let stdout = io::stdout();
            let mut out = stdout.lock();
            if describe {
                writeln!(out, "{}", search_criteria.describe(&options))?;
            }
            if json {
                let reports: Vec<_> = documents
                    .iter()
                    .zip(results.iter())
                    .map(|(doc, result)| render::DocumentReport {
                        document: &doc.label,
                        criteria: search_criteria.to_string(),
                        result,
                    })
                    .collect();
                let encoded = serde_json::to_string_pretty(&reports)
                    .map_err(|e| SearchError::config_error(format!("JSON encoding failed: {}", e)))?;
                writeln!(out, "{}", encoded)?;
            } else if !stats {
                let labelled = results.len() > 1;
                for (doc, result) in documents.iter().zip(results.iter()) {
                    let label = labelled.then_some(doc.label.as_str());
                    if options.show_only_matches {
                        render::print_matches(&mut out, result, &matcher, label)?;
                    } else {
                        render::print_full_text(&mut out, &doc.text, result, &matcher, label)?;
                    }
                }
            }
            if !json {
                render::print_summary(&mut out, &results)?;
                if let Some(limit) = max_results {
                    if results.iter().any(|r| r.matched_line_count() >= limit) {
                        writeln!(out, "Showing at most the first {} matches per document", limit)?;
                    }
                }
            }
            out.flush()?;

            let apply_time = apply_start.elapsed();
            engine.record_apply_time(apply_time);
            if let Some(last) = results.last_mut() {
                last.set_apply_time(apply_time);
                debug!(
                    "Apply took {:?}, total {:?}",
                    apply_time,
                    last.total_time()
                );
            }
            engine.metrics().log_stats();
            Ok(())
        }
        Commands::Bench {
            criteria,
            iterations,
        } => {
            let config = file_config.merge_with_cli(CliOverrides {
                max_workers: criteria.threads,
                log_level: cli.log_level,
                benchmark_iterations: iterations,
                case_insensitive: criteria.case_sensitive.then_some(false),
                whole_word: criteria.whole_word,
                ..Default::default()
            });
            init_logging(&config.log_level);

            let documents = load_documents(&criteria)?;
            let text = documents
                .first()
                .map(|d| d.text.as_str())
                .unwrap_or_default();
            let search_criteria = build_criteria(&criteria);
            let options = config.options;
            let iterations = config.benchmark_iterations;
            let engine = FilterEngine::new(config);

            let progress = ProgressBar::new(iterations as u64);
            progress.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );

            let stats = measure_performance_with(
                &engine,
                text,
                &search_criteria,
                &options,
                iterations,
                |_, elapsed| {
                    progress.set_message(render::format_duration(elapsed));
                    progress.inc(1);
                },
            );
            progress.finish_and_clear();

            let stats = stats?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            render::print_benchmark(&mut out, &stats)?;
            Ok(())
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn build_criteria(args: &CriteriaArgs) -> Criteria {
    match &args.regex {
        Some(pattern) => Criteria::pattern(pattern.clone()),
        None => {
            let mode = if args.all_includes {
                IncludeMode::All
            } else {
                IncludeMode::Any
            };
            Criteria::keywords(args.include.iter().cloned(), args.exclude.iter().cloned())
                .with_include_mode(mode)
        }
    }
}

fn load_documents(args: &CriteriaArgs) -> Result<Vec<Document>> {
    let encoding = EncodingMode::parse(&args.encoding);
    if args.files.is_empty() {
        return Ok(vec![Document {
            label: "<stdin>".to_string(),
            text: input::read_stdin(encoding)?,
        }]);
    }

    args.files
        .iter()
        .map(|path| -> Result<Document> {
            Ok(Document {
                label: path.display().to_string(),
                text: input::read_document(path, encoding)?,
            })
        })
        .collect()
}
