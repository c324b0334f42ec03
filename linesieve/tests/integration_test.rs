use anyhow::Result;
use linesieve::search::{split, FilterEngine};
use linesieve::{Criteria, EngineConfig, IncludeMode, SearchError, SearchOptions};
use std::num::NonZeroUsize;

/// 5000 lines; every 75th line carries ERROR or WARNING, every 40th otherwise carries DEBUG
fn create_test_log(lines: usize) -> String {
    (0..lines)
        .map(|i| {
            if i % 75 == 0 {
                if i % 150 == 0 {
                    format!("line {} - ERROR disk quota exceeded", i)
                } else {
                    format!("line {} - WARNING slow response", i)
                }
            } else if i % 40 == 0 {
                format!("line {} - DEBUG cache state dump", i)
            } else if i % 25 == 0 {
                format!("line {} - SUCCESS job finished", i)
            } else {
                format!("line {} - ordinary log message", i)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn keyword_criteria() -> Criteria {
    Criteria::keywords(["ERROR", "WARNING"], ["DEBUG"])
}

#[test]
fn test_scenario_error_warning_without_debug() -> Result<()> {
    let text = create_test_log(5000);
    let engine = FilterEngine::default();

    let result = engine.search(&text, &keyword_criteria(), &SearchOptions::default(), 4)?;
    assert_eq!(result.matched_line_count(), 67);
    assert_eq!(result.total_lines, 5000);
    assert!(result
        .matched_lines
        .iter()
        .all(|m| m.line_index % 75 == 0 && !m.text.contains("DEBUG")));
    Ok(())
}

#[test]
fn test_result_invariant_to_worker_count() -> Result<()> {
    let text = create_test_log(3001);
    let engine = FilterEngine::default();
    let criteria_sets = [
        keyword_criteria(),
        Criteria::keywords(Vec::<String>::new(), ["DEBUG", "ordinary"]),
        Criteria::keywords(["line", "5"], Vec::<String>::new()).with_include_mode(IncludeMode::All),
        Criteria::pattern(r"line \d*7 "),
    ];
    let option_sets = [
        SearchOptions::default(),
        SearchOptions {
            case_insensitive: false,
            whole_word: true,
            ..Default::default()
        },
    ];

    for criteria in &criteria_sets {
        for options in &option_sets {
            let baseline = engine.search(&text, criteria, options, 1)?;
            for workers in [2, 3, 4, 7, 16] {
                let result = engine.search(&text, criteria, options, workers)?;
                assert_eq!(
                    result.matched_lines, baseline.matched_lines,
                    "criteria {} with {} workers",
                    criteria, workers
                );
                assert_eq!(result.total_lines, baseline.total_lines);
            }
        }
    }
    Ok(())
}

#[test]
fn test_matches_sorted_and_unique() -> Result<()> {
    let text = create_test_log(2000);
    let engine = FilterEngine::default();

    let result = engine.search(
        &text,
        &Criteria::keywords(Vec::<String>::new(), ["ordinary"]),
        &SearchOptions::default(),
        8,
    )?;
    assert!(!result.matched_lines.is_empty());
    assert!(result
        .matched_lines
        .windows(2)
        .all(|w| w[0].line_index < w[1].line_index));
    Ok(())
}

#[test]
fn test_repeated_searches_identical() -> Result<()> {
    let text = create_test_log(4000);
    let engine = FilterEngine::default();
    let criteria = keyword_criteria();
    let options = SearchOptions::default();

    let first = engine.search(&text, &criteria, &options, 4)?;
    for _ in 0..5 {
        let again = engine.search(&text, &criteria, &options, 4)?;
        assert_eq!(again.matched_lines, first.matched_lines);
        assert_eq!(again.total_lines, first.total_lines);
        assert_eq!(again.matched_line_count(), first.matched_line_count());
    }
    Ok(())
}

#[test]
fn test_chunks_reconstruct_text() {
    let text = create_test_log(997);
    let expected: Vec<&str> = text.lines().collect();
    for workers in 1..=12 {
        let chunks = split(&text, workers);
        let mut starts = chunks.iter().map(|c| c.start_line_index).peekable();
        assert_eq!(starts.peek().copied(), Some(0));
        let rebuilt: Vec<&str> = chunks.iter().flat_map(|c| c.lines.iter().copied()).collect();
        assert_eq!(rebuilt, expected);
    }
}

#[test]
fn test_whole_word_scenario() -> Result<()> {
    let engine = FilterEngine::default();
    let options = SearchOptions {
        whole_word: true,
        ..Default::default()
    };
    let text = "ERROR: failed\nERR: failed\nthe ERR was logged\nERRATA";

    let result = engine.search(text, &Criteria::keywords(["ERR"], Vec::<String>::new()), &options, 2)?;
    assert_eq!(result.line_indices().collect::<Vec<_>>(), vec![1, 2]);
    Ok(())
}

#[test]
fn test_exclude_precedence() -> Result<()> {
    let engine = FilterEngine::default();
    let text = "ERROR only\nERROR and DEBUG\nDEBUG only\nnothing";

    let result = engine.search(text, &keyword_criteria(), &SearchOptions::default(), 3)?;
    assert_eq!(result.line_indices().collect::<Vec<_>>(), vec![0]);

    let match_all = Criteria::keywords(Vec::<String>::new(), ["DEBUG"]);
    let result = engine.search(text, &match_all, &SearchOptions::default(), 3)?;
    assert_eq!(result.line_indices().collect::<Vec<_>>(), vec![0, 3]);
    Ok(())
}

#[test]
fn test_invalid_regex_dispatches_nothing() {
    let engine = FilterEngine::default();
    let text = create_test_log(100);

    let err = engine
        .search(&text, &Criteria::pattern("(ERROR|WARNING"), &SearchOptions::default(), 4)
        .unwrap_err();
    assert!(matches!(err, SearchError::InvalidPattern { .. }));

    let stats = engine.metrics().snapshot();
    assert_eq!(stats.chunks_dispatched, 0);
    assert_eq!(stats.lines_scanned, 0);
    assert_eq!(engine.last_search_time(), std::time::Duration::ZERO);
}

#[test]
fn test_measure_performance() -> Result<()> {
    let text = create_test_log(5000);
    let config = EngineConfig {
        max_workers: NonZeroUsize::new(4).unwrap(),
        ..Default::default()
    };
    let engine = FilterEngine::new(config);

    let stats = engine.measure_performance(&text, &keyword_criteria(), &SearchOptions::default(), 3)?;
    assert_eq!(stats.iterations, 3);
    assert!(stats.min_time <= stats.average_time);
    assert!(stats.average_time <= stats.max_time);
    assert_eq!(stats.matched_line_count, 67);
    assert_eq!(stats.total_lines, 5000);
    assert!(stats.throughput() > 0.0);
    assert_eq!(engine.metrics().snapshot().searches, 3);
    Ok(())
}

#[test]
fn test_measure_performance_rejects_zero_iterations() {
    let engine = FilterEngine::default();
    let err = engine
        .measure_performance("a", &keyword_criteria(), &SearchOptions::default(), 0)
        .unwrap_err();
    assert!(matches!(err, SearchError::InvalidArgument(_)));
}

#[test]
fn test_engines_do_not_share_last_search_time() -> Result<()> {
    let first = FilterEngine::default();
    let second = FilterEngine::default();

    first.search(&create_test_log(500), &keyword_criteria(), &SearchOptions::default(), 2)?;
    assert!(first.last_search_time() > std::time::Duration::ZERO);
    assert_eq!(second.last_search_time(), std::time::Duration::ZERO);
    Ok(())
}
