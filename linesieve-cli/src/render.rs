use colored::Colorize;
use linesieve::search::Matcher;
use linesieve::{PerformanceStats, SearchResult};
use serde::Serialize;
use std::io::{self, Write};
use std::time::Duration;

/// Wraps the given byte ranges of `line` in highlight colors.
///
/// Overlapping ranges are merged; ranges must lie on char boundaries, which
/// holds for regex match offsets.
pub fn highlight(line: &str, ranges: &[(usize, usize)]) -> String {
    let mut out = String::with_capacity(line.len() + ranges.len() * 16);
    let mut cursor = 0;
    for &(start, end) in ranges {
        let start = start.max(cursor);
        if start >= end {
            continue;
        }
        out.push_str(&line[cursor..start]);
        out.push_str(&line[start..end].red().bold().to_string());
        cursor = end;
    }
    out.push_str(&line[cursor..]);
    out
}

/// Prints only the matched lines, numbered from 1
pub fn print_matches(
    out: &mut impl Write,
    result: &SearchResult,
    matcher: &Matcher,
    label: Option<&str>,
) -> io::Result<()> {
    if let Some(label) = label {
        writeln!(out, "\n{}", label.blue())?;
    }
    for record in &result.matched_lines {
        let ranges = matcher.highlight_ranges(&record.text);
        writeln!(
            out,
            "{}: {}",
            (record.line_index + 1).to_string().green(),
            highlight(&record.text, &ranges)
        )?;
    }
    Ok(())
}

/// Prints every line of `text`, marking and highlighting the matched ones
pub fn print_full_text(
    out: &mut impl Write,
    text: &str,
    result: &SearchResult,
    matcher: &Matcher,
    label: Option<&str>,
) -> io::Result<()> {
    if let Some(label) = label {
        writeln!(out, "\n{}", label.blue())?;
    }
    let mut matched = result.line_indices().peekable();
    for (index, line) in text.lines().enumerate() {
        if matched.peek() == Some(&index) {
            matched.next();
            let ranges = matcher.highlight_ranges(line);
            writeln!(
                out,
                "{}{} {}",
                (index + 1).to_string().green(),
                ">".yellow(),
                highlight(line, &ranges)
            )?;
        } else {
            writeln!(out, "{}: {}", (index + 1).to_string().dimmed(), line)?;
        }
    }
    Ok(())
}

pub fn format_duration(duration: Duration) -> String {
    // Microsecond resolution keeps humantime output short
    let micros = Duration::from_micros(u64::try_from(duration.as_micros()).unwrap_or(u64::MAX));
    if micros.is_zero() {
        return "0us".to_string();
    }
    humantime::format_duration(micros).to_string()
}

pub fn print_summary(out: &mut impl Write, results: &[SearchResult]) -> io::Result<()> {
    let matched: usize = results.iter().map(SearchResult::matched_line_count).sum();
    let total: usize = results.iter().map(|r| r.total_lines).sum();
    let search_time: Duration = results.iter().map(|r| r.search_time).sum();
    writeln!(
        out,
        "\nMatched {} of {} lines in {} document(s), search took {}",
        matched,
        total,
        results.len(),
        format_duration(search_time)
    )
}

pub fn print_benchmark(out: &mut impl Write, stats: &PerformanceStats) -> io::Result<()> {
    writeln!(out, "Iterations:    {}", stats.iterations)?;
    writeln!(out, "Total lines:   {}", stats.total_lines)?;
    writeln!(out, "Matched lines: {}", stats.matched_line_count)?;
    writeln!(out, "Average time:  {}", format_duration(stats.average_time))?;
    writeln!(out, "Min time:      {}", format_duration(stats.min_time))?;
    writeln!(out, "Max time:      {}", format_duration(stats.max_time))?;
    writeln!(out, "Throughput:    {:.0} lines/s", stats.throughput())
}

/// JSON shape of one searched document
#[derive(Serialize)]
pub struct DocumentReport<'a> {
    pub document: &'a str,
    pub criteria: String,
    #[serde(flatten)]
    pub result: &'a SearchResult,
}
