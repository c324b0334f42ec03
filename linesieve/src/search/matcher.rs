use regex::{Regex, RegexBuilder};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;

use crate::criteria::{Criteria, IncludeMode, SearchOptions};
use crate::errors::{EngineResult, SearchError};

/// A boolean test applied to a single line.
///
/// The worker pool only sees this trait, so callers can run their own
/// predicates through the same chunked pipeline. An `Err` from any line
/// aborts the whole search.
pub trait LinePredicate: Sync {
    fn test(&self, line: &str) -> EngineResult<bool>;
}

impl<F> LinePredicate for F
where
    F: Fn(&str) -> EngineResult<bool> + Sync,
{
    fn test(&self, line: &str) -> EngineResult<bool> {
        self(line)
    }
}

/// Strategy selected once at compile time
#[derive(Debug, Clone)]
pub enum MatchStrategy {
    Keywords {
        include: Vec<String>,
        exclude: Vec<String>,
        mode: IncludeMode,
    },
    Regex(Arc<Regex>),
}

/// Compiled criteria and options
#[derive(Debug, Clone)]
pub struct Matcher {
    strategy: MatchStrategy,
    highlighter: Option<Arc<Regex>>,
    case_insensitive: bool,
    whole_word: bool,
}

impl Matcher {
    /// Compiles criteria into a predicate.
    ///
    /// Keywords are case-folded here, once, when `case_insensitive` is set.
    /// A malformed regex fails with [`SearchError::InvalidPattern`].
    pub fn compile(criteria: &Criteria, options: &SearchOptions) -> EngineResult<Self> {
        let strategy = match criteria {
            Criteria::Keywords(keywords) => {
                let normalize = |set: &std::collections::BTreeSet<String>| -> Vec<String> {
                    set.iter()
                        .filter(|k| !k.is_empty())
                        .map(|k| {
                            if options.case_insensitive {
                                k.to_lowercase()
                            } else {
                                k.clone()
                            }
                        })
                        .collect()
                };
                MatchStrategy::Keywords {
                    include: normalize(&keywords.include),
                    exclude: normalize(&keywords.exclude),
                    mode: keywords.include_mode,
                }
            }
            Criteria::Pattern(regex) => {
                let compiled = RegexBuilder::new(&regex.pattern)
                    .case_insensitive(options.case_insensitive)
                    .build()
                    .map_err(|e| SearchError::invalid_pattern(&regex.pattern, e))?;
                MatchStrategy::Regex(Arc::new(compiled))
            }
        };

        debug!(
            "Compiled {} matcher (case_insensitive={}, whole_word={})",
            match strategy {
                MatchStrategy::Keywords { .. } => "keyword",
                MatchStrategy::Regex(_) => "regex",
            },
            options.case_insensitive,
            options.whole_word
        );

        let highlighter = match &strategy {
            MatchStrategy::Keywords { include, .. } if !include.is_empty() => {
                let alternation = include
                    .iter()
                    .map(|k| regex::escape(k))
                    .collect::<Vec<_>>()
                    .join("|");
                RegexBuilder::new(&alternation)
                    .case_insensitive(options.case_insensitive)
                    .build()
                    .ok()
                    .map(Arc::new)
            }
            MatchStrategy::Keywords { .. } => None,
            MatchStrategy::Regex(regex) => Some(Arc::clone(regex)),
        };

        Ok(Self {
            strategy,
            highlighter,
            case_insensitive: options.case_insensitive,
            whole_word: options.whole_word,
        })
    }

    pub fn strategy(&self) -> &MatchStrategy {
        &self.strategy
    }

    /// Returns true if the line satisfies the compiled criteria
    pub fn is_match(&self, line: &str) -> bool {
        match &self.strategy {
            MatchStrategy::Keywords {
                include,
                exclude,
                mode,
            } => {
                let haystack = self.normalize(line);
                if exclude.iter().any(|k| self.contains(&haystack, k)) {
                    return false;
                }
                if include.is_empty() {
                    return true;
                }
                match mode {
                    IncludeMode::Any => include.iter().any(|k| self.contains(&haystack, k)),
                    IncludeMode::All => include.iter().all(|k| self.contains(&haystack, k)),
                }
            }
            MatchStrategy::Regex(regex) => {
                if self.whole_word {
                    bounded_regex_hit(regex, line, 0).is_some()
                } else {
                    regex.is_match(line)
                }
            }
        }
    }

    /// Byte ranges of the include (or regex) hits in the original line, sorted by start.
    ///
    /// Exclude keywords are never highlighted. Lines the matcher rejects can
    /// still report ranges; callers decide whether to use them.
    pub fn highlight_ranges(&self, line: &str) -> Vec<(usize, usize)> {
        // Searched on the original line: lowercasing can shift byte offsets.
        let Some(regex) = &self.highlighter else {
            return Vec::new();
        };
        if !self.whole_word {
            return regex
                .find_iter(line)
                .filter(|m| !m.is_empty())
                .map(|m| (m.start(), m.end()))
                .collect();
        }

        let mut ranges = Vec::new();
        let mut pos = 0;
        while let Some((start, end)) = bounded_regex_hit(regex, line, pos) {
            if start < end {
                ranges.push((start, end));
                pos = end;
            } else {
                match next_char_boundary(line, start) {
                    Some(next) => pos = next,
                    None => break,
                }
            }
        }
        ranges
    }

    fn normalize<'a>(&self, line: &'a str) -> Cow<'a, str> {
        if self.case_insensitive {
            Cow::Owned(line.to_lowercase())
        } else {
            Cow::Borrowed(line)
        }
    }

    fn contains(&self, haystack: &str, keyword: &str) -> bool {
        if !self.whole_word {
            return haystack.contains(keyword);
        }

        // Restart one char past each rejected hit so overlapping occurrences are seen
        let mut pos = 0;
        while let Some(offset) = haystack[pos..].find(keyword) {
            let start = pos + offset;
            if is_word_bounded(haystack, start, start + keyword.len()) {
                return true;
            }
            match next_char_boundary(haystack, start) {
                Some(next) => pos = next,
                None => return false,
            }
        }
        false
    }
}

impl LinePredicate for Matcher {
    fn test(&self, line: &str) -> EngineResult<bool> {
        Ok(self.is_match(line))
    }
}

/// First word-bounded regex hit starting at or after `from`.
///
/// `find_iter` skips hits that overlap a rejected one, so each retry starts
/// one char past the previous hit's start instead.
fn bounded_regex_hit(regex: &Regex, line: &str, from: usize) -> Option<(usize, usize)> {
    let mut pos = from;
    while pos <= line.len() {
        let m = regex.find_at(line, pos)?;
        if is_word_bounded(line, m.start(), m.end()) {
            return Some((m.start(), m.end()));
        }
        pos = next_char_boundary(line, m.start())?;
    }
    None
}

/// Byte offset of the char after the one at `index`, or `None` at the end
fn next_char_boundary(text: &str, index: usize) -> Option<usize> {
    text[index..].chars().next().map(|c| index + c.len_utf8())
}

/// True if `text[start..end]` is not glued to an alphanumeric character on either side
fn is_word_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::Criteria;

    fn keywords(include: &[&str], exclude: &[&str]) -> Criteria {
        Criteria::keywords(include.iter().copied(), exclude.iter().copied())
    }

    fn options(case_insensitive: bool, whole_word: bool) -> SearchOptions {
        SearchOptions {
            case_insensitive,
            whole_word,
            ..Default::default()
        }
    }

    #[test]
    fn test_keyword_include_any() {
        let matcher = Matcher::compile(&keywords(&["ERROR", "WARNING"], &[]), &options(false, false))
            .unwrap();
        assert!(matcher.is_match("2024-01-01 ERROR db down"));
        assert!(matcher.is_match("WARNING: slow"));
        assert!(!matcher.is_match("INFO all good"));
    }

    #[test]
    fn test_keyword_include_all() {
        let criteria = keywords(&["ERROR", "db"], &[]).with_include_mode(IncludeMode::All);
        let matcher = Matcher::compile(&criteria, &options(false, false)).unwrap();
        assert!(matcher.is_match("ERROR db down"));
        assert!(!matcher.is_match("ERROR cache down"));
    }

    #[test]
    fn test_exclude_takes_precedence() {
        let matcher =
            Matcher::compile(&keywords(&["ERROR"], &["DEBUG"]), &options(false, false)).unwrap();
        assert!(matcher.is_match("ERROR failed"));
        assert!(!matcher.is_match("ERROR DEBUG failed"));
    }

    #[test]
    fn test_empty_include_matches_all_but_excluded() {
        let matcher = Matcher::compile(&keywords(&[], &["DEBUG"]), &options(true, false)).unwrap();
        assert!(matcher.is_match("anything at all"));
        assert!(matcher.is_match(""));
        assert!(!matcher.is_match("a debug line"));
    }

    #[test]
    fn test_case_insensitive_keywords() {
        let matcher = Matcher::compile(&keywords(&["Error"], &[]), &options(true, false)).unwrap();
        assert!(matcher.is_match("ERROR"));
        assert!(matcher.is_match("error"));

        let matcher = Matcher::compile(&keywords(&["Error"], &[]), &options(false, false)).unwrap();
        assert!(!matcher.is_match("ERROR"));
        assert!(matcher.is_match("Error"));
    }

    #[test]
    fn test_whole_word() {
        let matcher = Matcher::compile(&keywords(&["ERR"], &[]), &options(false, true)).unwrap();
        assert!(!matcher.is_match("ERROR: failed"));
        assert!(matcher.is_match("ERR: failed"));
        assert!(matcher.is_match("failed with ERR"));
        assert!(matcher.is_match("(ERR)"));
        assert!(matcher.is_match("x_ERR_y"));
        assert!(!matcher.is_match("xERR"));
    }

    #[test]
    fn test_whole_word_later_occurrence() {
        let matcher = Matcher::compile(&keywords(&["ERR"], &[]), &options(false, true)).unwrap();
        assert!(matcher.is_match("ERROR then ERR again"));
    }

    #[test]
    fn test_whole_word_overlapping_occurrence() {
        let matcher = Matcher::compile(&keywords(&["a a"], &[]), &options(false, true)).unwrap();
        assert!(matcher.is_match("ba a a"));

        let matcher = Matcher::compile(&Criteria::pattern("a a"), &options(false, true)).unwrap();
        assert!(matcher.is_match("ba a a"));
        assert_eq!(matcher.highlight_ranges("ba a a"), vec![(3, 6)]);
    }

    #[test]
    fn test_whole_word_exclude_overlapping_occurrence() {
        let matcher =
            Matcher::compile(&keywords(&["x"], &["x-x"]), &options(false, true)).unwrap();
        assert!(!matcher.is_match("yx-x-x"));
        assert!(matcher.is_match("yx-x"));
    }

    #[test]
    fn test_whole_word_multibyte_neighbours() {
        let matcher = Matcher::compile(&keywords(&["é"], &[]), &options(false, true)).unwrap();
        assert!(!matcher.is_match("café"));
        assert!(matcher.is_match("éé é"));
    }

    #[test]
    fn test_regex_mode() {
        let matcher =
            Matcher::compile(&Criteria::pattern(r"code=\d{3}"), &options(false, false)).unwrap();
        assert!(matcher.is_match("failed code=500"));
        assert!(!matcher.is_match("failed code=5"));
    }

    #[test]
    fn test_regex_case_and_whole_word() {
        let matcher = Matcher::compile(&Criteria::pattern("err"), &options(true, true)).unwrap();
        assert!(matcher.is_match("ERR: x"));
        assert!(!matcher.is_match("ERROR: x"));
    }

    #[test]
    fn test_invalid_regex() {
        let err = Matcher::compile(&Criteria::pattern("(unbalanced"), &options(true, false))
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidPattern { .. }));
    }

    #[test]
    fn test_highlight_ranges() {
        let matcher =
            Matcher::compile(&keywords(&["error", "warn"], &[]), &options(true, false)).unwrap();
        let line = "WARN then ERROR";
        let ranges = matcher.highlight_ranges(line);
        assert_eq!(ranges, vec![(0, 4), (10, 15)]);
        assert_eq!(&line[ranges[1].0..ranges[1].1], "ERROR");
    }

    #[test]
    fn test_highlight_ranges_regex_whole_word() {
        let matcher = Matcher::compile(&Criteria::pattern("ERR"), &options(false, true)).unwrap();
        assert_eq!(matcher.highlight_ranges("ERROR ERR"), vec![(6, 9)]);
    }

    #[test]
    fn test_closure_predicate() {
        let predicate = |line: &str| -> EngineResult<bool> { Ok(line.len() > 3) };
        assert!(predicate.test("long").unwrap());
        assert!(!predicate.test("no").unwrap());
    }
}
