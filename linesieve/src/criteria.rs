use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Per-search options. Immutable for the duration of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Only matched lines are shown by the caller. Never changes which lines match.
    pub show_only_matches: bool,
    /// Compare keywords and patterns without regard to case
    pub case_insensitive: bool,
    /// A hit must be bounded by non-alphanumeric characters or the string edges
    pub whole_word: bool,
    /// Search every open document rather than only the active one
    pub all_tabs: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            show_only_matches: false,
            case_insensitive: true,
            whole_word: false,
            all_tabs: false,
        }
    }
}

/// How the include keyword set is combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeMode {
    /// At least one include keyword must be present
    #[default]
    Any,
    /// Every include keyword must be present
    All,
}

/// Literal keyword filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeywordCriteria {
    /// Empty means every line is a candidate
    #[serde(default)]
    pub include: BTreeSet<String>,
    /// A line containing any of these is rejected, whatever it includes
    #[serde(default)]
    pub exclude: BTreeSet<String>,
    #[serde(default)]
    pub include_mode: IncludeMode,
}

/// Regular expression filter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegexCriteria {
    pub pattern: String,
}

/// What a line has to satisfy to be returned.
///
/// Keyword and regex modes are mutually exclusive; the variant is dispatched
/// once when the matcher is compiled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Criteria {
    Keywords(KeywordCriteria),
    Pattern(RegexCriteria),
}

impl Criteria {
    /// Keyword criteria with the default (any) include mode
    pub fn keywords<I, E, S, T>(include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Criteria::Keywords(KeywordCriteria {
            include: include.into_iter().map(Into::into).collect(),
            exclude: exclude.into_iter().map(Into::into).collect(),
            include_mode: IncludeMode::Any,
        })
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        Criteria::Pattern(RegexCriteria {
            pattern: pattern.into(),
        })
    }

    /// Switches keyword criteria to the given include mode. No effect on regex criteria.
    pub fn with_include_mode(mut self, mode: IncludeMode) -> Self {
        if let Criteria::Keywords(ref mut keywords) = self {
            keywords.include_mode = mode;
        }
        self
    }

    /// Returns true if no keyword and no pattern is set
    pub fn is_empty(&self) -> bool {
        match self {
            Criteria::Keywords(k) => {
                k.include.iter().all(String::is_empty) && k.exclude.iter().all(String::is_empty)
            }
            Criteria::Pattern(r) => r.pattern.is_empty(),
        }
    }

    /// Human-readable description of the filter logic, suitable for a criteria
    /// export next to the matched lines.
    pub fn describe(&self, options: &SearchOptions) -> String {
        let mut out = String::new();
        match self {
            Criteria::Keywords(k) => {
                let joiner = match k.include_mode {
                    IncludeMode::Any => " OR ",
                    IncludeMode::All => " AND ",
                };
                let include: Vec<_> = k
                    .include
                    .iter()
                    .filter(|s| !s.is_empty())
                    .map(|s| format!("\"{}\"", s))
                    .collect();
                let exclude: Vec<_> = k
                    .exclude
                    .iter()
                    .filter(|s| !s.is_empty())
                    .map(|s| format!("\"{}\"", s))
                    .collect();
                if include.is_empty() {
                    out.push_str("include: <all lines>");
                } else {
                    out.push_str(&format!("include: {}", include.join(joiner)));
                }
                if !exclude.is_empty() {
                    out.push_str(&format!("\nexclude: {}", exclude.join(" OR ")));
                }
            }
            Criteria::Pattern(r) => out.push_str(&format!("pattern: /{}/", r.pattern)),
        }
        out.push_str(&format!(
            "\noptions: case_insensitive={} whole_word={} show_only_matches={} all_tabs={}",
            options.case_insensitive,
            options.whole_word,
            options.show_only_matches,
            options.all_tabs
        ));
        out
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criteria::Keywords(k) => write!(
                f,
                "include {:?} exclude {:?} ({:?})",
                k.include, k.exclude, k.include_mode
            ),
            Criteria::Pattern(r) => write!(f, "/{}/", r.pattern),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = SearchOptions::default();
        assert!(options.case_insensitive);
        assert!(!options.whole_word);
        assert!(!options.show_only_matches);
        assert!(!options.all_tabs);
    }

    #[test]
    fn test_options_deserialize_missing_fields() {
        let options: SearchOptions = serde_json::from_str(r#"{"whole_word": true}"#).unwrap();
        assert!(options.whole_word);
        assert!(options.case_insensitive);
    }

    #[test]
    fn test_is_empty() {
        assert!(Criteria::keywords(Vec::<String>::new(), Vec::<String>::new()).is_empty());
        assert!(Criteria::keywords([""], [""]).is_empty());
        assert!(!Criteria::keywords(Vec::<String>::new(), ["DEBUG"]).is_empty());
        assert!(Criteria::pattern("").is_empty());
        assert!(!Criteria::pattern(r"\d+").is_empty());
    }

    #[test]
    fn test_include_mode_only_touches_keywords() {
        let criteria = Criteria::keywords(["a", "b"], Vec::<String>::new())
            .with_include_mode(IncludeMode::All);
        match criteria {
            Criteria::Keywords(k) => assert_eq!(k.include_mode, IncludeMode::All),
            Criteria::Pattern(_) => panic!("expected keyword criteria"),
        }

        let criteria = Criteria::pattern("x").with_include_mode(IncludeMode::All);
        assert_eq!(criteria, Criteria::pattern("x"));
    }

    #[test]
    fn test_describe_keywords() {
        let criteria = Criteria::keywords(["ERROR", "WARNING"], ["DEBUG"]);
        let text = criteria.describe(&SearchOptions::default());
        assert!(text.contains(r#"include: "ERROR" OR "WARNING""#));
        assert!(text.contains(r#"exclude: "DEBUG""#));
        assert!(text.contains("case_insensitive=true"));
    }

    #[test]
    fn test_describe_match_all() {
        let criteria = Criteria::keywords(Vec::<String>::new(), ["DEBUG"]);
        let text = criteria.describe(&SearchOptions::default());
        assert!(text.starts_with("include: <all lines>"));
    }

    #[test]
    fn test_criteria_serde_tagging() {
        let json = r#"{"mode": "pattern", "pattern": "ERR(OR)?"}"#;
        let criteria: Criteria = serde_json::from_str(json).unwrap();
        assert_eq!(criteria, Criteria::pattern("ERR(OR)?"));

        let json = r#"{"mode": "keywords", "include": ["ERROR"], "include_mode": "all"}"#;
        let criteria: Criteria = serde_json::from_str(json).unwrap();
        match criteria {
            Criteria::Keywords(k) => {
                assert!(k.include.contains("ERROR"));
                assert!(k.exclude.is_empty());
                assert_eq!(k.include_mode, IncludeMode::All);
            }
            Criteria::Pattern(_) => panic!("expected keyword criteria"),
        }
    }
}
