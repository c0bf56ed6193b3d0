//! Detection of search endpoints that ignore their filter.
//!
//! The techniques and whitelist listings accept a `search` parameter. A
//! backend that drops it returns the unfiltered list, which is easy to miss
//! when only the status code is checked.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchVerdict {
    /// Every returned name contains the term.
    AllMatch,
    /// Nothing matches but results came back anyway.
    IgnoredFilter,
    /// Some names match, some do not.
    Mixed,
    /// No results.
    Empty,
}

impl SearchVerdict {
    pub fn is_bug(&self) -> bool {
        matches!(self, SearchVerdict::IgnoredFilter | SearchVerdict::Mixed)
    }
}

impl fmt::Display for SearchVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SearchVerdict::AllMatch => "all results match",
            SearchVerdict::IgnoredFilter => "filter ignored",
            SearchVerdict::Mixed => "mixed results",
            SearchVerdict::Empty => "no results",
        };
        f.write_str(label)
    }
}

pub fn count_matches<S: AsRef<str>>(term: &str, names: &[S]) -> usize {
    let needle = term.to_lowercase();
    names
        .iter()
        .filter(|name| name.as_ref().to_lowercase().contains(&needle))
        .count()
}

pub fn classify_search<S: AsRef<str>>(term: &str, names: &[S]) -> SearchVerdict {
    if names.is_empty() {
        return SearchVerdict::Empty;
    }
    match count_matches(term, names) {
        0 => SearchVerdict::IgnoredFilter,
        n if n == names.len() => SearchVerdict::AllMatch,
        _ => SearchVerdict::Mixed,
    }
}

/// One search compared against the unfiltered listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchAttempt {
    pub term: String,
    pub expected: usize,
    pub actual: usize,
    pub matching: usize,
    pub verdict: SearchVerdict,
    pub same_as_baseline: bool,
}

impl SearchAttempt {
    pub fn new<S: AsRef<str>>(term: &str, expected: usize, names: &[S], baseline: usize) -> Self {
        let actual = names.len();
        Self {
            term: term.to_string(),
            expected,
            actual,
            matching: count_matches(term, names),
            verdict: classify_search(term, names),
            same_as_baseline: baseline > 0 && actual == baseline,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchBugReport {
    pub baseline_total: usize,
    pub attempts: Vec<SearchAttempt>,
}

impl SearchBugReport {
    pub fn new(baseline_total: usize) -> Self {
        Self {
            baseline_total,
            attempts: Vec::new(),
        }
    }

    pub fn record<S: AsRef<str>>(&mut self, term: &str, expected: usize, names: &[S]) {
        let attempt = SearchAttempt::new(term, expected, names, self.baseline_total);
        self.attempts.push(attempt);
    }

    /// The filter is ignored when any search returns the whole baseline.
    pub fn bug_confirmed(&self) -> bool {
        self.attempts.iter().any(|p| p.same_as_baseline)
    }
}

impl fmt::Display for SearchBugReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Baseline (no search): {} techniques", self.baseline_total)?;
        for attempt in &self.attempts {
            writeln!(
                f,
                "  search '{}': expected {}, got {} ({} matching, {}){}",
                attempt.term,
                attempt.expected,
                attempt.actual,
                attempt.matching,
                attempt.verdict,
                if attempt.same_as_baseline {
                    " SAME AS BASELINE"
                } else {
                    ""
                }
            )?;
        }
        if self.bug_confirmed() {
            write!(f, "BUG CONFIRMED: search parameter is ignored")
        } else {
            write!(f, "Search filter behaves as expected")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_search() {
        assert_eq!(classify_search::<&str>("single", &[]), SearchVerdict::Empty);
        assert_eq!(
            classify_search("single", &["Single Weave", "SINGLE knot"]),
            SearchVerdict::AllMatch
        );
        assert_eq!(
            classify_search("single", &["Pottery", "Weaving"]),
            SearchVerdict::IgnoredFilter
        );
        assert_eq!(
            classify_search("single", &["Single", "Weaving"]),
            SearchVerdict::Mixed
        );
        assert!(SearchVerdict::Mixed.is_bug());
        assert!(!SearchVerdict::Empty.is_bug());
    }

    #[test]
    fn test_report_flags_baseline_match() {
        let all = ["Pottery", "Weaving", "Test One"];
        let mut report = SearchBugReport::new(all.len());
        report.record("Test", 1, &["Test One"]);
        assert!(!report.bug_confirmed());

        report.record("NONEXISTENT_XYZ", 0, &all);
        assert!(report.bug_confirmed());
        let attempt = &report.attempts[1];
        assert_eq!(attempt.verdict, SearchVerdict::IgnoredFilter);
        assert!(report.to_string().contains("BUG CONFIRMED"));
    }

    #[test]
    fn test_empty_baseline_never_matches() {
        let mut report = SearchBugReport::new(0);
        report.record::<&str>("Single", 1, &[]);
        assert!(!report.bug_confirmed());
    }
}
