//! Per-case and per-suite results, printable and serialisable.

use crate::outcome::{CaseMetrics, CaseOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseReport {
    pub id: String,
    pub description: String,
    pub outcome: CaseOutcome,
    pub metrics: CaseMetrics,
}

impl CaseReport {
    pub fn new(id: impl Into<String>, description: impl Into<String>, outcome: CaseOutcome, metrics: CaseMetrics) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            outcome,
            metrics,
        }
    }
}

impl fmt::Display for CaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} - {} ({})",
            self.id, self.description, self.outcome, self.metrics
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub suite: String,
    pub started_at: DateTime<Utc>,
    pub cases: Vec<CaseReport>,
}

impl SuiteReport {
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            started_at: Utc::now(),
            cases: Vec::new(),
        }
    }

    pub fn push(&mut self, report: CaseReport) {
        self.cases.push(report);
    }

    fn count(&self, predicate: impl Fn(&CaseOutcome) -> bool) -> usize {
        self.cases.iter().filter(|c| predicate(&c.outcome)).count()
    }

    pub fn total(&self) -> usize {
        self.cases.len()
    }

    pub fn passed(&self) -> usize {
        self.count(CaseOutcome::is_pass)
    }

    pub fn warned(&self) -> usize {
        self.count(CaseOutcome::is_warning)
    }

    pub fn failed(&self) -> usize {
        self.count(CaseOutcome::is_failure)
    }

    pub fn skipped(&self) -> usize {
        self.count(CaseOutcome::is_skip)
    }

    /// Warnings never fail a suite.
    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases.iter().filter(|c| c.outcome.is_failure())
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} cases, {} passed, {} warned, {} failed, {} skipped",
            self.suite,
            self.total(),
            self.passed(),
            self.warned(),
            self.failed(),
            self.skipped()
        )
    }
}

/// Every suite of one invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub environment: String,
    pub base_url: String,
    pub suites: Vec<SuiteReport>,
}

impl RunReport {
    pub fn new(environment: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            base_url: base_url.into(),
            suites: Vec::new(),
        }
    }

    pub fn has_failures(&self) -> bool {
        self.suites.iter().any(SuiteReport::has_failures)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total: usize = self.suites.iter().map(SuiteReport::total).sum();
        let failed: usize = self.suites.iter().map(SuiteReport::failed).sum();
        let warned: usize = self.suites.iter().map(SuiteReport::warned).sum();
        let skipped: usize = self.suites.iter().map(SuiteReport::skipped).sum();
        for suite in &self.suites {
            writeln!(f, "  {}", suite)?;
        }
        write!(
            f,
            "TOTAL: {} cases, {} passed, {} warned, {} failed, {} skipped",
            total,
            total - failed - warned - skipped,
            warned,
            failed,
            skipped
        )
    }
}
