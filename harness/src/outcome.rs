//! Outcome of a single case or scenario.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Verdict for one case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CaseOutcome {
    /// Every hard expectation and every soft check held
    Pass,
    /// Hard expectations held, some soft checks did not
    Warn { warnings: Vec<String> },
    /// A hard expectation did not hold
    Fail { reason: String },
    /// The case could not run: rate limited, missing credentials, transport down
    Skip { reason: String },
}

impl CaseOutcome {
    pub fn fail(reason: impl Into<String>) -> Self {
        CaseOutcome::Fail {
            reason: reason.into(),
        }
    }

    pub fn skip(reason: impl Into<String>) -> Self {
        CaseOutcome::Skip {
            reason: reason.into(),
        }
    }

    /// `Pass` when there is nothing to warn about.
    pub fn from_warnings(warnings: Vec<String>) -> Self {
        if warnings.is_empty() {
            CaseOutcome::Pass
        } else {
            CaseOutcome::Warn { warnings }
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, CaseOutcome::Pass)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, CaseOutcome::Warn { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CaseOutcome::Fail { .. })
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, CaseOutcome::Skip { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            CaseOutcome::Pass => "PASS",
            CaseOutcome::Warn { .. } => "WARN",
            CaseOutcome::Fail { .. } => "FAIL",
            CaseOutcome::Skip { .. } => "SKIP",
        }
    }
}

impl fmt::Display for CaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseOutcome::Pass => write!(f, "✅ PASS"),
            CaseOutcome::Warn { warnings } => {
                write!(f, "⚠️  WARN: {}", warnings.join("; "))
            }
            CaseOutcome::Fail { reason } => write!(f, "❌ FAIL: {}", reason),
            CaseOutcome::Skip { reason } => write!(f, "⏭  SKIP: {}", reason),
        }
    }
}

/// Measurements taken while running a case.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CaseMetrics {
    pub duration: Duration,
    /// HTTP status of the last response, when one arrived
    pub status: Option<u16>,
    pub retries: u32,
}

impl fmt::Display for CaseMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = vec![format!("{} ms", self.duration.as_millis())];

        if let Some(status) = self.status {
            parts.push(format!("status {}", status));
        }

        if self.retries > 0 {
            parts.push(format!("retries: {}", self.retries));
        }

        write!(f, "{}", parts.join(", "))
    }
}
