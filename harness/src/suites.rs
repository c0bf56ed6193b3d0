//! Named suites: a case table plus the scenarios that do not fit a table.
//!
//! Suites are registered by name in a [`SuiteRegistry`] and run sequentially,
//! each with its own paced client.

use crate::cases::ApiCase;
use crate::error::{HarnessError, HarnessResult};
use crate::outcome::{CaseMetrics, CaseOutcome};
use crate::report::{CaseReport, SuiteReport};
use crate::runner::CaseRunner;
use async_trait::async_trait;
use client::{ApiClient, ApiResponse, AuthOverride, Method, RequestSpec, Settings};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::info;

mod auth;
mod products;
mod techniques;
mod whitelist;

pub use auth::{ArtisanLoginSuite, LoginSuite, LogoutSuite, RegistrationSuite};
pub use products::ProductSuite;
pub use techniques::{search_bug_report, TechniquesAddSuite, TechniquesGetSuite};
pub use whitelist::{WhitelistApprovalSuite, WhitelistSuite};

/// Which cases of a suite to run.
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    pub tag: Option<String>,
    pub id: Option<String>,
}

impl CaseFilter {
    pub fn select<'c>(&self, cases: &'c [ApiCase]) -> Vec<&'c ApiCase> {
        cases
            .iter()
            .filter(|c| self.tag.as_deref().map_or(true, |t| c.has_tag(t)))
            .filter(|c| {
                self.id
                    .as_deref()
                    .map_or(true, |id| c.id.eq_ignore_ascii_case(id))
            })
            .collect()
    }

    /// Scenarios run only when the whole suite is selected.
    pub fn runs_scenarios(&self) -> bool {
        self.tag.is_none() && self.id.is_none()
    }
}

#[async_trait]
pub trait Suite: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn cases(&self) -> Vec<ApiCase>;
    async fn run(&self, settings: &Settings, filter: &CaseFilter) -> HarnessResult<SuiteReport>;
}

pub struct SuiteRegistry {
    suites: HashMap<String, Box<dyn Suite>>,
    order: Vec<String>,
}

impl SuiteRegistry {
    pub fn new() -> Self {
        Self {
            suites: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Every suite, in the order a full run executes them.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(LoginSuite));
        registry.register(Box::new(LogoutSuite));
        registry.register(Box::new(RegistrationSuite));
        registry.register(Box::new(ArtisanLoginSuite::default()));
        registry.register(Box::new(WhitelistSuite));
        registry.register(Box::new(WhitelistApprovalSuite));
        registry.register(Box::new(TechniquesAddSuite));
        registry.register(Box::new(TechniquesGetSuite));
        registry.register(Box::new(ProductSuite));
        registry
    }

    pub fn register(&mut self, suite: Box<dyn Suite>) {
        let name = suite.name().to_string();
        if self.suites.insert(name.clone(), suite).is_none() {
            self.order.push(name);
        }
    }

    pub fn get_suite(&self, name: &str) -> Option<&dyn Suite> {
        self.suites.get(name).map(|s| s.as_ref())
    }

    pub fn list_suites(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    pub async fn run(&self, name: &str, settings: &Settings, filter: &CaseFilter) -> HarnessResult<SuiteReport> {
        match self.suites.get(name) {
            Some(suite) => {
                info!("Running suite {}", name);
                suite.run(settings, filter).await
            }
            None => Err(HarnessError::SuiteNotFound {
                name: name.to_string(),
            }),
        }
    }
}

impl Default for SuiteRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the selected table cases into `report`.
pub(crate) async fn run_table(runner: &CaseRunner<'_>, cases: &[ApiCase], filter: &CaseFilter, report: &mut SuiteReport) {
    for case in filter.select(cases) {
        report.push(runner.run_case(case).await);
    }
}

/// Turns the result of a scenario into a report line. Unmet preconditions
/// skip, everything else that went wrong fails.
pub(crate) fn scenario_report(
    id: &str,
    description: &str,
    start: Instant,
    result: HarnessResult<CaseOutcome>,
) -> CaseReport {
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) if e.is_skip() => CaseOutcome::skip(e.to_string()),
        Err(HarnessError::Assertion(e)) => CaseOutcome::fail(e.message),
        Err(e) => CaseOutcome::fail(e.to_string()),
    };
    let metrics = CaseMetrics {
        duration: start.elapsed(),
        ..Default::default()
    };
    CaseReport::new(id, description, outcome, metrics)
}

/// Rate-limited responses mean the scenario cannot be judged.
pub(crate) fn usable(response: ApiResponse) -> HarnessResult<ApiResponse> {
    if response.is_rate_limited() {
        Err(HarnessError::precondition("Rate limited"))
    } else {
        Ok(response)
    }
}

/// GET with a bearer token, bypassing the client's session token.
pub(crate) async fn get_as(
    client: &ApiClient,
    endpoint: &str,
    token: &str,
    query: &[(&str, String)],
) -> HarnessResult<ApiResponse> {
    let mut spec = RequestSpec::new().auth(AuthOverride::Raw(format!("Bearer {}", token)));
    for (key, value) in query {
        spec = spec.query(*key, value.as_str());
    }
    usable(client.request(Method::GET, endpoint, spec).await?)
}

pub(crate) fn require_token(token: Option<String>, what: &str) -> HarnessResult<String> {
    token.ok_or_else(|| HarnessError::precondition(format!("{} token not available", what)))
}

/// Average and maximum of a set of timings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timings {
    pub average: Duration,
    pub max: Duration,
}

impl Timings {
    pub fn of(samples: &[Duration]) -> Option<Self> {
        let max = samples.iter().max().copied()?;
        let total: Duration = samples.iter().sum();
        let count = u32::try_from(samples.len()).ok()?;
        Some(Self {
            average: total / count,
            max,
        })
    }

    /// `Fail` when either bound is exceeded.
    pub fn judge(&self, max_average: Duration, max_single: Duration) -> CaseOutcome {
        if self.average > max_average {
            CaseOutcome::fail(format!(
                "Average response time {} ms exceeds {} ms",
                self.average.as_millis(),
                max_average.as_millis()
            ))
        } else if self.max > max_single {
            CaseOutcome::fail(format!(
                "Slowest response {} ms exceeds {} ms",
                self.max.as_millis(),
                max_single.as_millis()
            ))
        } else {
            CaseOutcome::Pass
        }
    }
}
