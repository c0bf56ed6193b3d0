use super::{get_as, require_token, run_table, scenario_report, usable, CaseFilter, Suite};
use crate::assertions::assert_status_code;
use crate::cases::{technique, techniques_add_cases, techniques_get_cases, unique_technique_name, ApiCase};
use crate::error::HarnessResult;
use crate::fixtures::admin_auth_token;
use crate::outcome::CaseOutcome;
use crate::report::SuiteReport;
use crate::runner::CaseRunner;
use crate::search::SearchBugReport;
use async_trait::async_trait;
use client::{endpoints, ApiClient, ApiResponse, AuthOverride, Method, RequestSpec, Settings};
use serde_json::json;
use std::time::Instant;
use tracing::{info, warn};

/// Search terms and how many techniques each should return.
const BUG_SEARCHES: [(&str, usize); 5] = [
    ("Single", 1),
    ("Test", 2),
    ("1768808718215", 1),
    ("NONEXISTENT_XYZ", 0),
    ("@#$%", 0),
];

pub struct TechniquesAddSuite;

async fn post_as(client: &ApiClient, token: &str, body: serde_json::Value) -> HarnessResult<ApiResponse> {
    let spec = RequestSpec::new()
        .json(body)
        .auth(AuthOverride::Raw(format!("Bearer {}", token)));
    usable(client.request(Method::POST, endpoints::TECHNIQUES, spec).await?)
}

fn duplicate_flag(response: &ApiResponse) -> Option<bool> {
    ["data.0.is_duplicate", "data.is_duplicate", "data.techniques.0.is_duplicate"]
        .iter()
        .find_map(|path| response.pointer(path).and_then(|v| v.as_bool()))
}

async fn duplicate_detection(client: &ApiClient, token: &str) -> HarnessResult<CaseOutcome> {
    let name = unique_technique_name("duplicate-check");
    let body = json!({"techniques": [technique(&name, "Duplicate detection", true, &[("en", "Duplicate")])]});

    let first = post_as(client, token, body.clone()).await?;
    assert_status_code(&first, 201)?;

    let second = post_as(client, token, body).await?;
    match second.status {
        409 | 422 => Ok(CaseOutcome::Pass),
        200 | 201 => match duplicate_flag(&second) {
            Some(true) => Ok(CaseOutcome::Pass),
            Some(false) => Ok(CaseOutcome::fail(format!(
                "Second create of '{}' was not flagged as a duplicate",
                name
            ))),
            None => Ok(CaseOutcome::Warn {
                warnings: vec!["Duplicate create accepted without an is_duplicate flag".to_string()],
            }),
        },
        other => Ok(CaseOutcome::fail(format!(
            "Duplicate create returned unexpected status {}",
            other
        ))),
    }
}

#[async_trait]
impl Suite for TechniquesAddSuite {
    fn name(&self) -> &str {
        "techniques-add"
    }

    fn description(&self) -> &str {
        "POST /techniques/ with single, bulk, duplicate and invalid payloads"
    }

    fn cases(&self) -> Vec<ApiCase> {
        techniques_add_cases()
    }

    async fn run(&self, settings: &Settings, filter: &CaseFilter) -> HarnessResult<SuiteReport> {
        let client = ApiClient::new(settings)?;
        let admin_token = admin_auth_token(&client, settings).await;
        let runner = CaseRunner::new(&client, settings).with_admin_token(admin_token.clone());
        let mut report = SuiteReport::new(self.name());

        run_table(&runner, &self.cases(), filter, &mut report).await;

        if filter.runs_scenarios() {
            let start = Instant::now();
            let result = match require_token(admin_token, "Admin") {
                Ok(token) => duplicate_detection(&client, &token).await,
                Err(e) => Err(e),
            };
            report.push(scenario_report(
                "SC_TA_Duplicate",
                "Creating the same technique twice is detected",
                start,
                result,
            ));
        }
        Ok(report)
    }
}

fn technique_names(response: &ApiResponse) -> Vec<String> {
    response.techniques().into_iter().map(|t| t.name).collect()
}

/// Compares a set of searches against the unfiltered listing.
///
/// A search that returns exactly as many techniques as no search at all
/// means the backend dropped the parameter.
pub async fn search_bug_report(client: &ApiClient, token: &str) -> HarnessResult<SearchBugReport> {
    let baseline = get_as(client, endpoints::TECHNIQUES, token, &[]).await?;
    assert_status_code(&baseline, 200)?;
    let mut report = SearchBugReport::new(baseline.data_list().len());

    for (term, expected) in BUG_SEARCHES {
        let response = get_as(client, endpoints::TECHNIQUES, token, &[("search", term.to_string())]).await?;
        if response.status != 200 {
            warn!("Search '{}' returned {}", term, response.status);
            continue;
        }
        report.record(term, expected, &technique_names(&response));
    }
    Ok(report)
}

async fn search_bug(client: &ApiClient, token: &str) -> HarnessResult<CaseOutcome> {
    let report = search_bug_report(client, token).await?;
    info!("Technique search report:\n{}", report);
    if report.bug_confirmed() {
        let terms: Vec<&str> = report
            .attempts
            .iter()
            .filter(|p| p.same_as_baseline)
            .map(|p| p.term.as_str())
            .collect();
        return Ok(CaseOutcome::fail(format!(
            "Search parameter ignored: {} returned all {} techniques",
            terms.join(", "),
            report.baseline_total
        )));
    }
    Ok(CaseOutcome::Pass)
}

pub struct TechniquesGetSuite;

#[async_trait]
impl Suite for TechniquesGetSuite {
    fn name(&self) -> &str {
        "techniques-get"
    }

    fn description(&self) -> &str {
        "GET /techniques/ filtering, sorting, paging and search"
    }

    fn cases(&self) -> Vec<ApiCase> {
        techniques_get_cases()
    }

    async fn run(&self, settings: &Settings, filter: &CaseFilter) -> HarnessResult<SuiteReport> {
        let client = ApiClient::new(settings)?;
        let admin_token = admin_auth_token(&client, settings).await;
        let runner = CaseRunner::new(&client, settings).with_admin_token(admin_token.clone());
        let mut report = SuiteReport::new(self.name());

        run_table(&runner, &self.cases(), filter, &mut report).await;

        if filter.runs_scenarios() {
            let start = Instant::now();
            let result = match require_token(admin_token, "Admin") {
                Ok(token) => search_bug(&client, &token).await,
                Err(e) => Err(e),
            };
            report.push(scenario_report(
                "SC_TG_SearchBug",
                "Search narrows the technique listing",
                start,
                result,
            ));
        }
        Ok(report)
    }
}
