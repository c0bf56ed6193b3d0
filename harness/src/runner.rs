//! Executes [`ApiCase`] values against a client and judges the responses.

use crate::cases::{
    substitute, substitute_str, ApiCase, AuthMode, Check, CheckContext, Expected, Placeholders,
};
use crate::fixtures::login_token;
use crate::outcome::{CaseMetrics, CaseOutcome};
use crate::report::CaseReport;
use client::{ApiClient, ApiResponse, AuthOverride, RequestSpec, Settings};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub struct CaseRunner<'a> {
    client: &'a ApiClient,
    settings: &'a Settings,
    admin_token: Option<String>,
    artisan_token: Option<String>,
    placeholders: Placeholders,
    test_delay: Duration,
}

impl<'a> CaseRunner<'a> {
    /// `{test_identifier}` and `{test_password}` are always available and
    /// resolve to the configured test user.
    pub fn new(client: &'a ApiClient, settings: &'a Settings) -> Self {
        let mut placeholders = Placeholders::new();
        placeholders.insert("test_identifier".to_string(), settings.test_user.identifier.clone());
        placeholders.insert("test_password".to_string(), settings.test_user.password.clone());
        Self {
            client,
            settings,
            admin_token: None,
            artisan_token: None,
            placeholders,
            test_delay: settings.test_delay,
        }
    }

    pub fn with_admin_token(mut self, token: Option<String>) -> Self {
        self.admin_token = token;
        self
    }

    pub fn with_artisan_token(mut self, token: Option<String>) -> Self {
        self.artisan_token = token;
        self
    }

    pub fn set_placeholder(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.placeholders.insert(name.into(), value.into());
    }

    pub fn remove_placeholder(&mut self, name: &str) {
        self.placeholders.remove(name);
    }

    pub fn placeholders(&self) -> &Placeholders {
        &self.placeholders
    }

    pub fn client(&self) -> &ApiClient {
        self.client
    }

    pub fn settings(&self) -> &Settings {
        self.settings
    }

    pub fn admin_token(&self) -> Option<&str> {
        self.admin_token.as_deref()
    }

    /// Runs the case, then pauses for the configured test delay.
    pub async fn run_case(&self, case: &ApiCase) -> CaseReport {
        info!("Running {}: {}", case.id, case.description);
        let start = Instant::now();
        let (outcome, mut metrics) = self.execute(case).await;
        metrics.duration = start.elapsed();

        if outcome.is_pass() {
            info!("{} {}", case.id, outcome);
        } else {
            warn!("{} {}", case.id, outcome);
        }

        if !self.test_delay.is_zero() {
            tokio::time::sleep(self.test_delay).await;
        }
        CaseReport::new(case.id, case.description, outcome, metrics)
    }

    pub async fn run_all<'c>(&self, cases: impl IntoIterator<Item = &'c ApiCase>) -> Vec<CaseReport> {
        let mut reports = Vec::new();
        for case in cases {
            reports.push(self.run_case(case).await);
        }
        reports
    }

    async fn execute(&self, case: &ApiCase) -> (CaseOutcome, CaseMetrics) {
        let mut metrics = CaseMetrics::default();

        if let Some(reason) = case.skip {
            return (CaseOutcome::skip(reason), metrics);
        }

        let auth = match self.resolve_auth(&case.auth).await {
            Ok(auth) => auth,
            Err(reason) => return (CaseOutcome::skip(reason), metrics),
        };

        let (endpoint, body, query) = match self.resolve_request(case) {
            Ok(parts) => parts,
            Err(name) => {
                return (
                    CaseOutcome::skip(format!("No value available for {{{}}}", name)),
                    metrics,
                )
            }
        };

        let mut spec = RequestSpec::new().auth(auth);
        if let Some(body) = &body {
            spec = spec.json(body.clone());
        }
        for (key, value) in &query {
            spec = spec.query(key.as_str(), value.as_str());
        }

        let response = match self
            .client
            .request(case.request.method.clone(), &endpoint, spec)
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_unavailable() => {
                return (CaseOutcome::skip(format!("Service unavailable: {}", e)), metrics)
            }
            Err(e) => return (CaseOutcome::fail(e.to_string()), metrics),
        };

        metrics.status = Some(response.status);
        metrics.retries = response.retries;
        debug!("{} response: {}", case.id, response.preview(300));

        if response.is_rate_limited() {
            return (
                CaseOutcome::skip(format!("Rate limited after {} retries", response.retries)),
                metrics,
            );
        }

        let ctx = CheckContext::new(&response)
            .with_body(body.as_ref())
            .with_query(&query);
        (judge(&case.expected, &case.checks, &ctx), metrics)
    }

    async fn resolve_auth(&self, auth: &AuthMode) -> Result<AuthOverride, String> {
        let bearer = |token: &str| AuthOverride::Raw(format!("Bearer {}", token));
        match auth {
            AuthMode::None => Ok(AuthOverride::Omit),
            AuthMode::Raw(header) => Ok(AuthOverride::Raw(header.clone())),
            AuthMode::Admin => self
                .admin_token
                .as_deref()
                .map(bearer)
                .ok_or_else(|| "Admin token not available".to_string()),
            AuthMode::Artisan => self
                .artisan_token
                .as_deref()
                .map(bearer)
                .ok_or_else(|| "Artisan token not available".to_string()),
            AuthMode::Fresh => login_token(self.client, &self.settings.test_user)
                .await
                .map(|token| bearer(&token))
                .map_err(|e| format!("Could not log in for a fresh token: {}", e)),
        }
    }

    fn resolve_request(
        &self,
        case: &ApiCase,
    ) -> Result<(String, Option<Value>, Vec<(String, String)>), String> {
        let endpoint = substitute_str(&case.request.endpoint, &self.placeholders)?;
        let body = case
            .request
            .payload
            .resolve()
            .map(|body| substitute(&body, &self.placeholders))
            .transpose()?;
        let query = case
            .request
            .query
            .iter()
            .map(|(k, v)| Ok((k.clone(), substitute_str(v, &self.placeholders)?)))
            .collect::<Result<Vec<_>, String>>()?;
        Ok((endpoint, body, query))
    }
}

/// Compares a response with the expectations of a case.
///
/// Status and `success` mismatches fail. A message mismatch fails only when
/// the message is strict. Soft checks become warnings.
pub fn judge(expected: &Expected, checks: &[Check], ctx: &CheckContext<'_>) -> CaseOutcome {
    let response = ctx.response;

    if !expected.statuses.is_empty() && !expected.accepts(response.status) {
        return CaseOutcome::fail(format!(
            "Expected status {}, got {}. Response: {}",
            format_statuses(&expected.statuses),
            response.status,
            response.preview(300)
        ));
    }

    let mut warnings = Vec::new();

    if let Some(success) = expected.success {
        match response.success() {
            Some(actual) if actual == success => {}
            actual => {
                return CaseOutcome::fail(format!(
                    "Expected success={}, got {}",
                    success,
                    actual.map_or_else(|| "nothing".to_string(), |a| a.to_string())
                ))
            }
        }
    }

    if let Some(message) = expected.message {
        if !message_matches(response, message) {
            let text = format!(
                "Expected message containing '{}', got '{}'",
                message,
                response.message().unwrap_or_default()
            );
            if expected.strict_message {
                return CaseOutcome::fail(text);
            }
            warnings.push(text);
        }
    }

    for check in checks {
        if let Err(e) = check.evaluate(ctx) {
            if check.is_soft() {
                warnings.push(e.message);
            } else {
                return CaseOutcome::fail(e.message);
            }
        }
    }

    CaseOutcome::from_warnings(warnings)
}

fn message_matches(response: &ApiResponse, expected: &str) -> bool {
    let expected = expected.to_lowercase();
    match response.message() {
        Some(actual) => actual.to_lowercase().contains(&expected),
        None => response.text.to_lowercase().contains(&expected),
    }
}

fn format_statuses(statuses: &[u16]) -> String {
    statuses
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(" or ")
}
