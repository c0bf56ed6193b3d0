use super::{require_token, run_table, scenario_report, usable, CaseFilter, Suite, Timings};
use crate::assertions::{assert_json_value, assert_status_code};
use crate::cases::{artisan_login_cases, login_cases, logout_cases, registration_cases, ApiCase};
use crate::error::{AssertionError, HarnessError, HarnessResult};
use crate::fixtures::{admin_auth_token, extract_token, login, login_token};
use crate::generators::{unique_email, unique_phone};
use crate::outcome::CaseOutcome;
use crate::report::SuiteReport;
use crate::runner::CaseRunner;
use crate::user_manager::UserManager;
use async_trait::async_trait;
use client::{endpoints, ApiClient, ApiResponse, AuthOverride, Credentials, Method, RequestSpec, Settings};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub struct LoginSuite;

#[async_trait]
impl Suite for LoginSuite {
    fn name(&self) -> &str {
        "login"
    }

    fn description(&self) -> &str {
        "POST /auth/login with valid, wrong and blank credentials"
    }

    fn cases(&self) -> Vec<ApiCase> {
        login_cases()
    }

    async fn run(&self, settings: &Settings, filter: &CaseFilter) -> HarnessResult<SuiteReport> {
        let client = ApiClient::new(settings)?;
        let runner = CaseRunner::new(&client, settings);
        let mut report = SuiteReport::new(self.name());

        run_table(&runner, &self.cases(), filter, &mut report).await;

        if filter.runs_scenarios() {
            let credentials = &settings.test_user;

            let start = Instant::now();
            let result = token_storage(&client, credentials).await;
            report.push(scenario_report(
                "SC_Login_TokenStorage",
                "Token from login is kept as the client's bearer token",
                start,
                result,
            ));

            let start = Instant::now();
            let result = login_performance(&client, credentials).await;
            report.push(scenario_report(
                "SC_Login_Performance",
                "Two logins average under 5 s",
                start,
                result,
            ));

            let start = Instant::now();
            let result = profile_access(&client, credentials).await;
            report.push(scenario_report(
                "SC_Login_ProfileAccess",
                "Token from login opens the user profile",
                start,
                result,
            ));

            let start = Instant::now();
            let result = login_rate_limiting(&client).await;
            report.push(scenario_report(
                "SC_Login_RateLimiting",
                "Repeated wrong-password logins",
                start,
                result,
            ));
        }
        Ok(report)
    }
}

async fn token_storage(client: &ApiClient, credentials: &Credentials) -> HarnessResult<CaseOutcome> {
    let response = usable(login(client, credentials).await?)?;
    assert_status_code(&response, 200)?;
    let token = extract_token(&response).ok_or_else(|| AssertionError::new("Login returned no token"))?;

    client.set_auth_token(token.clone());
    let stored = client.auth_token();
    client.clear_auth_token();

    if stored.as_deref() == Some(token.as_str()) {
        Ok(CaseOutcome::Pass)
    } else {
        Ok(CaseOutcome::fail("Token was not stored on the client"))
    }
}

async fn login_performance(client: &ApiClient, credentials: &Credentials) -> HarnessResult<CaseOutcome> {
    let mut samples = Vec::new();
    for _ in 0..2 {
        let response = usable(login(client, credentials).await?)?;
        assert_status_code(&response, 200)?;
        samples.push(response.elapsed);
    }
    let timings = Timings::of(&samples).ok_or_else(|| HarnessError::precondition("No timings"))?;
    info!(
        "Login timings: avg {} ms, max {} ms",
        timings.average.as_millis(),
        timings.max.as_millis()
    );
    // Slow logins warn.
    Ok(match timings.judge(Duration::from_secs(5), Duration::from_secs(15)) {
        CaseOutcome::Fail { reason } => CaseOutcome::Warn {
            warnings: vec![reason],
        },
        outcome => outcome,
    })
}

async fn profile_access(client: &ApiClient, credentials: &Credentials) -> HarnessResult<CaseOutcome> {
    let token = login_token(client, credentials).await?;
    client.set_auth_token(token);
    let result = client.get(endpoints::PROFILE).await;
    client.clear_auth_token();
    let response = usable(result?)?;

    match response.status {
        200 => {
            let named = ["data.email", "data.f_name", "email", "f_name"]
                .iter()
                .any(|path| response.has_key(path));
            if named {
                Ok(CaseOutcome::Pass)
            } else {
                Ok(CaseOutcome::Warn {
                    warnings: vec!["Profile carries neither email nor name".to_string()],
                })
            }
        }
        401 => Ok(CaseOutcome::fail("Profile rejected a token issued by login")),
        status => Ok(CaseOutcome::Warn {
            warnings: vec![format!("Profile endpoint returned {}", status)],
        }),
    }
}

const RATE_LIMIT_ATTEMPTS: u32 = 3;

async fn login_rate_limiting(client: &ApiClient) -> HarnessResult<CaseOutcome> {
    for attempt in 1..=RATE_LIMIT_ATTEMPTS {
        let credentials = Credentials::new("testuser", format!("wrongpass{}", attempt));
        let response = login(client, &credentials).await?;
        if response.is_rate_limited() {
            info!(
                "Login rate limited after {} attempts, Retry-After {:?}",
                attempt, response.retry_after
            );
            return Ok(CaseOutcome::Pass);
        }
        if response.status == 200 {
            return Ok(CaseOutcome::fail("Login with a wrong password succeeded"));
        }
    }
    Ok(CaseOutcome::Warn {
        warnings: vec![format!(
            "Rate limiting not triggered after {} attempts",
            RATE_LIMIT_ATTEMPTS
        )],
    })
}

pub struct LogoutSuite;

async fn logout_with(client: &ApiClient, token: &str) -> HarnessResult<ApiResponse> {
    let spec = RequestSpec::new().auth(AuthOverride::Raw(format!("Bearer {}", token)));
    usable(client.request(Method::POST, endpoints::LOGOUT, spec).await?)
}

async fn token_invalidation(client: &ApiClient, credentials: &Credentials) -> HarnessResult<CaseOutcome> {
    let token = login_token(client, credentials).await?;
    assert_status_code(&logout_with(client, &token).await?, 204)?;

    let second = logout_with(client, &token).await?;
    if second.status == 204 {
        Ok(CaseOutcome::Pass)
    } else {
        Ok(CaseOutcome::Warn {
            warnings: vec![format!("Second logout with the same token returned {}", second.status)],
        })
    }
}

async fn logout_performance(client: &ApiClient, credentials: &Credentials) -> HarnessResult<CaseOutcome> {
    let token = login_token(client, credentials).await?;
    let response = logout_with(client, &token).await?;
    assert_status_code(&response, 204)?;
    let limit = Duration::from_secs(2);
    if response.elapsed > limit {
        return Ok(CaseOutcome::fail(format!(
            "Logout took {} ms, limit {} ms",
            response.elapsed.as_millis(),
            limit.as_millis()
        )));
    }
    Ok(CaseOutcome::Pass)
}

async fn concurrent_sessions(client: &ApiClient, credentials: &Credentials) -> HarnessResult<CaseOutcome> {
    let first = login_token(client, credentials).await?;
    let second = login_token(client, credentials).await?;
    assert_status_code(&logout_with(client, &first).await?, 204)?;
    assert_status_code(&logout_with(client, &second).await?, 204)?;
    Ok(CaseOutcome::Pass)
}

#[async_trait]
impl Suite for LogoutSuite {
    fn name(&self) -> &str {
        "logout"
    }

    fn description(&self) -> &str {
        "POST /auth/ with fresh, invalid and missing tokens"
    }

    fn cases(&self) -> Vec<ApiCase> {
        logout_cases()
    }

    async fn run(&self, settings: &Settings, filter: &CaseFilter) -> HarnessResult<SuiteReport> {
        let client = ApiClient::new(settings)?;
        let runner = CaseRunner::new(&client, settings);
        let mut report = SuiteReport::new(self.name());

        run_table(&runner, &self.cases(), filter, &mut report).await;

        if filter.runs_scenarios() {
            let credentials = &settings.test_user;

            let start = Instant::now();
            let result = token_invalidation(&client, credentials).await;
            report.push(scenario_report(
                "SC_Logout_Invalidation",
                "Logging out twice with the same token",
                start,
                result,
            ));

            let start = Instant::now();
            let result = logout_performance(&client, credentials).await;
            report.push(scenario_report(
                "SC_Logout_Performance",
                "Logout answers within 2 s",
                start,
                result,
            ));

            let start = Instant::now();
            let result = concurrent_sessions(&client, credentials).await;
            report.push(scenario_report(
                "SC_Logout_Sessions",
                "Two sessions of one user log out independently",
                start,
                result,
            ));
        }
        Ok(report)
    }
}

pub struct RegistrationSuite;

fn registration_body(f_name: &str, l_name: &str, email: &str, phone: &str) -> Value {
    json!({
        "f_name": f_name,
        "l_name": l_name,
        "email": email,
        "phone": phone,
        "password": "SecurePass123!",
    })
}

async fn register(client: &ApiClient, body: Value) -> HarnessResult<ApiResponse> {
    usable(client.post(endpoints::REGISTER, body).await?)
}

async fn critical_path(client: &ApiClient) -> HarnessResult<CaseOutcome> {
    let email = unique_email("critical");
    let phone = unique_phone();
    let response = register(client, registration_body("Critical", "Path", &email, &phone)).await?;

    assert_status_code(&response, 201)?;
    assert_json_value(&response, "success", &json!(true))?;
    assert_json_value(&response, "data.user.email", &json!(email))?;
    assert_json_value(&response, "data.user.phone", &json!(phone))?;
    Ok(CaseOutcome::Pass)
}

fn is_duplicate_rejection(response: &ApiResponse) -> bool {
    matches!(response.status, 409 | 400 | 422)
}

async fn duplicate_prevention(client: &ApiClient) -> HarnessResult<CaseOutcome> {
    let email = unique_email("duplicate");
    let phone = unique_phone();
    let first = register(client, registration_body("Duplicate", "Original", &email, &phone)).await?;
    if first.status != 201 {
        return Err(HarnessError::precondition(format!(
            "First registration returned {}",
            first.status
        )));
    }

    let same_email = register(client, registration_body("Duplicate", "Email", &email, &unique_phone())).await?;
    if !is_duplicate_rejection(&same_email) {
        return Ok(CaseOutcome::fail(format!(
            "Duplicate email was not refused, got status {}",
            same_email.status
        )));
    }

    let same_phone = register(
        client,
        registration_body("Duplicate", "Phone", &unique_email("duplicate"), &phone),
    )
    .await?;
    match same_phone.status {
        _ if is_duplicate_rejection(&same_phone) => Ok(CaseOutcome::Pass),
        201 => Ok(CaseOutcome::Warn {
            warnings: vec!["Duplicate phone was accepted".to_string()],
        }),
        status => Ok(CaseOutcome::fail(format!(
            "Duplicate phone returned unexpected status {}",
            status
        ))),
    }
}

async fn registration_performance(client: &ApiClient) -> HarnessResult<CaseOutcome> {
    let mut samples = Vec::new();
    for _ in 0..3 {
        let response = register(
            client,
            registration_body("Perf", "Test", &unique_email("perf"), &unique_phone()),
        )
        .await?;
        assert_status_code(&response, 201)?;
        samples.push(response.elapsed);
    }
    let timings = Timings::of(&samples).ok_or_else(|| HarnessError::precondition("No timings"))?;
    info!(
        "Registration timings: avg {} ms, max {} ms",
        timings.average.as_millis(),
        timings.max.as_millis()
    );
    Ok(timings.judge(Duration::from_millis(2500), Duration::from_secs(5)))
}

#[async_trait]
impl Suite for RegistrationSuite {
    fn name(&self) -> &str {
        "registration"
    }

    fn description(&self) -> &str {
        "POST /auth/register field validation, duplicates and security payloads"
    }

    fn cases(&self) -> Vec<ApiCase> {
        registration_cases()
    }

    async fn run(&self, settings: &Settings, filter: &CaseFilter) -> HarnessResult<SuiteReport> {
        let client = ApiClient::new(settings)?;
        let runner = CaseRunner::new(&client, settings);
        let mut report = SuiteReport::new(self.name());

        run_table(&runner, &self.cases(), filter, &mut report).await;

        if filter.runs_scenarios() {
            let start = Instant::now();
            let result = critical_path(&client).await;
            report.push(scenario_report(
                "SC_Reg_CriticalPath",
                "Registration echoes the submitted email and phone",
                start,
                result,
            ));

            let start = Instant::now();
            let result = duplicate_prevention(&client).await;
            report.push(scenario_report(
                "SC_Reg_Duplicates",
                "Second registration with a used email is refused, a used phone should be",
                start,
                result,
            ));

            let start = Instant::now();
            let result = registration_performance(&client).await;
            report.push(scenario_report(
                "SC_Reg_Performance",
                "Three registrations average under 2.5 s",
                start,
                result,
            ));
        }
        Ok(report)
    }
}

/// Artisan login needs accounts in known whitelist states, provisioned
/// through the admin API before the table runs.
pub struct ArtisanLoginSuite {
    approval_wait: Duration,
}

impl Default for ArtisanLoginSuite {
    fn default() -> Self {
        Self {
            approval_wait: Duration::from_secs(5),
        }
    }
}

impl ArtisanLoginSuite {
    pub fn with_approval_wait(mut self, wait: Duration) -> Self {
        self.approval_wait = wait;
        self
    }

    async fn approval_flow(&self, users: &mut UserManager<'_>, client: &ApiClient) -> HarnessResult<CaseOutcome> {
        let user = users.create_test_artisan(false).await?;
        let id = user
            .id
            .clone()
            .ok_or_else(|| HarnessError::precondition("New artisan not found in whitelist"))?;

        let blocked = usable(login(client, &user.credentials()).await?)?;
        if blocked.status == 200 {
            return Ok(CaseOutcome::fail("Artisan pending approval was able to log in"));
        }
        let mut warnings = Vec::new();
        if blocked.status != 403 {
            warnings.push(format!("Pending artisan login returned {}, expected 403", blocked.status));
        }

        if !users.approve_user_in_whitelist(&id).await? {
            return Ok(CaseOutcome::fail("Approval request was not accepted"));
        }
        tokio::time::sleep(self.approval_wait).await;

        let allowed = usable(login(client, &user.credentials()).await?)?;
        assert_status_code(&allowed, 200)?;
        Ok(CaseOutcome::from_warnings(warnings))
    }
}

fn needs_accounts(cases: &[&ApiCase]) -> bool {
    cases
        .iter()
        .any(|c| c.id == "TC_Artisan_Login_01" || c.id == "TC_Artisan_Login_02")
}

#[async_trait]
impl Suite for ArtisanLoginSuite {
    fn name(&self) -> &str {
        "artisan-login"
    }

    fn description(&self) -> &str {
        "Artisan login gated by whitelist approval"
    }

    fn cases(&self) -> Vec<ApiCase> {
        artisan_login_cases()
    }

    async fn run(&self, settings: &Settings, filter: &CaseFilter) -> HarnessResult<SuiteReport> {
        let client = ApiClient::new(settings)?;
        let admin_token = admin_auth_token(&client, settings).await;
        let mut runner = CaseRunner::new(&client, settings).with_admin_token(admin_token.clone());
        let mut users = UserManager::new(&client, settings);
        let mut report = SuiteReport::new(self.name());
        let cases = self.cases();

        if admin_token.is_some() && needs_accounts(&filter.select(&cases)) {
            match users.get_or_create_approved_user().await {
                Ok(user) if user.approved => {
                    runner.set_placeholder("approved_identifier", user.email);
                    runner.set_placeholder("approved_password", user.password);
                }
                Ok(user) => warn!("Artisan {} could not be approved", user.email),
                Err(e) => warn!("Could not provision an approved artisan: {}", e),
            }
            match users.get_or_create_pending_user().await {
                Ok(user) => {
                    runner.set_placeholder("pending_identifier", user.email);
                    runner.set_placeholder("pending_password", user.password);
                }
                Err(e) => warn!("Could not provision a pending artisan: {}", e),
            }
        }

        run_table(&runner, &cases, filter, &mut report).await;

        if filter.runs_scenarios() {
            let start = Instant::now();
            let result = match require_token(admin_token, "Admin") {
                Ok(_) => self.approval_flow(&mut users, &client).await,
                Err(e) => Err(e),
            };
            report.push(scenario_report(
                "SC_Artisan_ApprovalFlow",
                "Pending artisan is blocked, then logs in once approved",
                start,
                result,
            ));
        }

        for line in users.report() {
            info!("Test user: {}", line);
        }
        Ok(report)
    }
}
