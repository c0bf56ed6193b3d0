//! Suites driven through the registry against a local mock backend.

use client::{Credentials, Settings};
use harness::{search_bug_report, CaseFilter, CaseOutcome, RunReport, SuiteRegistry};
use mockito::{Matcher, Server};
use serde_json::json;

fn only(id: &str) -> CaseFilter {
    CaseFilter {
        tag: None,
        id: Some(id.to_string()),
    }
}

#[tokio::test]
async fn test_login_case_by_id() {
    let mut server = Server::new_async().await;
    let login = server
        .mock("POST", "/auth/login")
        .match_body(Matcher::Json(
            json!({"identifier": "adminteresa", "password": "admin#123@"}),
        ))
        .with_status(401)
        .with_body(json!({"success": false, "message": "Invalid credentials"}).to_string())
        .create_async()
        .await;

    let settings = Settings::for_local(server.url());
    let registry = SuiteRegistry::with_defaults();
    let report = registry
        .run("login", &settings, &only("TC_Login_02"))
        .await
        .unwrap();

    assert_eq!(report.total(), 1);
    assert_eq!(report.cases[0].outcome, CaseOutcome::Pass);
    assert_eq!(report.cases[0].metrics.status, Some(401));
    login.assert_async().await;
}

#[tokio::test]
async fn test_valid_login_case_uses_configured_test_user() {
    let mut server = Server::new_async().await;
    let login = server
        .mock("POST", "/auth/login")
        .match_body(Matcher::Json(
            json!({"identifier": "qa@teresa.test", "password": "qa-secret"}),
        ))
        .with_status(200)
        .with_body(
            json!({
                "success": true,
                "message": "Login verification successful",
                "data": {"access_token": "a.b.c", "refresh_token": "r"}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let settings = Settings::for_local(server.url())
        .with_test_user(Credentials::new("qa@teresa.test", "qa-secret"));
    let report = SuiteRegistry::with_defaults()
        .run("login", &settings, &only("TC_Login_01"))
        .await
        .unwrap();

    login.assert_async().await;
    assert_eq!(report.total(), 1);
    assert!(!report.has_failures(), "{}", report.cases[0]);
    assert_eq!(report.cases[0].metrics.status, Some(200));
}

#[tokio::test]
async fn test_registration_strict_message_fails() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/register")
        .with_status(201)
        .with_body(json!({"success": true, "message": "Created"}).to_string())
        .create_async()
        .await;

    let settings = Settings::for_local(server.url());
    let report = SuiteRegistry::with_defaults()
        .run("registration", &settings, &only("TC_Artisan_Reg_01"))
        .await
        .unwrap();

    assert!(report.has_failures());
    let failure = report.failures().next().unwrap();
    assert!(matches!(
        &failure.outcome,
        CaseOutcome::Fail { reason } if reason.contains("Register Successfully")
    ));
}

#[tokio::test]
async fn test_whitelist_without_admin_skips() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/login")
        .with_status(401)
        .with_body(json!({"success": false, "message": "Invalid credentials"}).to_string())
        .create_async()
        .await;

    let settings = Settings::for_local(server.url());
    let report = SuiteRegistry::with_defaults()
        .run("whitelist", &settings, &only("TC_Whitelist_01"))
        .await
        .unwrap();

    assert_eq!(report.skipped(), 1);

    let mut run = RunReport::new("LOCAL", server.url());
    run.suites.push(report);
    assert!(!run.has_failures());
}

#[tokio::test]
async fn test_search_bug_report_against_mock() {
    let mut server = Server::new_async().await;
    let everything = json!({
        "success": true,
        "data": [{"name": "Single Weave"}, {"name": "Test Dye"}, {"name": "Pottery"}],
    });
    server
        .mock("GET", "/techniques/")
        .match_header("authorization", "Bearer admin-token")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(everything.to_string())
        .create_async()
        .await;

    let settings = Settings::for_local(server.url());
    let client = client::ApiClient::new(&settings).unwrap();
    let report = search_bug_report(&client, "admin-token").await.unwrap();

    assert!(report.bug_confirmed());
    assert!(report.attempts.iter().all(|p| p.same_as_baseline));
    assert!(report.to_string().contains("BUG CONFIRMED"));
}
