//! Full suites against the configured UAT backend.
//! Run with `cargo test -p harness -- --ignored`.

use client::{load_dotenv, Settings};
use harness::{CaseFilter, SuiteRegistry};

fn live_settings() -> Settings {
    let _ = load_dotenv(".env");
    Settings::from_env().expect("settings from environment")
}

async fn run_suite(name: &str, filter: CaseFilter) {
    let settings = live_settings();
    let registry = SuiteRegistry::with_defaults();
    let report = registry.run(name, &settings, &filter).await.expect("suite run");

    for case in &report.cases {
        println!("{}", case);
    }
    assert!(report.total() > 0, "no cases ran for {}", name);
    assert!(
        !report.has_failures(),
        "{} failed: {:?}",
        name,
        report.failures().map(|c| c.id.as_str()).collect::<Vec<_>>()
    );
}

#[tokio::test]
#[ignore]
async fn test_login_suite() {
    run_suite("login", CaseFilter::default()).await;
}

#[tokio::test]
#[ignore]
async fn test_logout_suite() {
    run_suite("logout", CaseFilter::default()).await;
}

#[tokio::test]
#[ignore]
async fn test_registration_smoke() {
    run_suite(
        "registration",
        CaseFilter {
            tag: Some("smoke".into()),
            id: None,
        },
    )
    .await;
}

#[tokio::test]
#[ignore]
async fn test_whitelist_suite() {
    run_suite("whitelist", CaseFilter::default()).await;
}

#[tokio::test]
#[ignore]
async fn test_techniques_get_suite() {
    run_suite("techniques-get", CaseFilter::default()).await;
}

#[tokio::test]
#[ignore]
async fn test_products_smoke() {
    run_suite(
        "products",
        CaseFilter {
            tag: Some("smoke".into()),
            id: None,
        },
    )
    .await;
}
