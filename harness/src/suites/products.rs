use super::{run_table, CaseFilter, Suite};
use crate::cases::{product_cases, ApiCase};
use crate::error::HarnessResult;
use crate::fixtures::artisan_auth_token;
use crate::report::SuiteReport;
use crate::runner::CaseRunner;
use async_trait::async_trait;
use client::{ApiClient, Settings};

/// Product creation as an artisan. Without an artisan login every case
/// that needs one is skipped.
pub struct ProductSuite;

#[async_trait]
impl Suite for ProductSuite {
    fn name(&self) -> &str {
        "products"
    }

    fn description(&self) -> &str {
        "POST /products field validation and boundaries"
    }

    fn cases(&self) -> Vec<ApiCase> {
        product_cases()
    }

    async fn run(&self, settings: &Settings, filter: &CaseFilter) -> HarnessResult<SuiteReport> {
        let client = ApiClient::new(settings)?;
        let artisan_token = artisan_auth_token(&client, settings).await;
        let runner = CaseRunner::new(&client, settings).with_artisan_token(artisan_token);
        let mut report = SuiteReport::new(self.name());

        run_table(&runner, &self.cases(), filter, &mut report).await;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[tokio::test]
    async fn test_products_skip_without_artisan() {
        let server = Server::new_async().await;
        let settings = Settings::for_local(server.url());

        let report = ProductSuite.run(&settings, &CaseFilter::default()).await.unwrap();
        assert_eq!(report.total(), ProductSuite.cases().len());
        assert_eq!(report.skipped(), report.total());
    }

    #[tokio::test]
    async fn test_single_product_case_by_id() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/login")
            .with_status(200)
            .with_body(
                json!({"success": true, "data": {"access_token": "art", "user": {"role": "artisan"}}})
                    .to_string(),
            )
            .create_async()
            .await;
        let create = server
            .mock("POST", "/products")
            .match_header("authorization", "Bearer art")
            .match_body(Matcher::PartialJson(json!({"is_active": true})))
            .with_status(201)
            .with_body(
                json!({"success": true, "data": {
                    "id": "p1",
                    "name": "Test Product",
                    "status": "pending",
                    "materials": [],
                    "techniques": [],
                    "files": []
                }})
                .to_string(),
            )
            .create_async()
            .await;

        let settings = Settings::for_local(server.url())
            .with_artisan_credentials(client::Credentials::new("artisan@test.com", "pw"));
        let filter = CaseFilter {
            tag: None,
            id: Some("TC-001".into()),
        };

        let report = ProductSuite.run(&settings, &filter).await.unwrap();
        assert_eq!(report.total(), 1);
        assert_eq!(report.passed(), 1);
        create.assert_async().await;
    }
}
