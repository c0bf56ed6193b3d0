//! Provisioning of artisan accounts through registration and the admin
//! whitelist.
//!
//! The manager borrows a client, logs in as admin on first use, and sets the
//! admin token on the client only for the duration of each admin call.

use crate::error::{HarnessError, HarnessResult};
use crate::fixtures::login_token;
use crate::generators::{unique_email, unique_phone};
use chrono::{DateTime, Utc};
use client::{
    endpoints, ApiClient, ApiResponse, Credentials, Method, RequestSpec, Settings, WhitelistEntry,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

const TEST_PASSWORD: &str = "TestPassword123!";
const APPROVAL_REASON: &str = "Test automation approval";
const RECENT_USERS_SEARCH: &str = "test_artisan";

/// An account registered by this run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestUser {
    pub email: String,
    pub phone: String,
    pub password: String,
    pub id: Option<String>,
    pub approved: bool,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TestUser {
    /// Artisans log in with their email address.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.email.clone(), self.password.clone())
    }
}

pub struct UserManager<'a> {
    client: &'a ApiClient,
    settings: &'a Settings,
    admin_token: Option<String>,
    created: Vec<TestUser>,
    propagation_delay: Duration,
    retry_delay: Duration,
}

impl<'a> UserManager<'a> {
    pub fn new(client: &'a ApiClient, settings: &'a Settings) -> Self {
        Self {
            client,
            settings,
            admin_token: None,
            created: Vec::new(),
            propagation_delay: Duration::from_secs(3),
            retry_delay: Duration::from_secs(5),
        }
    }

    /// Waits used between registration and the whitelist lookup.
    pub fn with_delays(mut self, propagation: Duration, retry: Duration) -> Self {
        self.propagation_delay = propagation;
        self.retry_delay = retry;
        self
    }

    pub fn created_users(&self) -> &[TestUser] {
        &self.created
    }

    /// Cached admin token, logging in on first use.
    pub async fn admin_token(&mut self) -> HarnessResult<String> {
        if let Some(token) = &self.admin_token {
            return Ok(token.clone());
        }
        let token = login_token(self.client, &self.settings.admin).await?;
        info!("Admin token obtained");
        self.admin_token = Some(token.clone());
        Ok(token)
    }

    /// Runs one admin request, restoring the client's previous token after.
    async fn admin_request(
        &mut self,
        method: Method,
        endpoint: &str,
        spec: RequestSpec,
    ) -> HarnessResult<ApiResponse> {
        let token = self.admin_token().await?;
        let previous = self.client.auth_token();
        self.client.set_auth_token(token);
        let result = self.client.request(method, endpoint, spec).await;
        match previous {
            Some(token) => self.client.set_auth_token(token),
            None => self.client.clear_auth_token(),
        }
        Ok(result?)
    }

    async fn search_whitelist(&mut self, term: &str, limit: u32) -> HarnessResult<Vec<WhitelistEntry>> {
        let spec = RequestSpec::new()
            .query("search", term)
            .query("page", "1")
            .query("limit", limit.to_string());
        let response = self
            .admin_request(Method::GET, endpoints::WHITELIST_AUDIT, spec)
            .await?;
        if response.status != 200 {
            warn!("Whitelist search for '{}' returned {}", term, response.status);
            return Ok(Vec::new());
        }
        Ok(response.whitelist_entries())
    }

    /// Whitelist entry id for a user, searching by email then by phone.
    pub async fn find_user_in_whitelist(&mut self, email: &str, phone: &str) -> HarnessResult<Option<String>> {
        if !email.is_empty() {
            let entries = self.search_whitelist(email, 10).await?;
            if let Some(id) = entries
                .into_iter()
                .find(|e| e.email.as_deref() == Some(email))
                .and_then(|e| e.id)
            {
                debug!("Found {} in whitelist by email", email);
                return Ok(Some(id));
            }
        }
        if !phone.is_empty() {
            let entries = self.search_whitelist(phone, 10).await?;
            if let Some(id) = entries
                .into_iter()
                .find(|e| e.phone.as_deref() == Some(phone))
                .and_then(|e| e.id)
            {
                debug!("Found {} in whitelist by phone", phone);
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    /// PATCHes the whitelist decision for `user_id`. Ids that are not bare
    /// UUIDs have the first embedded UUID extracted.
    pub async fn set_whitelist_status(
        &mut self,
        user_id: &str,
        status: &str,
        reason: &str,
    ) -> HarnessResult<ApiResponse> {
        let user_id = extract_uuid(user_id).unwrap_or(user_id).to_string();
        let body = json!({"user_id": user_id, "status": status, "reason": reason});
        self.admin_request(Method::PATCH, endpoints::WHITELIST_AUDIT, RequestSpec::new().json(body))
            .await
    }

    pub async fn approve_user_in_whitelist(&mut self, user_id: &str) -> HarnessResult<bool> {
        let response = self
            .set_whitelist_status(user_id, "approved", APPROVAL_REASON)
            .await?;
        if response.status == 200 {
            info!("Approved whitelist entry {}", user_id);
            Ok(true)
        } else {
            warn!(
                "Approval of {} returned {}: {}",
                user_id,
                response.status,
                response.preview(200)
            );
            Ok(false)
        }
    }

    /// Registers a fresh artisan and, when asked, approves it.
    pub async fn create_test_artisan(&mut self, approved: bool) -> HarnessResult<TestUser> {
        let email = unique_email("test_artisan");
        let phone = unique_phone();
        let body = json!({
            "f_name": "Test",
            "l_name": "Artisan",
            "email": email,
            "phone": phone,
            "password": TEST_PASSWORD,
        });

        let response = self.client.post(endpoints::REGISTER, body).await?;
        if response.status != 201 {
            return Err(HarnessError::precondition(format!(
                "Registration returned {}: {}",
                response.status,
                response.preview(200)
            )));
        }
        info!("Registered test artisan {}", email);

        let mut user = TestUser {
            email,
            phone,
            password: TEST_PASSWORD.to_string(),
            id: None,
            approved: false,
            status: "pending_approval".to_string(),
            created_at: Utc::now(),
        };

        // Registered accounts stay in the report even if the admin side fails.
        self.created.push(user.clone());
        let slot = self.created.len() - 1;

        tokio::time::sleep(self.propagation_delay).await;
        user.id = self.locate_new_user(&user).await;

        match (user.id.clone(), approved) {
            (Some(id), true) => match self.approve_user_in_whitelist(&id).await {
                Ok(true) => {
                    user.approved = true;
                    user.status = "approved".to_string();
                }
                Ok(false) => {}
                Err(e) => warn!("Approval of {} failed: {}", user.email, e),
            },
            (None, true) => warn!("Cannot approve {}: not found in whitelist", user.email),
            _ => {}
        }

        if let Some(stored) = self.created.get_mut(slot) {
            *stored = user.clone();
        }
        Ok(user)
    }

    /// Whitelist id of a just-registered user, retried once after
    /// `retry_delay`. Lookup errors are logged and yield `None`.
    async fn locate_new_user(&mut self, user: &TestUser) -> Option<String> {
        for attempt in 0..2 {
            if attempt > 0 {
                debug!("{} not in whitelist yet, retrying", user.email);
                tokio::time::sleep(self.retry_delay).await;
            }
            match self.find_user_in_whitelist(&user.email, &user.phone).await {
                Ok(Some(id)) => return Some(id),
                Ok(None) => {}
                Err(e) => {
                    warn!("Whitelist lookup for {} failed: {}", user.email, e);
                    return None;
                }
            }
        }
        None
    }

    pub async fn get_or_create_approved_user(&mut self) -> HarnessResult<TestUser> {
        if let Some(user) = self.created.iter().find(|u| u.approved) {
            return Ok(user.clone());
        }
        self.create_test_artisan(true).await
    }

    pub async fn get_or_create_pending_user(&mut self) -> HarnessResult<TestUser> {
        if let Some(user) = self.created.iter().find(|u| !u.approved) {
            return Ok(user.clone());
        }
        self.create_test_artisan(false).await
    }

    /// Recent automation accounts in the whitelist. Local records are
    /// refreshed with the status the whitelist reports.
    pub async fn find_recent_test_users_in_whitelist(&mut self) -> HarnessResult<Vec<WhitelistEntry>> {
        let entries = self.search_whitelist(RECENT_USERS_SEARCH, 20).await?;
        for entry in &entries {
            let Some(user) = self
                .created
                .iter_mut()
                .find(|u| entry.email.as_deref() == Some(u.email.as_str()))
            else {
                continue;
            };
            if user.id.is_none() {
                user.id = entry.id.clone();
            }
            if let Some(status) = &entry.status {
                user.approved = status == "approved";
                user.status = status.clone();
            }
        }
        Ok(entries)
    }

    /// One line per created user, for the end-of-run summary.
    pub fn report(&self) -> Vec<String> {
        self.created
            .iter()
            .map(|u| {
                format!(
                    "{} ({}) id={} status={}",
                    u.email,
                    u.phone,
                    u.id.as_deref().unwrap_or("unknown"),
                    u.status
                )
            })
            .collect()
    }
}

/// First UUID embedded in `text`.
pub fn extract_uuid(text: &str) -> Option<&str> {
    let re = regex::Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    )
    .ok()?;
    re.find(text).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    const ID: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

    fn manager<'a>(client: &'a ApiClient, settings: &'a Settings) -> UserManager<'a> {
        UserManager::new(client, settings).with_delays(Duration::ZERO, Duration::ZERO)
    }

    async fn mock_admin_login(server: &mut mockito::ServerGuard) -> mockito::Mock {
        server
            .mock("POST", "/auth/login")
            .with_status(200)
            .with_body(json!({"data": {"access_token": "admin-token"}}).to_string())
            .create_async()
            .await
    }

    #[test]
    fn test_extract_uuid() {
        assert_eq!(extract_uuid(ID), Some(ID));
        assert_eq!(extract_uuid(&format!("entry-{}-x", ID)), Some(ID));
        assert_eq!(extract_uuid("invalid-uuid-123"), None);
    }

    #[tokio::test]
    async fn test_admin_token_is_cached_and_not_left_on_client() {
        let mut server = Server::new_async().await;
        let login = server
            .mock("POST", "/auth/login")
            .with_status(200)
            .with_body(json!({"data": {"access_token": "admin-token"}}).to_string())
            .expect(1)
            .create_async()
            .await;
        let search = server
            .mock("GET", "/whitelist-audit/")
            .match_header("authorization", "Bearer admin-token")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"data": []}).to_string())
            .expect(2)
            .create_async()
            .await;

        let settings = Settings::for_local(server.url());
        let client = ApiClient::new(&settings).unwrap();
        let mut users = manager(&client, &settings);

        let found = users
            .find_user_in_whitelist("a@test.com", "+8801700000000")
            .await
            .unwrap();

        assert!(found.is_none());
        login.assert_async().await;
        search.assert_async().await;
        assert!(client.auth_token().is_none());
    }

    #[tokio::test]
    async fn test_find_user_falls_back_to_phone() {
        let mut server = Server::new_async().await;
        mock_admin_login(&mut server).await;
        let by_email = server
            .mock("GET", "/whitelist-audit/")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("search".into(), "a@test.com".into()),
                Matcher::UrlEncoded("limit".into(), "10".into()),
            ]))
            .with_status(200)
            .with_body(json!({"data": [{"id": "other", "email": "b@test.com"}]}).to_string())
            .create_async()
            .await;
        let by_phone = server
            .mock("GET", "/whitelist-audit/")
            .match_query(Matcher::UrlEncoded("search".into(), "+8801712345678".into()))
            .with_status(200)
            .with_body(
                json!({"data": [{"id": ID, "phone": "+8801712345678", "status": "pending_approval"}]})
                    .to_string(),
            )
            .create_async()
            .await;

        let settings = Settings::for_local(server.url());
        let client = ApiClient::new(&settings).unwrap();
        let mut users = manager(&client, &settings);

        let found = users
            .find_user_in_whitelist("a@test.com", "+8801712345678")
            .await
            .unwrap();

        by_email.assert_async().await;
        by_phone.assert_async().await;
        assert_eq!(found.as_deref(), Some(ID));
    }

    #[tokio::test]
    async fn test_create_artisan_missing_from_whitelist() {
        let mut server = Server::new_async().await;
        mock_admin_login(&mut server).await;
        let register = server
            .mock("POST", "/auth/register")
            .match_body(Matcher::PartialJson(json!({
                "f_name": "Test",
                "l_name": "Artisan",
                "password": TEST_PASSWORD
            })))
            .with_status(201)
            .with_body(json!({"success": true, "message": "Register Successfully"}).to_string())
            .create_async()
            .await;
        // Email and phone lookups, each tried twice.
        let search = server
            .mock("GET", "/whitelist-audit/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"data": []}).to_string())
            .expect(4)
            .create_async()
            .await;
        let approve = server
            .mock("PATCH", "/whitelist-audit/")
            .expect(0)
            .create_async()
            .await;

        let settings = Settings::for_local(server.url());
        let client = ApiClient::new(&settings).unwrap();
        let mut users = manager(&client, &settings);

        let user = users.create_test_artisan(true).await.unwrap();

        register.assert_async().await;
        search.assert_async().await;
        approve.assert_async().await;
        assert!(user.id.is_none());
        assert!(!user.approved);
        assert_eq!(user.status, "pending_approval");
        assert!(user.email.starts_with("test_artisan_"));
        assert_eq!(users.created_users().len(), 1);
        assert_eq!(users.report().len(), 1);
    }

    #[tokio::test]
    async fn test_created_artisan_kept_when_admin_login_fails() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/register")
            .with_status(201)
            .with_body(json!({"success": true, "message": "Register Successfully"}).to_string())
            .create_async()
            .await;
        let login = server
            .mock("POST", "/auth/login")
            .with_status(401)
            .with_body(json!({"success": false, "message": "Invalid credentials"}).to_string())
            .create_async()
            .await;

        let settings = Settings::for_local(server.url());
        let client = ApiClient::new(&settings).unwrap();
        let mut users = manager(&client, &settings);

        let user = users.create_test_artisan(true).await.unwrap();

        login.assert_async().await;
        assert!(user.id.is_none());
        assert!(!user.approved);
        assert_eq!(users.created_users(), &[user.clone()]);
        assert!(users.report()[0].starts_with(&user.email));
    }

    #[tokio::test]
    async fn test_approve_marks_success() {
        let mut server = Server::new_async().await;
        mock_admin_login(&mut server).await;
        let approve = server
            .mock("PATCH", "/whitelist-audit/")
            .match_body(Matcher::Json(json!({
                "user_id": ID,
                "status": "approved",
                "reason": APPROVAL_REASON
            })))
            .with_status(200)
            .with_body(json!({"success": true, "data": {"status": "approved"}}).to_string())
            .create_async()
            .await;

        let settings = Settings::for_local(server.url());
        let client = ApiClient::new(&settings).unwrap();
        let mut users = manager(&client, &settings);

        assert!(users.approve_user_in_whitelist(ID).await.unwrap());
        approve.assert_async().await;
    }

    #[tokio::test]
    async fn test_registration_failure_is_precondition() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/auth/register")
            .with_status(422)
            .with_body(json!({"success": false, "message": "Validation failed"}).to_string())
            .create_async()
            .await;

        let settings = Settings::for_local(server.url());
        let client = ApiClient::new(&settings).unwrap();
        let mut users = manager(&client, &settings);

        let err = users.create_test_artisan(false).await.unwrap_err();
        assert!(err.is_skip());
        assert!(users.created_users().is_empty());
    }

    #[tokio::test]
    async fn test_set_status_extracts_uuid() {
        let mut server = Server::new_async().await;
        mock_admin_login(&mut server).await;
        let patch = server
            .mock("PATCH", "/whitelist-audit/")
            .match_body(Matcher::PartialJson(json!({"user_id": ID, "status": "rejected"})))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let settings = Settings::for_local(server.url());
        let client = ApiClient::new(&settings).unwrap();
        let mut users = manager(&client, &settings);
        client.set_auth_token("session");

        let response = users
            .set_whitelist_status(&format!("audit:{}", ID), "rejected", "Incomplete")
            .await
            .unwrap();

        patch.assert_async().await;
        assert_eq!(response.status, 200);
        assert_eq!(client.auth_token().as_deref(), Some("session"));
    }
}
