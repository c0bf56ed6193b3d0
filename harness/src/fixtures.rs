//! Credentials and tokens that cases and scenarios depend on.
//!
//! A fixture that cannot be satisfied yields `None`; callers turn that into a
//! skipped case rather than a failure.

use crate::error::{HarnessError, HarnessResult};
use client::{endpoints, ApiClient, ApiResponse, AuthOverride, Credentials, Method, RequestSpec, Settings};
use tracing::{info, warn};

/// Bearer token from a login response. The API has answered with the token
/// under several names over time.
pub fn extract_token(response: &ApiResponse) -> Option<String> {
    ["data.access_token", "data.token", "access_token", "token"]
        .iter()
        .find_map(|path| response.pointer(path).and_then(|v| v.as_str()))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Logs in without touching the client's session token.
pub async fn login(client: &ApiClient, credentials: &Credentials) -> HarnessResult<ApiResponse> {
    let spec = RequestSpec::new()
        .json(credentials.login_body())
        .auth(AuthOverride::Omit);
    Ok(client.request(Method::POST, endpoints::LOGIN, spec).await?)
}

/// Logs in and returns the access token, or why there is none.
pub async fn login_token(client: &ApiClient, credentials: &Credentials) -> HarnessResult<String> {
    let response = login(client, credentials).await?;
    if response.is_rate_limited() {
        return Err(HarnessError::precondition("Rate limited while logging in"));
    }
    if response.status != 200 {
        return Err(HarnessError::precondition(format!(
            "Login for {} returned {}: {}",
            credentials.masked_identifier(),
            response.status,
            response.preview(200)
        )));
    }
    extract_token(&response).ok_or_else(|| {
        HarnessError::precondition(format!(
            "Login for {} returned no token",
            credentials.masked_identifier()
        ))
    })
}

pub async fn admin_auth_token(client: &ApiClient, settings: &Settings) -> Option<String> {
    match login_token(client, &settings.admin).await {
        Ok(token) => {
            info!("Admin token obtained for {}", settings.admin.masked_identifier());
            Some(token)
        }
        Err(e) => {
            warn!("Admin token not available: {}", e);
            None
        }
    }
}

pub fn artisan_credentials(settings: &Settings) -> Option<&Credentials> {
    settings
        .artisan
        .as_ref()
        .filter(|c| !c.identifier.is_empty() && !c.password.is_empty())
}

pub async fn artisan_auth_token(client: &ApiClient, settings: &Settings) -> Option<String> {
    let Some(credentials) = artisan_credentials(settings) else {
        warn!("Artisan credentials not configured (ARTISAN_IDENTIFIER / ARTISAN_PASSWORD)");
        return None;
    };

    let response = match login(client, credentials).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Artisan login failed: {}", e);
            return None;
        }
    };
    if response.status != 200 {
        warn!(
            "Artisan login for {} returned {}: {}",
            credentials.masked_identifier(),
            response.status,
            response.preview(200)
        );
        return None;
    }

    let role = response
        .pointer("data.user.role")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    if !role.to_lowercase().contains("artisan") {
        warn!("Logged-in user role is '{}', expected an artisan", role);
    }

    let token = extract_token(&response);
    if token.is_none() {
        warn!("Artisan login returned no token");
    }
    token
}
