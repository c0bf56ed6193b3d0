use crate::config::Settings;
use crate::endpoints;
use crate::error::{ClientError, ClientResult};
use crate::response::ApiResponse;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, RETRY_AFTER};
use reqwest::Method;
use serde_json::Value;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_JITTER: f64 = 0.1;

/// Which `Authorization` header a request carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthOverride {
    /// The client's bearer token, if one is set.
    #[default]
    Session,
    /// No `Authorization` header at all.
    Omit,
    /// This exact header value, bypassing the session token.
    Raw(String),
}

/// Everything about a request besides method and endpoint.
#[derive(Debug, Clone, Default)]
pub struct RequestSpec {
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub auth: AuthOverride,
    pub timeout: Option<Duration>,
}

impl RequestSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn auth(mut self, auth: AuthOverride) -> Self {
        self.auth = auth;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// HTTP client for the API with a minimum gap between consecutive requests.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    request_delay: Duration,
    max_retries: u32,
    rate_limit_max_wait: Duration,
    last_request: tokio::sync::Mutex<Option<Instant>>,
    auth_token: Mutex<Option<String>>,
}

impl ApiClient {
    pub fn new(settings: &Settings) -> ClientResult<Self> {
        settings
            .validate()
            .map_err(|message| ClientError::InvalidConfig { message })?;

        let mut headers = HeaderMap::new();
        for (name, value) in settings.default_headers() {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| ClientError::InvalidHeader {
                    name: name.to_string(),
                    message: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(&value).map_err(|e| ClientError::InvalidHeader {
                    name: name.to_string(),
                    message: e.to_string(),
                })?;
            headers.insert(header_name, header_value);
        }

        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Unknown {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            base_url: settings.base_url.clone(),
            request_delay: settings.request_delay,
            max_retries: settings.max_retries,
            rate_limit_max_wait: settings.rate_limit_max_wait,
            last_request: tokio::sync::Mutex::new(None),
            auth_token: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request_delay(&self) -> Duration {
        self.request_delay
    }

    pub fn url(&self, endpoint: &str) -> String {
        endpoints::join(&self.base_url, endpoint)
    }

    /// Sends `Authorization: Bearer <token>` on later requests.
    pub fn set_auth_token(&self, token: impl Into<String>) {
        *self.token_slot() = Some(token.into());
    }

    pub fn clear_auth_token(&self) {
        *self.token_slot() = None;
    }

    pub fn auth_token(&self) -> Option<String> {
        self.token_slot().clone()
    }

    fn token_slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.auth_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn get(&self, endpoint: &str) -> ClientResult<ApiResponse> {
        self.request(Method::GET, endpoint, RequestSpec::new()).await
    }

    pub async fn get_with_query(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> ClientResult<ApiResponse> {
        let spec = query
            .iter()
            .fold(RequestSpec::new(), |spec, (k, v)| spec.query(*k, *v));
        self.request(Method::GET, endpoint, spec).await
    }

    pub async fn post(&self, endpoint: &str, body: Value) -> ClientResult<ApiResponse> {
        self.request(Method::POST, endpoint, RequestSpec::new().json(body))
            .await
    }

    pub async fn put(&self, endpoint: &str, body: Value) -> ClientResult<ApiResponse> {
        self.request(Method::PUT, endpoint, RequestSpec::new().json(body))
            .await
    }

    pub async fn patch(&self, endpoint: &str, body: Value) -> ClientResult<ApiResponse> {
        self.request(Method::PATCH, endpoint, RequestSpec::new().json(body))
            .await
    }

    pub async fn delete(&self, endpoint: &str) -> ClientResult<ApiResponse> {
        self.request(Method::DELETE, endpoint, RequestSpec::new())
            .await
    }

    /// Sends one request, retrying on HTTP 429 up to the configured limit.
    /// Any other status, and a 429 once retries run out, is returned as is.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        spec: RequestSpec,
    ) -> ClientResult<ApiResponse> {
        let url = self.url(endpoint);
        let mut attempt = 0;

        loop {
            self.pace().await;
            let mut response = self.send_once(&method, &url, &spec).await?;
            response.retries = attempt;

            if !response.is_rate_limited() {
                return Ok(response);
            }
            if attempt >= self.max_retries {
                warn!(
                    "Rate limit persisted for {} {} after {} retries",
                    method, url, attempt
                );
                return Ok(response);
            }

            let wait = backoff_delay(attempt, response.retry_after, self.rate_limit_max_wait);
            warn!(
                "Rate limited on {} {}, retrying in {:.1}s ({}/{})",
                method,
                url,
                wait.as_secs_f64(),
                attempt + 1,
                self.max_retries
            );
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }

    /// Waits until `request_delay` has passed since this client's last send.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.request_delay {
                let wait = self.request_delay - elapsed;
                debug!("Pacing: sleeping {:.2}s before next request", wait.as_secs_f64());
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        spec: &RequestSpec,
    ) -> ClientResult<ApiResponse> {
        let mut builder = self.http.request(method.clone(), url);

        if !spec.query.is_empty() {
            builder = builder.query(&spec.query);
        }
        for (name, value) in &spec.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        match &spec.auth {
            AuthOverride::Session => {
                if let Some(token) = self.auth_token() {
                    builder = builder.bearer_auth(token);
                }
            }
            AuthOverride::Omit => {}
            AuthOverride::Raw(value) => {
                builder = builder.header(AUTHORIZATION, value.as_str());
            }
        }
        if let Some(body) = &spec.body {
            debug!("Request body: {}", mask_secrets(body));
            builder = builder.json(body);
        }
        if let Some(timeout) = spec.timeout {
            builder = builder.timeout(timeout);
        }

        info!("Request: {} {}", method, url);
        let start = Instant::now();

        let response = builder.send().await.map_err(|e| {
            error!("Request failed: {} {}: {}", method, url, e);
            ClientError::from_transport(e)
        })?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let text = response.text().await.map_err(ClientError::from_transport)?;
        let elapsed = start.elapsed();

        info!("Response: {} ({} ms)", status, elapsed.as_millis());

        Ok(ApiResponse::new(status, text, elapsed).with_retry_after(retry_after))
    }
}

fn parse_retry_after(value: &str) -> Option<Duration> {
    let seconds: f64 = value.trim().parse().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}

/// Wait before rate-limit retry number `attempt` (zero based). A server
/// `Retry-After` wins over exponential backoff; either is capped at `max_wait`.
pub(crate) fn backoff_delay(
    attempt: u32,
    retry_after: Option<Duration>,
    max_wait: Duration,
) -> Duration {
    let delay = match retry_after {
        Some(delay) => delay,
        None => {
            let exponential = BACKOFF_BASE.saturating_mul(2_u32.saturating_pow(attempt));
            let jitter = rand::thread_rng().gen_range(0.0..=BACKOFF_JITTER);
            exponential + exponential.mul_f64(jitter)
        }
    };
    delay.min(max_wait)
}

/// Copy of `value` with every `password` field replaced by a mask.
pub fn mask_secrets(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, v)| {
                    let masked = if key.to_lowercase().contains("password") {
                        Value::String("********".to_string())
                    } else {
                        mask_secrets(v)
                    };
                    (key.clone(), masked)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(mask_secrets).collect()),
        other => other.clone(),
    }
}
