use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::error::{ClientError, ClientResult};
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "https://api.uat.teresaapp.com/api/v1";

/// Credentials for one account used by the suites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub identifier: String,
    pub password: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            password: password.into(),
        }
    }

    /// Login body accepted by `POST /auth/login`.
    pub fn login_body(&self) -> serde_json::Value {
        serde_json::json!({
            "identifier": self.identifier,
            "password": self.password,
        })
    }

    /// First four characters of the identifier followed by a mask.
    pub fn masked_identifier(&self) -> String {
        let visible: String = self.identifier.chars().take(4).collect();
        format!("{}****", visible)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub environment: String,
    pub request_delay: Duration,
    pub request_timeout: Duration,
    pub test_delay: Duration,
    pub max_retries: u32,
    pub rate_limit_max_wait: Duration,
    pub test_user: Credentials,
    pub admin: Credentials,
    pub artisan: Option<Credentials>,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let test_user = Credentials::new("admin", "admin123");
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            environment: "UAT".to_string(),
            request_delay: Duration::from_secs(3),
            request_timeout: Duration::from_secs(15),
            test_delay: Duration::from_millis(300),
            max_retries: 2,
            rate_limit_max_wait: Duration::from_secs(60),
            admin: test_user.clone(),
            test_user,
            artisan: None,
            log_level: "info".to_string(),
            log_file: Some(PathBuf::from("api_tests_uat.log")),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through an arbitrary key lookup. Unset or blank keys
    /// keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut settings = Self::default();

        if let Some(base_url) = get("BASE_URL") {
            settings.base_url = base_url;
        }
        if let Some(environment) = get("ENVIRONMENT") {
            settings.environment = environment.to_uppercase();
        }
        if let Some(value) = get("REQUEST_DELAY") {
            settings.request_delay = parse_seconds("REQUEST_DELAY", &value)?;
        }
        if let Some(value) = get("REQUEST_TIMEOUT") {
            settings.request_timeout = parse_seconds("REQUEST_TIMEOUT", &value)?;
        }
        if let Some(value) = get("TEST_DELAY") {
            settings.test_delay = parse_seconds("TEST_DELAY", &value)?;
        }
        if let Some(value) = get("MAX_RETRIES") {
            settings.max_retries = value
                .parse()
                .map_err(|_| format!("MAX_RETRIES must be a non-negative integer, got '{}'", value))?;
        }
        if let Some(value) = get("RATE_LIMIT_MAX_WAIT") {
            settings.rate_limit_max_wait = parse_seconds("RATE_LIMIT_MAX_WAIT", &value)?;
        }

        let test_identifier = get("TEST_USER_IDENTIFIER").unwrap_or(settings.test_user.identifier);
        let test_password = get("TEST_USER_PASSWORD").unwrap_or(settings.test_user.password);
        settings.admin = Credentials::new(
            get("ADMIN_EMAIL").unwrap_or_else(|| test_identifier.clone()),
            get("ADMIN_PASSWORD").unwrap_or_else(|| test_password.clone()),
        );
        settings.test_user = Credentials::new(test_identifier, test_password);

        let artisan_identifier = get("ARTISAN_IDENTIFIER")
            .or_else(|| get("ARTISAN_PHONE"))
            .or_else(|| get("ARTISAN_EMAIL"));
        settings.artisan = match (artisan_identifier, get("ARTISAN_PASSWORD")) {
            (Some(identifier), Some(password)) => Some(Credentials::new(identifier, password)),
            _ => None,
        };

        if let Some(level) = get("LOG_LEVEL") {
            settings.log_level = level.to_lowercase();
        }
        settings.log_file = match lookup("LOG_FILE") {
            Some(path) if path.trim().is_empty() => None,
            Some(path) => Some(PathBuf::from(path.trim())),
            None => Some(PathBuf::from(format!(
                "api_tests_{}.log",
                settings.environment.to_lowercase()
            ))),
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into().to_uppercase();
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_test_delay(mut self, delay: Duration) -> Self {
        self.test_delay = delay;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_rate_limit_max_wait(mut self, wait: Duration) -> Self {
        self.rate_limit_max_wait = wait;
        self
    }

    pub fn with_test_user(mut self, credentials: Credentials) -> Self {
        self.test_user = credentials;
        self
    }

    pub fn with_admin_credentials(mut self, credentials: Credentials) -> Self {
        self.admin = credentials;
        self
    }

    pub fn with_artisan_credentials(mut self, credentials: Credentials) -> Self {
        self.artisan = Some(credentials);
        self
    }

    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn without_log_file(mut self) -> Self {
        self.log_file = None;
        self
    }

    /// Settings suited to a local mock server: no pacing, no retries.
    pub fn for_local(base_url: impl Into<String>) -> Self {
        Self::default()
            .with_base_url(base_url)
            .with_environment("local")
            .with_request_delay(Duration::ZERO)
            .with_test_delay(Duration::ZERO)
            .with_max_retries(0)
            .without_log_file()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("Base URL cannot be empty".to_string());
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("Base URL must start with http:// or https://".to_string());
        }

        if self.environment.is_empty() {
            return Err("Environment cannot be empty".to_string());
        }

        if self.request_timeout.is_zero() {
            return Err("Request timeout must be greater than 0".to_string());
        }

        if self.rate_limit_max_wait.is_zero() {
            return Err("Rate limit wait must be greater than 0".to_string());
        }

        if self.admin.identifier.is_empty() {
            return Err("Admin identifier cannot be empty".to_string());
        }

        Ok(())
    }

    /// Headers attached to every request of a client built from these settings.
    pub fn default_headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Content-Type", "application/json".to_string()),
            ("Accept", "application/json".to_string()),
            (
                "User-Agent",
                format!("Teresa-UAT-Test-Automation/1.0 ({})", self.environment),
            ),
            ("X-Environment", self.environment.clone()),
            ("X-Request-Source", "automation-tests".to_string()),
        ]
    }

    /// One line per setting with passwords masked.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = vec![
            format!("BASE_URL: {}", self.base_url),
            format!("ENVIRONMENT: {}", self.environment),
            format!("REQUEST_DELAY: {:.1}s", self.request_delay.as_secs_f64()),
            format!("REQUEST_TIMEOUT: {}s", self.request_timeout.as_secs()),
            format!("TEST_DELAY: {:.1}s", self.test_delay.as_secs_f64()),
            format!("MAX_RETRIES: {}", self.max_retries),
            format!("RATE_LIMIT_MAX_WAIT: {}s", self.rate_limit_max_wait.as_secs()),
            format!("TEST_USER: {}", self.test_user.identifier),
            format!("ADMIN: {} / ********", self.admin.identifier),
        ];
        match &self.artisan {
            Some(artisan) => lines.push(format!("ARTISAN: {}", artisan.masked_identifier())),
            None => lines.push("ARTISAN: not configured".to_string()),
        }
        lines.push(format!("LOG_LEVEL: {}", self.log_level));
        lines.push(format!(
            "LOG_FILE: {}",
            self.log_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "disabled".to_string())
        ));
        lines
    }
}

fn parse_seconds(key: &str, value: &str) -> Result<Duration, String> {
    let seconds: f64 = value
        .parse()
        .map_err(|_| format!("{} must be a number of seconds, got '{}'", key, value))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!("{} must be a non-negative number, got '{}'", key, value));
    }
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| format!("{} is out of range, got '{}'", key, value))
}

/// Loads a dotenv file into the process environment, overriding existing
/// values. Returns the number of variables set; malformed lines are skipped.
pub fn load_dotenv(path: impl AsRef<Path>) -> ClientResult<usize> {
    let path = path.as_ref();
    let entries = dotenv::from_path_iter(path).map_err(|e| ClientError::InvalidConfig {
        message: format!("could not load {}: {}", path.display(), e),
    })?;

    let mut loaded = 0;
    for entry in entries {
        match entry {
            Ok((key, value)) => {
                std::env::set_var(key, value);
                loaded += 1;
            }
            Err(e) => warn!("Skipping line in {}: {}", path.display(), e),
        }
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.environment, "UAT");
        assert_eq!(settings.request_delay, Duration::from_secs(3));
        assert_eq!(settings.request_timeout, Duration::from_secs(15));
        assert_eq!(settings.max_retries, 2);
        assert_eq!(settings.admin, settings.test_user);
        assert!(settings.artisan.is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_builder() {
        let settings = Settings::new()
            .with_base_url("http://localhost:8080/api/v1")
            .with_environment("staging")
            .with_request_delay(Duration::from_millis(500))
            .with_timeout(Duration::from_secs(5))
            .with_admin_credentials(Credentials::new("root", "secret"));

        assert_eq!(settings.base_url, "http://localhost:8080/api/v1");
        assert_eq!(settings.environment, "STAGING");
        assert_eq!(settings.request_delay, Duration::from_millis(500));
        assert_eq!(settings.request_timeout, Duration::from_secs(5));
        assert_eq!(settings.admin.identifier, "root");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = Settings::default();

        settings.base_url = "".to_string();
        assert!(settings.validate().is_err());

        settings.base_url = "api.uat.teresaapp.com".to_string();
        assert!(settings.validate().is_err());

        settings.base_url = DEFAULT_BASE_URL.to_string();
        settings.request_timeout = Duration::ZERO;
        assert!(settings.validate().is_err());

        settings.request_timeout = Duration::from_secs(15);
        settings.rate_limit_max_wait = Duration::ZERO;
        assert!(settings.validate().is_err());

        settings.rate_limit_max_wait = Duration::from_secs(60);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_reads_values() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("BASE_URL", "http://127.0.0.1:9000/api/v1"),
            ("ENVIRONMENT", "qa"),
            ("REQUEST_DELAY", "0.5"),
            ("REQUEST_TIMEOUT", "20"),
            ("MAX_RETRIES", "4"),
            ("TEST_USER_IDENTIFIER", "tester"),
            ("TEST_USER_PASSWORD", "pw"),
            ("ARTISAN_PHONE", "+923001234567"),
            ("ARTISAN_PASSWORD", "artisan-pw"),
            ("LOG_LEVEL", "DEBUG"),
        ]))
        .unwrap();

        assert_eq!(settings.base_url, "http://127.0.0.1:9000/api/v1");
        assert_eq!(settings.environment, "QA");
        assert_eq!(settings.request_delay, Duration::from_millis(500));
        assert_eq!(settings.request_timeout, Duration::from_secs(20));
        assert_eq!(settings.max_retries, 4);
        assert_eq!(settings.test_user, Credentials::new("tester", "pw"));
        assert_eq!(settings.admin, Credentials::new("tester", "pw"));
        assert_eq!(
            settings.artisan,
            Some(Credentials::new("+923001234567", "artisan-pw"))
        );
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.log_file, Some(PathBuf::from("api_tests_qa.log")));
    }

    #[test]
    fn test_from_lookup_admin_overrides_test_user() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("ADMIN_EMAIL", "ops@teresa.test"),
            ("ADMIN_PASSWORD", "ops-pw"),
        ]))
        .unwrap();
        assert_eq!(settings.test_user, Credentials::new("admin", "admin123"));
        assert_eq!(settings.admin, Credentials::new("ops@teresa.test", "ops-pw"));
    }

    #[test]
    fn test_from_lookup_rejects_bad_numbers() {
        assert!(Settings::from_lookup(lookup_from(&[("REQUEST_DELAY", "soon")])).is_err());
        assert!(Settings::from_lookup(lookup_from(&[("REQUEST_TIMEOUT", "-1")])).is_err());
        assert!(Settings::from_lookup(lookup_from(&[("MAX_RETRIES", "2.5")])).is_err());
        assert!(Settings::from_lookup(lookup_from(&[("BASE_URL", "ftp://x")])).is_err());
    }

    #[test]
    fn test_from_lookup_rejects_huge_delays() {
        let err = Settings::from_lookup(lookup_from(&[("REQUEST_DELAY", "1e20")])).unwrap_err();
        assert!(err.contains("out of range"));
        assert!(Settings::from_lookup(lookup_from(&[("RATE_LIMIT_MAX_WAIT", "1e300")])).is_err());
    }

    #[test]
    fn test_artisan_requires_both_values() {
        let settings =
            Settings::from_lookup(lookup_from(&[("ARTISAN_IDENTIFIER", "+923001234567")]))
                .unwrap();
        assert!(settings.artisan.is_none());
    }

    #[test]
    fn test_blank_log_file_disables_file_logging() {
        let settings = Settings::from_lookup(lookup_from(&[("LOG_FILE", "  ")])).unwrap();
        assert!(settings.log_file.is_none());
    }

    #[test]
    fn test_default_headers() {
        let settings = Settings::default().with_environment("uat");
        let headers = settings.default_headers();
        assert!(headers.contains(&("Accept", "application/json".to_string())));
        assert!(headers.contains(&(
            "User-Agent",
            "Teresa-UAT-Test-Automation/1.0 (UAT)".to_string()
        )));
        assert!(headers.contains(&("X-Request-Source", "automation-tests".to_string())));
    }

    #[test]
    fn test_summary_masks_passwords() {
        let settings = Settings::default()
            .with_artisan_credentials(Credentials::new("+923231348372", "hunter2"));
        let summary = settings.summary().join("\n");
        assert!(!summary.contains("admin123"));
        assert!(!summary.contains("hunter2"));
        assert!(summary.contains("+923****"));
    }

    #[test]
    #[serial_test::serial]
    fn test_load_dotenv_then_from_env() {
        let path = std::env::temp_dir().join(format!("uat-settings-{}.env", std::process::id()));
        std::fs::write(&path, "ENVIRONMENT=dotenv\nREQUEST_DELAY=1.5\n").unwrap();

        assert_eq!(load_dotenv(&path).unwrap(), 2);
        let settings = Settings::from_env();

        std::env::remove_var("ENVIRONMENT");
        std::env::remove_var("REQUEST_DELAY");
        std::fs::remove_file(&path).unwrap();

        let settings = settings.unwrap();
        assert_eq!(settings.environment, "DOTENV");
        assert_eq!(settings.request_delay, Duration::from_millis(1500));
    }

    #[test]
    #[serial_test::serial]
    fn test_load_dotenv_overrides_and_unquotes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "# comment\nUAT_DOTENV_URL=http://localhost:3000\n\nexport UAT_DOTENV_SECRET=\"p w\"\nUAT_DOTENV_LEVEL='debug'\n",
        )
        .unwrap();
        std::env::set_var("UAT_DOTENV_LEVEL", "info");

        let loaded = load_dotenv(&path).unwrap();
        let url = std::env::var("UAT_DOTENV_URL");
        let secret = std::env::var("UAT_DOTENV_SECRET");
        let level = std::env::var("UAT_DOTENV_LEVEL");
        for key in ["UAT_DOTENV_URL", "UAT_DOTENV_SECRET", "UAT_DOTENV_LEVEL"] {
            std::env::remove_var(key);
        }

        assert_eq!(loaded, 3);
        assert_eq!(url.unwrap(), "http://localhost:3000");
        assert_eq!(secret.unwrap(), "p w");
        assert_eq!(level.unwrap(), "debug");
    }

    #[test]
    fn test_load_dotenv_missing_file() {
        let err = load_dotenv("/nonexistent/path/.env").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/path/.env"));
    }

    #[test]
    fn test_serialization() {
        let settings = Settings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let deserialized: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings.base_url, deserialized.base_url);
        assert_eq!(settings.request_delay, deserialized.request_delay);
    }
}
