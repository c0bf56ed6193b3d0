use crate::error::{ClientError, ClientResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// One HTTP answer from the API, whatever its status.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub text: String,
    pub json: Option<Value>,
    pub elapsed: Duration,
    pub retry_after: Option<Duration>,
    /// Rate-limit retries spent before this answer was accepted.
    pub retries: u32,
}

impl ApiResponse {
    pub fn new(status: u16, text: impl Into<String>, elapsed: Duration) -> Self {
        let text = text.into();
        let json = if text.trim().is_empty() {
            None
        } else {
            serde_json::from_str(&text).ok()
        };
        Self {
            status,
            text,
            json,
            elapsed,
            retry_after: None,
            retries: 0,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    pub fn is_success_status(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }

    pub fn is_no_content(&self) -> bool {
        self.status == 204
    }

    /// Body is present but could not be parsed as JSON.
    pub fn is_invalid_json(&self) -> bool {
        self.json.is_none() && !self.text.trim().is_empty()
    }

    pub fn success(&self) -> Option<bool> {
        self.pointer("success").and_then(Value::as_bool)
    }

    pub fn message(&self) -> Option<&str> {
        self.pointer("message").and_then(Value::as_str)
    }

    pub fn data(&self) -> Option<&Value> {
        self.pointer("data")
    }

    pub fn errors(&self) -> Option<&Value> {
        self.pointer("errors")
    }

    pub fn meta(&self) -> Option<&Value> {
        self.pointer("meta")
    }

    /// `data` as a list; anything else reads as empty.
    pub fn data_list(&self) -> &[Value] {
        self.data()
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Pagination block from `meta.pagination`, or a top-level `pagination`.
    pub fn pagination(&self) -> Option<&Value> {
        self.pointer("meta.pagination")
            .or_else(|| self.pointer("pagination"))
    }

    /// Looks up a dotted path such as `data.user.id`. Numeric segments index
    /// into arrays.
    pub fn pointer(&self, path: &str) -> Option<&Value> {
        lookup(self.json.as_ref()?, path)
    }

    pub fn has_key(&self, path: &str) -> bool {
        self.pointer(path).is_some()
    }

    /// First `max_chars` characters of the body, for diagnostics.
    pub fn preview(&self, max_chars: usize) -> String {
        self.text.chars().take(max_chars).collect()
    }

    pub fn json_as<T: DeserializeOwned>(&self) -> ClientResult<T> {
        match &self.json {
            Some(json) => Ok(serde_json::from_value(json.clone())?),
            None => Err(ClientError::Unknown {
                message: format!("Response is not valid JSON: {}", self.preview(100)),
            }),
        }
    }

    pub fn login_data(&self) -> Option<LoginData> {
        self.data()
            .and_then(|data| serde_json::from_value(data.clone()).ok())
    }

    pub fn whitelist_entries(&self) -> Vec<WhitelistEntry> {
        self.data_list()
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect()
    }

    pub fn techniques(&self) -> Vec<Technique> {
        self.data_list()
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect()
    }

    pub fn pagination_info(&self) -> Option<Pagination> {
        self.pagination()
            .and_then(|p| serde_json::from_value(p.clone()).ok())
    }
}

/// Dotted-path lookup shared by responses and assertion helpers.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, key| match current {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// A count that the API sometimes sends as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Count {
    Number(i64),
    Text(String),
}

impl Count {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Count::Number(n) => Some(*n),
            Count::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: Count,
    pub limit: Count,
    pub total: Count,
    pub total_pages: Count,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserData {
    pub id: Option<String>,
    pub f_name: Option<String>,
    pub l_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub phone_verified: Option<bool>,
    pub email_verified: Option<bool>,
    pub mfa_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginData {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub refresh_expires_in: Option<i64>,
    pub token_type: Option<String>,
    #[serde(alias = "token")]
    pub fallback_token: Option<String>,
    pub user: Option<UserData>,
}

impl LoginData {
    /// `access_token`, falling back to `token`.
    pub fn token(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .or(self.fallback_token.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub f_name: Option<String>,
    pub l_name: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechniqueValue {
    pub language_code: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Technique {
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub parent_name: Option<String>,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub values: Vec<TechniqueValue>,
    #[serde(default)]
    pub children: Vec<Value>,
    pub created_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: Value) -> ApiResponse {
        ApiResponse::new(status, body.to_string(), Duration::from_millis(12))
    }

    #[test]
    fn test_envelope_accessors() {
        let resp = response(
            200,
            json!({
                "success": true,
                "message": "Login verification successful",
                "data": {"access_token": "abc", "user": {"id": "u1", "email": "admin"}}
            }),
        );

        assert_eq!(resp.success(), Some(true));
        assert_eq!(resp.message(), Some("Login verification successful"));
        assert!(resp.has_key("data.user.id"));
        assert!(!resp.has_key("data.user.phone"));
        assert_eq!(resp.pointer("data.user.email"), Some(&json!("admin")));
        assert!(resp.errors().is_none());
    }

    #[test]
    fn test_array_path_segments() {
        let resp = response(200, json!({"data": [{"id": "a"}, {"id": "b"}]}));
        assert_eq!(resp.pointer("data.1.id"), Some(&json!("b")));
        assert!(resp.pointer("data.5.id").is_none());
        assert_eq!(resp.data_list().len(), 2);
    }

    #[test]
    fn test_non_json_and_empty_bodies() {
        let resp = ApiResponse::new(502, "<html>Bad Gateway</html>", Duration::ZERO);
        assert!(resp.json.is_none());
        assert!(resp.is_invalid_json());
        assert!(resp.success().is_none());
        assert!(resp.json_as::<Value>().is_err());

        let resp = ApiResponse::new(204, "", Duration::ZERO);
        assert!(resp.is_no_content());
        assert!(!resp.is_invalid_json());
        assert!(resp.data_list().is_empty());
    }

    #[test]
    fn test_preview_is_char_safe() {
        let resp = ApiResponse::new(200, "ñandú ñandú", Duration::ZERO);
        assert_eq!(resp.preview(5), "ñandú");
    }

    #[test]
    fn test_login_data_token_fallback() {
        let resp = response(200, json!({"success": true, "data": {"token": "t-1"}}));
        let data = resp.login_data().unwrap();
        assert_eq!(data.token(), Some("t-1"));

        let resp = response(
            200,
            json!({"data": {"access_token": "a-1", "token_type": "Bearer", "expires_in": 900}}),
        );
        let data = resp.login_data().unwrap();
        assert_eq!(data.token(), Some("a-1"));
        assert_eq!(data.expires_in, Some(900));
    }

    #[test]
    fn test_pagination_accepts_string_counts() {
        let resp = response(
            200,
            json!({
                "data": [],
                "meta": {"pagination": {
                    "page": "2", "limit": 5, "total": "11", "total_pages": 3,
                    "has_next": true, "has_prev": true
                }}
            }),
        );
        let pagination = resp.pagination_info().unwrap();
        assert_eq!(pagination.page.as_i64(), Some(2));
        assert_eq!(pagination.total.as_i64(), Some(11));
        assert!(pagination.has_next);
    }

    #[test]
    fn test_typed_lists() {
        let resp = response(
            200,
            json!({"data": [
                {"id": "1", "email": "a@test.com", "status": "approved"},
                {"id": "2", "phone": "+8801700000000", "status": "pending_approval"}
            ]}),
        );
        let entries = resp.whitelist_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].phone.as_deref(), Some("+8801700000000"));

        let resp = response(
            200,
            json!({"data": [{"id": "t", "name": "Single", "is_active": true,
                   "values": [{"language_code": "en", "name": "Single"}]}]}),
        );
        let techniques = resp.techniques();
        assert_eq!(techniques[0].name, "Single");
        assert_eq!(techniques[0].values[0].language_code, "en");
    }
}
