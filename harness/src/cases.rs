//! Declarative test-case tables.
//!
//! Each [`ApiCase`] describes one request and what the response must look
//! like. Tables are plain functions returning `Vec<ApiCase>` so payloads that
//! need fresh emails or phone numbers are generated per run.

use client::Method;
use serde_json::Value;
use std::collections::HashMap;

mod auth;
mod checks;
mod products;
mod techniques;
mod whitelist;

pub use auth::{artisan_login_cases, login_cases, logout_cases, registration_cases};
pub use checks::{Check, CheckContext};
pub use products::{product_cases, product_with, valid_product_payload, without_field};
pub use techniques::{technique, techniques_add_cases, techniques_get_cases, unique_technique_name};
pub use whitelist::{whitelist_approval_cases, whitelist_cases};

pub type PayloadFactory = fn() -> Value;

/// Values substituted into `{name}` markers in payloads, query values and
/// endpoints.
pub type Placeholders = HashMap<String, String>;

#[derive(Clone)]
pub enum Payload {
    None,
    Static(Value),
    Factory(PayloadFactory),
}

impl Payload {
    pub fn resolve(&self) -> Option<Value> {
        match self {
            Payload::None => None,
            Payload::Static(value) => Some(value.clone()),
            Payload::Factory(factory) => Some(factory()),
        }
    }
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::None => write!(f, "None"),
            Payload::Static(value) => write!(f, "Static({})", value),
            Payload::Factory(_) => write!(f, "Factory(..)"),
        }
    }
}

/// Whose credentials go in the `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    Admin,
    Artisan,
    None,
    /// Sent verbatim, for malformed-header cases.
    Raw(String),
    /// Log in with the test user first and use that token.
    Fresh,
}

#[derive(Debug, Clone)]
pub struct RequestTemplate {
    pub method: Method,
    pub endpoint: String,
    pub payload: Payload,
    pub query: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct Expected {
    pub statuses: Vec<u16>,
    pub success: Option<bool>,
    pub message: Option<&'static str>,
    /// A message mismatch fails the case instead of warning.
    pub strict_message: bool,
}

impl Expected {
    pub fn accepts(&self, status: u16) -> bool {
        self.statuses.contains(&status)
    }

    pub fn primary_status(&self) -> Option<u16> {
        self.statuses.first().copied()
    }
}

#[derive(Debug, Clone)]
pub struct ApiCase {
    pub id: &'static str,
    pub description: &'static str,
    pub tags: Vec<&'static str>,
    pub skip: Option<&'static str>,
    pub auth: AuthMode,
    pub request: RequestTemplate,
    pub expected: Expected,
    pub checks: Vec<Check>,
}

impl ApiCase {
    pub fn new(id: &'static str, description: &'static str, method: Method, endpoint: &str) -> Self {
        Self {
            id,
            description,
            tags: Vec::new(),
            skip: None,
            auth: AuthMode::None,
            request: RequestTemplate {
                method,
                endpoint: endpoint.to_string(),
                payload: Payload::None,
                query: Vec::new(),
            },
            expected: Expected::default(),
            checks: Vec::new(),
        }
    }

    pub fn get(id: &'static str, description: &'static str, endpoint: &str) -> Self {
        Self::new(id, description, Method::GET, endpoint)
    }

    pub fn post(id: &'static str, description: &'static str, endpoint: &str) -> Self {
        Self::new(id, description, Method::POST, endpoint)
    }

    pub fn patch(id: &'static str, description: &'static str, endpoint: &str) -> Self {
        Self::new(id, description, Method::PATCH, endpoint)
    }

    pub fn tags(mut self, tags: &[&'static str]) -> Self {
        self.tags.extend_from_slice(tags);
        self
    }

    pub fn skip(mut self, reason: &'static str) -> Self {
        self.skip = Some(reason);
        self
    }

    pub fn auth(mut self, auth: AuthMode) -> Self {
        self.auth = auth;
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.request.payload = Payload::Static(body);
        self
    }

    pub fn factory(mut self, factory: PayloadFactory) -> Self {
        self.request.payload = Payload::Factory(factory);
        self
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.request.query.push((key.to_string(), value.into()));
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.expected.statuses = vec![status];
        self
    }

    /// Accept another status code besides the primary one.
    pub fn or_status(mut self, status: u16) -> Self {
        self.expected.statuses.push(status);
        self
    }

    pub fn success(mut self, success: bool) -> Self {
        self.expected.success = Some(success);
        self
    }

    pub fn message(mut self, message: &'static str) -> Self {
        self.expected.message = Some(message);
        self
    }

    pub fn strict(mut self) -> Self {
        self.expected.strict_message = true;
        self
    }

    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

pub fn by_tag<'a>(cases: &'a [ApiCase], tag: &str) -> Vec<&'a ApiCase> {
    cases.iter().filter(|c| c.has_tag(tag)).collect()
}

pub fn runnable(cases: &[ApiCase]) -> Vec<&ApiCase> {
    cases.iter().filter(|c| c.skip.is_none()).collect()
}

pub fn find<'a>(cases: &'a [ApiCase], id: &str) -> Option<&'a ApiCase> {
    cases.iter().find(|c| c.id.eq_ignore_ascii_case(id))
}

/// Replaces `{name}` markers. Returns the first name with no value.
pub fn substitute_str(text: &str, placeholders: &Placeholders) -> Result<String, String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) if is_placeholder_name(&after[..end]) => {
                let name = &after[..end];
                let value = placeholders
                    .get(name)
                    .ok_or_else(|| name.to_string())?;
                out.push_str(value);
                rest = &after[end + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

pub fn substitute(value: &Value, placeholders: &Placeholders) -> Result<Value, String> {
    Ok(match value {
        Value::String(text) => Value::String(substitute_str(text, placeholders)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| substitute(item, placeholders))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                out.insert(key.clone(), substitute(item, placeholders)?);
            }
            Value::Object(out)
        }
        other => other.clone(),
    })
}

/// Suffix that keeps generated technique names apart between runs.
pub(crate) fn short_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}
