//! Reusable checks over [`ApiResponse`] values.
//!
//! Every helper returns `Err(AssertionError)` with a message that includes
//! enough of the response to diagnose the failure.

use crate::error::{AssertResult, AssertionError};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use client::{lookup, ApiResponse};
use serde_json::Value;
use std::time::Duration;

const PREVIEW_CHARS: usize = 500;
const MIN_TOKEN_LEN: usize = 50;

pub(crate) fn ensure(condition: bool, message: impl FnOnce() -> String) -> AssertResult {
    if condition {
        Ok(())
    } else {
        Err(AssertionError::new(message()))
    }
}

fn json_body(response: &ApiResponse) -> Result<&Value, AssertionError> {
    response.json.as_ref().ok_or_else(|| {
        AssertionError::new(format!(
            "Response is not valid JSON: {}",
            response.preview(PREVIEW_CHARS)
        ))
    })
}

pub fn assert_status_code(response: &ApiResponse, expected: u16) -> AssertResult {
    ensure(response.status == expected, || {
        format!(
            "Expected status code {}, got {}.\nResponse: {}",
            expected,
            response.status,
            response.preview(PREVIEW_CHARS)
        )
    })
}

/// Checks a dotted path such as `data.user.id` resolves in the body.
pub fn assert_json_key_exists(response: &ApiResponse, path: &str) -> AssertResult {
    let body = json_body(response)?;
    ensure(lookup(body, path).is_some(), || {
        format!("Key '{}' not found in response", path)
    })
}

pub fn assert_json_value(response: &ApiResponse, path: &str, expected: &Value) -> AssertResult {
    let body = json_body(response)?;
    let actual = lookup(body, path)
        .ok_or_else(|| AssertionError::new(format!("Key '{}' not found in response", path)))?;
    ensure(actual == expected, || {
        format!("Expected {}={}, got {}", path, expected, actual)
    })
}

pub fn assert_response_contains(response: &ApiResponse, text: &str) -> AssertResult {
    ensure(response.text.contains(text), || {
        format!("Expected text '{}' not found in response", text)
    })
}

pub fn assert_response_time(response: &ApiResponse, max: Duration) -> AssertResult {
    ensure(response.elapsed <= max, || {
        format!(
            "Response time {:.2}s exceeds limit {:.1}s",
            response.elapsed.as_secs_f64(),
            max.as_secs_f64()
        )
    })
}

/// `expected` must be a substring of the `message` field, or of the raw body
/// when the body is not JSON.
pub fn assert_error_message(response: &ApiResponse, expected: &str) -> AssertResult {
    match &response.json {
        Some(_) => {
            let actual = response.message().unwrap_or_default();
            ensure(actual.contains(expected), || {
                format!(
                    "Expected error message containing '{}', got '{}'",
                    expected, actual
                )
            })
        }
        None => ensure(response.text.contains(expected), || {
            format!("Expected error message '{}' not found in response", expected)
        }),
    }
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, String> {
    URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| e.to_string())
}

/// Shape check for a JWT: three base64url segments, the first two JSON objects.
pub fn assert_token_structure(token: &str) -> AssertResult {
    ensure(!token.is_empty(), || "Token should not be empty".to_string())?;
    ensure(token.len() > MIN_TOKEN_LEN, || {
        format!("Token seems too short: {} chars", token.len())
    })?;

    let parts: Vec<&str> = token.split('.').collect();
    ensure(parts.len() == 3, || {
        format!("JWT token should have 3 parts, got {}", parts.len())
    })?;

    for (name, segment) in ["header", "payload"].iter().zip(&parts) {
        let bytes = decode_segment(segment).map_err(|e| {
            AssertionError::new(format!("Invalid JWT token structure: {} {}", name, e))
        })?;
        let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
            AssertionError::new(format!("Invalid JWT token structure: {} {}", name, e))
        })?;
        ensure(value.is_object(), || {
            format!("Invalid JWT token structure: {} is not a JSON object", name)
        })?;
    }

    ensure(!parts[2].is_empty(), || {
        "Invalid JWT token structure: empty signature".to_string()
    })?;
    decode_segment(parts[2])
        .map(|_| ())
        .map_err(|e| AssertionError::new(format!("Invalid JWT token structure: signature {}", e)))
}

pub fn assert_user_data(user: &Value) -> AssertResult {
    for field in ["id", "f_name", "l_name", "email"] {
        match user.get(field) {
            None => {
                return Err(AssertionError::new(format!(
                    "User data missing required field: {}",
                    field
                )))
            }
            Some(Value::Null) => {
                return Err(AssertionError::new(format!(
                    "User.{} should not be null",
                    field
                )))
            }
            Some(_) => {}
        }
    }

    let id = user.get("id").and_then(Value::as_str).unwrap_or_default();
    ensure(uuid::Uuid::parse_str(id).is_ok(), || {
        format!("User ID should be valid UUID, got: {}", user["id"])
    })?;
    ensure(user.get("email").is_some_and(Value::is_string), || {
        format!("Email should be string, got {}", user["email"])
    })
}

pub fn assert_success_response(response: &ApiResponse) -> AssertResult {
    ensure(matches!(response.status, 200 | 204), || {
        format!(
            "Expected status code 200 or 204, got {}.\nResponse: {}",
            response.status,
            response.preview(PREVIEW_CHARS)
        )
    })?;
    if response.status == 200 {
        json_body(response)?;
        ensure(response.success() == Some(true), || {
            format!("Response success should be true, got {:?}", response.success())
        })?;
        ensure(response.has_key("message"), || {
            "Response should have message field".to_string()
        })?;
        ensure(response.has_key("data"), || {
            "Response should have data field".to_string()
        })?;
    }
    Ok(())
}

pub fn assert_validation_error(response: &ApiResponse) -> AssertResult {
    assert_status_code(response, 422)?;
    json_body(response)?;
    ensure(response.success() == Some(false), || {
        "Validation error should have success=false".to_string()
    })?;
    ensure(
        response.has_key("errors") || response.has_key("error"),
        || "Validation error should have errors or error field".to_string(),
    )
}

pub fn assert_unauthorized(response: &ApiResponse) -> AssertResult {
    assert_status_code(response, 401)?;
    json_body(response)?;
    ensure(response.success() == Some(false), || {
        "Unauthorized response should have success=false".to_string()
    })
}

fn is_count(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.is_u64(),
        Value::String(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

/// Pagination block under `meta.pagination` (or top-level `pagination`).
pub fn assert_pagination(response: &ApiResponse) -> AssertResult {
    let pagination = response
        .pagination()
        .ok_or_else(|| AssertionError::new("Response missing pagination block"))?;

    for field in ["page", "limit", "total", "total_pages"] {
        let value = pagination.get(field).ok_or_else(|| {
            AssertionError::new(format!("Pagination missing field: {}", field))
        })?;
        ensure(is_count(value), || {
            format!("Pagination.{} should be an integer, got {}", field, value)
        })?;
    }
    for field in ["has_next", "has_prev"] {
        let value = pagination.get(field).ok_or_else(|| {
            AssertionError::new(format!("Pagination missing field: {}", field))
        })?;
        ensure(value.is_boolean(), || {
            format!("Pagination.{} should be a boolean, got {}", field, value)
        })?;
    }
    Ok(())
}
