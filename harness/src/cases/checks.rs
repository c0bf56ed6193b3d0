use crate::assertions::{
    assert_json_key_exists, assert_pagination, assert_response_time, assert_token_structure,
    assert_user_data, ensure,
};
use crate::error::{AssertResult, AssertionError};
use crate::search::classify_search;
use client::{lookup, ApiResponse};
use serde_json::Value;
use std::time::Duration;

/// What a check can see: the response plus what was sent.
pub struct CheckContext<'a> {
    pub response: &'a ApiResponse,
    pub body: Option<&'a Value>,
    pub query: &'a [(String, String)],
}

impl<'a> CheckContext<'a> {
    pub fn new(response: &'a ApiResponse) -> Self {
        Self {
            response,
            body: None,
            query: &[],
        }
    }

    pub fn with_body(mut self, body: Option<&'a Value>) -> Self {
        self.body = body;
        self
    }

    pub fn with_query(mut self, query: &'a [(String, String)]) -> Self {
        self.query = query;
        self
    }

    fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    TopLevelFields(&'static [&'static str]),
    /// Fields on `data`, or on every item when `data` is a list.
    DataFields(&'static [&'static str]),
    /// Fields on `data.user`, falling back to `data`.
    UserFields(&'static [&'static str]),
    TokenPair,
    UserData,
    /// At least one of the names is mentioned in `errors`.
    ErrorFields(&'static [&'static str]),
    ErrorDetails,
    CreatedCount(usize),
    DataCount(usize),
    MaxDataCount(usize),
    MinDataCount(usize),
    Pagination,
    Sorted {
        field: &'static str,
        descending: bool,
    },
    /// Returned names honour the `search` query parameter.
    SearchFilter,
    /// Every returned item has `is_active == false`.
    InactiveFlag,
    /// Every technique carries id, name, is_active and named values.
    TechniqueShape,
    /// Response path equals the request body path.
    Echo {
        response: &'static str,
        request: &'static str,
    },
    ResponseTime(Duration),
    /// A failure is reported as a warning.
    Soft(Box<Check>),
}

impl Check {
    pub fn soft(self) -> Check {
        match self {
            Check::Soft(_) => self,
            other => Check::Soft(Box::new(other)),
        }
    }

    pub fn is_soft(&self) -> bool {
        matches!(self, Check::Soft(_))
    }

    pub fn evaluate(&self, ctx: &CheckContext<'_>) -> AssertResult {
        let response = ctx.response;
        match self {
            Check::Soft(inner) => inner.evaluate(ctx),
            Check::TopLevelFields(fields) => {
                for field in fields.iter() {
                    assert_json_key_exists(response, field)?;
                }
                Ok(())
            }
            Check::DataFields(fields) => {
                let data = response
                    .data()
                    .ok_or_else(|| AssertionError::new("Response has no data"))?;
                match data {
                    Value::Array(items) => {
                        for item in items {
                            require_fields(item, fields, "data item")?;
                        }
                        Ok(())
                    }
                    other => require_fields(other, fields, "data"),
                }
            }
            Check::UserFields(fields) => {
                let user = response
                    .pointer("data.user")
                    .or_else(|| response.data())
                    .ok_or_else(|| AssertionError::new("Response has no user data"))?;
                require_fields(user, fields, "user")
            }
            Check::TokenPair => check_token_pair(response),
            Check::UserData => {
                let user = response
                    .pointer("data.user")
                    .ok_or_else(|| AssertionError::new("Response missing data.user"))?;
                assert_user_data(user)
            }
            Check::ErrorFields(fields) => {
                let errors = error_block(response)?;
                let text = errors.to_string().to_lowercase();
                ensure(
                    fields.iter().any(|f| text.contains(&f.to_lowercase())),
                    || format!("Expected errors for one of {:?}, got {}", fields, errors),
                )
            }
            Check::ErrorDetails => {
                let errors = error_block(response)?;
                ensure(!is_empty(errors), || "Error details are empty".to_string())
            }
            Check::CreatedCount(expected) => {
                let created = response.data_list().len();
                ensure(created == *expected, || {
                    format!("Expected {} created items, got {}", expected, created)
                })
            }
            Check::DataCount(expected) => {
                let count = response.data_list().len();
                ensure(count == *expected, || {
                    format!("Expected {} items, got {}", expected, count)
                })
            }
            Check::MaxDataCount(max) => {
                let count = response.data_list().len();
                ensure(count <= *max, || {
                    format!("Expected at most {} items, got {}", max, count)
                })
            }
            Check::MinDataCount(min) => {
                let count = response.data_list().len();
                ensure(count >= *min, || {
                    format!("Expected at least {} items, got {}", min, count)
                })
            }
            Check::Pagination => assert_pagination(response),
            Check::Sorted { field, descending } => check_sorted(response, field, *descending),
            Check::SearchFilter => {
                let term = ctx
                    .query_value("search")
                    .ok_or_else(|| AssertionError::new("Request had no search parameter"))?;
                let names = item_names(response);
                let verdict = classify_search(term, &names);
                ensure(!verdict.is_bug(), || {
                    format!(
                        "Search '{}' returned {} items, {}",
                        term,
                        names.len(),
                        verdict
                    )
                })
            }
            Check::InactiveFlag => {
                for item in response.data_list() {
                    let active = item.get("is_active").and_then(Value::as_bool);
                    ensure(active == Some(false), || {
                        format!("Expected is_active=false, got {:?}", active)
                    })?;
                }
                Ok(())
            }
            Check::TechniqueShape => {
                for item in response.data_list() {
                    require_fields(item, &["id", "name", "is_active", "values"], "technique")?;
                    let values = item
                        .get("values")
                        .and_then(Value::as_array)
                        .ok_or_else(|| AssertionError::new("Technique values is not a list"))?;
                    for value in values {
                        require_fields(value, &["language_code", "name"], "technique value")?;
                    }
                }
                Ok(())
            }
            Check::Echo {
                response: response_path,
                request,
            } => {
                let Some(sent) = ctx.body.and_then(|b| lookup(b, request)) else {
                    return Ok(());
                };
                let got = response.pointer(response_path).ok_or_else(|| {
                    AssertionError::new(format!("Response missing {}", response_path))
                })?;
                ensure(got == sent, || {
                    format!("Expected {}={}, got {}", response_path, sent, got)
                })
            }
            Check::ResponseTime(max) => assert_response_time(response, *max),
        }
    }
}

fn require_fields(value: &Value, fields: &[&str], what: &str) -> AssertResult {
    let missing: Vec<&str> = fields
        .iter()
        .copied()
        .filter(|f| value.get(f).is_none())
        .collect();
    ensure(missing.is_empty(), || {
        format!("Missing {} fields: {}", what, missing.join(", "))
    })
}

fn error_block(response: &ApiResponse) -> Result<&Value, AssertionError> {
    response
        .errors()
        .or_else(|| response.pointer("error"))
        .ok_or_else(|| AssertionError::new("Response has no errors block"))
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn item_names(response: &ApiResponse) -> Vec<String> {
    response
        .data_list()
        .iter()
        .filter_map(|item| item.get("name").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

fn check_token_pair(response: &ApiResponse) -> AssertResult {
    let data = response
        .data()
        .ok_or_else(|| AssertionError::new("Response has no data"))?;
    require_fields(
        data,
        &[
            "access_token",
            "refresh_token",
            "expires_in",
            "refresh_expires_in",
            "token_type",
        ],
        "token",
    )?;

    let token_type = data.get("token_type").and_then(Value::as_str);
    ensure(token_type == Some("Bearer"), || {
        format!("Expected token_type 'Bearer', got {:?}", token_type)
    })?;

    for key in ["access_token", "refresh_token"] {
        let token = data.get(key).and_then(Value::as_str).unwrap_or_default();
        assert_token_structure(token)
            .map_err(|e| AssertionError::new(format!("{}: {}", key, e)))?;
    }

    for key in ["expires_in", "refresh_expires_in"] {
        let seconds = data.get(key).and_then(Value::as_i64).unwrap_or(0);
        ensure(seconds > 0, || format!("{} should be positive, got {}", key, seconds))?;
    }
    Ok(())
}

fn check_sorted(response: &ApiResponse, field: &str, descending: bool) -> AssertResult {
    let values: Vec<String> = response
        .data_list()
        .iter()
        .filter_map(|item| item.get(field).and_then(Value::as_str))
        .map(str::to_lowercase)
        .collect();

    let ordered = values.windows(2).all(|pair| {
        if descending {
            pair[0] >= pair[1]
        } else {
            pair[0] <= pair[1]
        }
    });
    ensure(ordered, || {
        format!(
            "Items not sorted by {} {}",
            field,
            if descending { "desc" } else { "asc" }
        )
    })
}
