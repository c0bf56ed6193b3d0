//! Whitelist audit listing and approval tables. Both run with the admin token.

use super::{ApiCase, AuthMode, Check};
use crate::generators::repeat_char;
use client::endpoints;
use serde_json::json;

const LISTED: &str = "Whitelist audits retrieved successfully";
const DECIDED: &str = "Whitelist audit created successfully";

fn listing(id: &'static str, description: &'static str) -> ApiCase {
    ApiCase::get(id, description, endpoints::WHITELIST_AUDIT).auth(AuthMode::Admin)
}

fn listed(case: ApiCase) -> ApiCase {
    case.status(200)
        .success(true)
        .message(LISTED)
        .strict()
        .check(Check::TopLevelFields(&["data", "meta"]))
}

pub fn whitelist_cases() -> Vec<ApiCase> {
    vec![
        listed(
            listing("TC_Whitelist_01", "List whitelist audits, first page")
                .tags(&["smoke", "positive", "critical"])
                .query("page", "1")
                .query("limit", "10"),
        ),
        listed(
            listing("TC_Whitelist_02", "Search whitelist audits")
                .tags(&["positive", "search"])
                .query("search", "manual"),
        ),
        listed(
            listing("TC_Whitelist_03", "Custom page size")
                .tags(&["positive", "pagination"])
                .query("page", "1")
                .query("limit", "5"),
        )
        .check(Check::MaxDataCount(5)),
        listed(
            listing("TC_Whitelist_04", "Sort by creation date, newest first")
                .tags(&["positive", "sorting"])
                .query("sort", "created_at")
                .query("order", "desc"),
        )
        .check(Check::Sorted { field: "created_at", descending: true }.soft()),
        listing("TC_Whitelist_05", "List without authentication")
            .tags(&["negative", "security"])
            .auth(AuthMode::None)
            .status(401)
            .success(false)
            .message("Access token required")
            .strict(),
        listing("TC_Whitelist_06", "Non-numeric page")
            .tags(&["negative", "validation"])
            .query("page", "invalid")
            .status(422)
            .success(false),
        listing("TC_Whitelist_07", "Non-numeric limit")
            .tags(&["negative", "validation"])
            .query("limit", "invalid")
            .status(422)
            .success(false),
        listed(
            listing("TC_Whitelist_08", "Second page")
                .tags(&["positive", "pagination"])
                .query("page", "2")
                .query("limit", "5"),
        )
        .check(Check::MaxDataCount(5)),
    ]
}

fn decision(id: &'static str, description: &'static str) -> ApiCase {
    ApiCase::patch(id, description, endpoints::WHITELIST_AUDIT).auth(AuthMode::Admin)
}

fn decided(case: ApiCase) -> ApiCase {
    case.status(200)
        .success(true)
        .message(DECIDED)
        .strict()
        .check(Check::Echo { response: "data.status", request: "status" })
}

fn refused(case: ApiCase) -> ApiCase {
    case.tags(&["negative", "validation"])
        .status(422)
        .success(false)
        .message("Validation failed")
        .strict()
}

/// `{user_id}`, `{approved_user_id}` and `{rejected_user_id}` are filled from
/// whitelist entries in the matching state.
pub fn whitelist_approval_cases() -> Vec<ApiCase> {
    vec![
        decided(
            decision("TC_Whitelist_Approve_01", "Approve a pending user")
                .tags(&["smoke", "positive", "critical"])
                .json(json!({
                    "user_id": "{user_id}",
                    "status": "approved",
                    "reason": "Phone number and documents verified",
                })),
        ),
        decided(
            decision("TC_Whitelist_Approve_02", "Reject a pending user")
                .tags(&["positive"])
                .json(json!({
                    "user_id": "{user_id}",
                    "status": "rejected",
                    "reason": "Incomplete documentation",
                })),
        ),
        decision("TC_Whitelist_Approve_03", "Decide without authentication")
            .tags(&["negative", "security"])
            .auth(AuthMode::None)
            .json(json!({"user_id": "test-id-123", "status": "approved", "reason": "No auth"}))
            .status(401)
            .success(false)
            .message("Access token required")
            .strict(),
        refused(
            decision("TC_Whitelist_Approve_04", "Malformed user id").json(json!({
                "user_id": "invalid-uuid-123",
                "status": "approved",
                "reason": "Invalid id",
            })),
        ),
        refused(
            decision("TC_Whitelist_Approve_05", "Unknown status value").json(json!({
                "user_id": "{user_id}",
                "status": "invalid_status",
                "reason": "Invalid status",
            })),
        ),
        decided(
            decision("TC_Whitelist_Approve_06", "Approve without a reason")
                .tags(&["positive", "optional_fields"])
                .json(json!({"user_id": "{user_id}", "status": "approved"})),
        ),
        decided(
            decision("TC_Whitelist_Approve_07", "Approve an already approved user")
                .tags(&["positive", "idempotent"])
                .json(json!({
                    "user_id": "{approved_user_id}",
                    "status": "approved",
                    "reason": "Already approved test",
                })),
        ),
        refused(
            decision("TC_Whitelist_Approve_08", "Reason over the length limit").factory(|| {
                json!({
                    "user_id": "{user_id}",
                    "status": "approved",
                    "reason": repeat_char('A', 300),
                })
            }),
        ),
        decided(
            decision("TC_Whitelist_Approve_09", "Reject an approved user")
                .tags(&["positive", "transition"])
                .json(json!({
                    "user_id": "{approved_user_id}",
                    "status": "rejected",
                    "reason": "Change of decision",
                })),
        ),
        decided(
            decision("TC_Whitelist_Approve_10", "Approve a rejected user")
                .tags(&["positive", "transition"])
                .json(json!({
                    "user_id": "{rejected_user_id}",
                    "status": "approved",
                    "reason": "Re-evaluation approved",
                })),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::{find, substitute, Placeholders};

    #[test]
    fn test_whitelist_queries() {
        let cases = whitelist_cases();
        assert_eq!(cases.len(), 8);
        let sorted = find(&cases, "TC_Whitelist_04").unwrap();
        assert_eq!(
            sorted.request.query,
            vec![
                ("sort".to_string(), "created_at".to_string()),
                ("order".to_string(), "desc".to_string())
            ]
        );
        assert_eq!(find(&cases, "TC_Whitelist_05").unwrap().auth, AuthMode::None);
        assert!(cases
            .iter()
            .filter(|c| c.id != "TC_Whitelist_05")
            .all(|c| c.auth == AuthMode::Admin));
    }

    #[test]
    fn test_approval_placeholders_resolve() {
        let cases = whitelist_approval_cases();
        assert_eq!(cases.len(), 10);

        let mut placeholders = Placeholders::new();
        placeholders.insert("user_id".into(), "u-pending".into());
        let first = cases[0].request.payload.resolve().unwrap();
        assert_eq!(substitute(&first, &placeholders).unwrap()["user_id"], "u-pending");

        let seventh = cases[6].request.payload.resolve().unwrap();
        assert_eq!(
            substitute(&seventh, &placeholders).unwrap_err(),
            "approved_user_id"
        );
    }

    #[test]
    fn test_long_reason_length() {
        let case = find(&whitelist_approval_cases(), "TC_Whitelist_Approve_08")
            .cloned()
            .unwrap();
        let payload = case.request.payload.resolve().unwrap();
        assert_eq!(payload["reason"].as_str().unwrap().len(), 300);
    }
}
