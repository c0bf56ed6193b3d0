//! Technique creation and listing tables.
//!
//! Listing cases carry soft count expectations: the search parameter has a
//! history of being ignored, and the `TC_BUG_*` cases exist to fail loudly
//! when that happens.

use super::{short_suffix, ApiCase, AuthMode, Check};
use client::endpoints;
use serde_json::{json, Value};

const CREATED: &str = "All techniques created successfully";
const TECHNIQUE_FIELDS: &[&str] = &["id", "name", "description", "is_active", "values"];

/// One technique entry. `values` is a list of `(language_code, name)`.
pub fn technique(name: &str, description: &str, active: bool, values: &[(&str, &str)]) -> Value {
    json!({
        "name": name,
        "description": description,
        "parent_name": null,
        "is_active": active,
        "values": values
            .iter()
            .map(|(code, label)| json!({"language_code": code, "name": label}))
            .collect::<Vec<_>>(),
    })
}

/// Name with a random suffix so reruns do not collide.
pub fn unique_technique_name(base: &str) -> String {
    format!("{}-{}", base, short_suffix())
}

fn add(id: &'static str, description: &'static str) -> ApiCase {
    ApiCase::post(id, description, endpoints::TECHNIQUES).auth(AuthMode::Admin)
}

fn created(case: ApiCase, count: usize) -> ApiCase {
    case.status(201)
        .success(true)
        .message(CREATED)
        .check(Check::CreatedCount(count).soft())
}

fn invalid(case: ApiCase, message: &'static str) -> ApiCase {
    case.tags(&["negative", "validation"])
        .status(422)
        .success(false)
        .message(message)
}

pub fn techniques_add_cases() -> Vec<ApiCase> {
    vec![
        created(
            add("TC_TA_01", "Add single technique with single language")
                .tags(&["positive", "single", "smoke"])
                .factory(|| {
                    json!({"techniques": [technique(
                        &unique_technique_name("wood-carving"),
                        "Carving designs into wood",
                        true,
                        &[("en", "Wood Carving")],
                    )]})
                }),
            1,
        )
        .check(Check::DataFields(TECHNIQUE_FIELDS).soft()),
        created(
            add("TC_TA_02", "Add technique with multiple languages")
                .tags(&["positive", "multi_language"])
                .factory(|| {
                    json!({"techniques": [technique(
                        &unique_technique_name("embroidery"),
                        "Decorating fabric with needle and thread",
                        true,
                        &[("en", "Embroidery"), ("es", "Bordado"), ("fr", "Broderie")],
                    )]})
                }),
            1,
        ),
        created(
            add("TC_TA_03", "Add multiple techniques at once")
                .tags(&["positive", "bulk", "multiple"])
                .factory(|| {
                    json!({"techniques": [
                        technique(
                            &unique_technique_name("weaving"),
                            "Interlacing threads to form fabric",
                            true,
                            &[("en", "Weaving")],
                        ),
                        technique(
                            &unique_technique_name("pottery"),
                            "Shaping clay into objects",
                            true,
                            &[("en", "Pottery"), ("es", "Alfarería")],
                        ),
                    ]})
                }),
            2,
        ),
        created(
            add("TC_TA_04", "Add technique with is_active false")
                .tags(&["positive", "inactive"])
                .factory(|| {
                    json!({"techniques": [technique(
                        &unique_technique_name("basketry"),
                        "Weaving plant materials into baskets",
                        false,
                        &[("en", "Basketry")],
                    )]})
                }),
            1,
        )
        .check(Check::InactiveFlag.soft()),
        add("TC_TA_05", "Add duplicate technique name")
            .tags(&["negative", "duplicate", "validation"])
            .json(json!({"techniques": [technique(
                "glass-blowing",
                "Duplicate technique",
                true,
                &[("en", "Duplicate")],
            )]}))
            .status(201)
            .success(true)
            .message(CREATED),
        invalid(
            add("TC_TA_06", "Empty techniques array").json(json!({"techniques": []})),
            "techniques must not be empty",
        ),
        invalid(
            add("TC_TA_07", "Missing required field - name").json(json!({"techniques": [{
                "description": "Test technique",
                "parent_name": null,
                "is_active": true,
                "values": [{"language_code": "en", "name": "Test"}],
            }]})),
            "name is required",
        ),
        invalid(
            add("TC_TA_08", "Missing required field - values").json(json!({"techniques": [{
                "name": "test-technique",
                "description": "Test technique",
                "parent_name": null,
                "is_active": true,
            }]})),
            "values is required",
        ),
        invalid(
            add("TC_TA_09", "Empty values array").json(json!({"techniques": [
                technique("test-technique", "Test technique", true, &[])
            ]})),
            "values must not be empty",
        ),
        add("TC_TA_10", "Invalid language code in values")
            .tags(&["negative", "validation", "language"])
            .json(json!({"techniques": [
                technique("test-technique", "Test technique", true, &[("xx", "Test")])
            ]}))
            .status(201)
            .success(true)
            .message(CREATED),
        add("TC_TA_11", "Add without authentication")
            .tags(&["negative", "security", "authentication"])
            .auth(AuthMode::None)
            .json(json!({"techniques": [
                technique("test-technique", "Test technique", true, &[("en", "Test")])
            ]}))
            .status(401)
            .success(false)
            .message("Authentication required"),
    ]
}

fn listing(id: &'static str, description: &'static str) -> ApiCase {
    ApiCase::get(id, description, endpoints::TECHNIQUES)
        .auth(AuthMode::Admin)
        .status(200)
        .success(true)
}

fn search(id: &'static str, description: &'static str, term: &str, count: usize) -> ApiCase {
    listing(id, description)
        .tags(&["search", "bug"])
        .query("search", term)
        .check(Check::DataCount(count).soft())
        .check(Check::SearchFilter.soft())
}

fn bug_search(id: &'static str, description: &'static str, term: &str) -> ApiCase {
    listing(id, description)
        .tags(&["bug", "critical", "search"])
        .query("search", term)
        .check(Check::SearchFilter)
}

pub fn techniques_get_cases() -> Vec<ApiCase> {
    vec![
        listing("TC_TG_01", "Get active techniques")
            .tags(&["positive", "smoke"])
            .query("is_active", "true")
            .check(Check::TopLevelFields(&["data", "meta"]))
            .check(Check::Pagination)
            .check(Check::MinDataCount(1).soft())
            .check(Check::TechniqueShape),
        listing("TC_TG_02", "Get techniques without parameters")
            .tags(&["positive"])
            .check(Check::TopLevelFields(&["data", "meta"]))
            .check(Check::TechniqueShape),
        listing("TC_TG_03", "Get techniques with pagination")
            .tags(&["positive", "pagination"])
            .query("page", "1")
            .query("limit", "5")
            .check(Check::Pagination)
            .check(Check::MaxDataCount(5)),
        search("TC_TG_04", "Search for 'Single'", "Single", 0),
        search("TC_TG_05", "Search for 'Test'", "Test", 2),
        listing("TC_TG_06", "Sort by name ascending")
            .tags(&["positive", "sorting"])
            .query("sort", "name")
            .query("order", "asc")
            .check(Check::Sorted { field: "name", descending: false }.soft()),
        listing("TC_TG_07", "Sort by creation date descending")
            .tags(&["positive", "sorting"])
            .query("sort", "created_at")
            .query("order", "desc")
            .check(Check::Sorted { field: "created_at", descending: true }.soft()),
        listing("TC_TG_08", "Get inactive techniques")
            .tags(&["positive", "filter"])
            .query("is_active", "false")
            .check(Check::DataCount(0).soft())
            .check(Check::InactiveFlag),
        search("TC_TG_09", "Active filter combined with search", "Single", 1)
            .query("is_active", "true"),
        ApiCase::get("TC_TG_10", "Get techniques without authentication", endpoints::TECHNIQUES)
            .tags(&["negative", "security"])
            .status(401)
            .success(false)
            .message("Access token required"),
        search("TC_TG_11", "Search for a term that matches nothing", "NONEXISTENT_TECHNIQUE_XYZ123", 0),
        search("TC_TG_12", "Search with special characters", "@#$%^&*()", 0),
        search("TC_TG_13", "Search with a very long term", &"a".repeat(100), 0),
        search("TC_TG_14", "Search is case-insensitive", "SINGLE", 1),
        bug_search("TC_BUG_01", "Search returns only matching techniques", "Single"),
        bug_search("TC_BUG_02", "Search for a missing term returns nothing", "DELETED_NONEXISTENT_123"),
        bug_search("TC_BUG_03", "Search returns fewer results than no search", "Test"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::{by_tag, find};

    #[test]
    fn test_technique_builder() {
        let value = technique("weaving", "Threads", false, &[("en", "Weaving"), ("es", "Tejido")]);
        assert_eq!(value["is_active"], false);
        assert!(value["parent_name"].is_null());
        assert_eq!(value["values"][1]["language_code"], "es");
    }

    #[test]
    fn test_positive_names_are_unique() {
        let cases = techniques_add_cases();
        let first = find(&cases, "TC_TA_01").unwrap();
        let a = first.request.payload.resolve().unwrap();
        let b = first.request.payload.resolve().unwrap();
        let name = a["techniques"][0]["name"].as_str().unwrap();
        assert!(name.starts_with("wood-carving-"));
        assert_eq!(name.len(), "wood-carving-".len() + 8);
        assert_ne!(a["techniques"][0]["name"], b["techniques"][0]["name"]);

        let duplicate = find(&cases, "TC_TA_05").unwrap();
        let payload = duplicate.request.payload.resolve().unwrap();
        assert_eq!(payload["techniques"][0]["name"], "glass-blowing");
    }

    #[test]
    fn test_get_table() {
        let cases = techniques_get_cases();
        assert_eq!(cases.len(), 17);
        assert_eq!(by_tag(&cases, "bug").len(), 10);

        let long = find(&cases, "TC_TG_13").unwrap();
        assert_eq!(long.request.query[0].1.len(), 100);

        let combined = find(&cases, "TC_TG_09").unwrap();
        assert_eq!(combined.request.query.len(), 2);

        let attempt = find(&cases, "TC_BUG_02").unwrap();
        assert!(attempt.checks.iter().any(|c| *c == Check::SearchFilter));
    }
}
