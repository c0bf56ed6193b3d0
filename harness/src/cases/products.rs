//! Product creation table. Every payload starts from [`valid_product_payload`]
//! and overrides or removes a few fields.

use super::{ApiCase, AuthMode, Check};
use crate::generators::unique_product_name;
use client::endpoints;
use serde_json::{json, Value};

pub const TECHNIQUE_IDS: [&str; 2] = [
    "fcae2e4e-b8b5-4a5f-b879-111896c2e849",
    "8fc243e7-d556-43b6-81a8-392d30b586c5",
];

pub const FILE_IDS: [&str; 3] = [
    "58a82002-020b-4e12-917f-5fcb3dccd29d",
    "78bbd7e5-c036-4544-aea6-0013838946cb",
    "1faa4719-74f3-4e08-9ba4-741d40e70aba",
];

/// A product the API accepts, with a fresh name.
pub fn valid_product_payload() -> Value {
    json!({
        "name": unique_product_name("Test Product"),
        "description": "Beautiful handcrafted ceramic mug with unique design",
        "hours_to_make": 2.5,
        "monthly_qty": 50,
        "annual_qty": 600,
        "custom_price": 25.99,
        "is_active": true,
        "status": "pending",
        "workshops": [],
        "materials": [
            {"name": "Clay", "price": 15.0, "quantity": 2, "unit": "kg"},
            {"name": "Glaze", "price": 8.0, "quantity": 1, "unit": "liter"}
        ],
        "techniques": [{"id": TECHNIQUE_IDS[0]}],
        "files": [{"id": FILE_IDS[0]}],
        "measurements": [{
            "size": "Standard",
            "width": 8,
            "length": 8,
            "height": 10,
            "description": "Standard mug size"
        }]
    })
}

/// The valid payload with top-level keys replaced by `overrides`.
pub fn product_with(overrides: Value) -> Value {
    let mut payload = valid_product_payload();
    if let (Some(base), Value::Object(changes)) = (payload.as_object_mut(), overrides) {
        for (key, value) in changes {
            base.insert(key, value);
        }
    }
    payload
}

pub fn without_field(mut payload: Value, field: &str) -> Value {
    if let Some(map) = payload.as_object_mut() {
        map.remove(field);
    }
    payload
}

fn create(id: &'static str, description: &'static str) -> ApiCase {
    ApiCase::post(id, description, endpoints::PRODUCTS)
        .auth(AuthMode::Artisan)
        .status(201)
        .success(true)
}

fn reject(id: &'static str, description: &'static str, fields: &'static [&'static str]) -> ApiCase {
    ApiCase::post(id, description, endpoints::PRODUCTS)
        .auth(AuthMode::Artisan)
        .tags(&["negative"])
        .status(422)
        .success(false)
        .check(Check::ErrorFields(fields).soft())
}

pub fn product_cases() -> Vec<ApiCase> {
    vec![
        create("TC-001", "Create product with valid data")
            .tags(&["smoke", "positive"])
            .factory(valid_product_payload)
            .check(Check::DataFields(&["id", "name", "status", "materials", "techniques", "files"])),
        create("TC-002", "Create product with multiple materials")
            .tags(&["positive"])
            .factory(|| {
                product_with(json!({"materials": [
                    {"name": "Clay", "price": 15, "quantity": 2, "unit": "kg"},
                    {"name": "Glaze", "price": 8, "quantity": 1, "unit": "liter"},
                    {"name": "Paint", "price": 5, "quantity": 3, "unit": "piece"},
                    {"name": "Brushes", "price": 10, "quantity": 2, "unit": "piece"}
                ]}))
            }),
        create("TC-003", "Create product with multiple techniques")
            .tags(&["positive"])
            .factory(|| {
                product_with(json!({"techniques": [
                    {"id": TECHNIQUE_IDS[0]},
                    {"id": TECHNIQUE_IDS[1]}
                ]}))
            }),
        create("TC-004", "Create product with multiple files")
            .tags(&["positive"])
            .factory(|| {
                product_with(json!({"files": FILE_IDS.iter().map(|id| json!({"id": id})).collect::<Vec<_>>()}))
            }),
        create("TC-005", "Create product with multiple measurements")
            .tags(&["positive"])
            .factory(|| {
                product_with(json!({"measurements": [
                    {"size": "S", "width": 45, "length": 65, "height": 4, "description": "Small"},
                    {"size": "M", "width": 50, "length": 70, "height": 5, "description": "Medium"},
                    {"size": "L", "width": 55, "length": 75, "height": 6, "description": "Large"}
                ]}))
            }),
        create("TC-006", "Create product with active status")
            .tags(&["positive"])
            .factory(|| product_with(json!({"status": "active", "is_active": true}))),
        create("TC-007", "Create product with zero custom price")
            .tags(&["positive"])
            .factory(|| product_with(json!({"custom_price": 0}))),
        create("TC-008", "Create product without measurements")
            .tags(&["positive"])
            .factory(|| product_with(json!({"measurements": []}))),
        reject("TC-101", "Product name exceeds 30 characters", &["name"]).factory(|| {
            product_with(json!({
                "name": "This is a very long product name that exceeds the maximum allowed length of 30 characters"
            }))
        }),
        reject("TC-102", "Empty name field", &["name"]).factory(|| product_with(json!({"name": ""}))),
        reject("TC-103", "Missing name field", &["name"])
            .factory(|| without_field(valid_product_payload(), "name")),
        reject("TC-104", "Name is a number", &["name"])
            .factory(|| product_with(json!({"name": 12345}))),
        reject("TC-105", "Too many materials (101)", &["materials"])
            .tags(&["boundary"])
            .message("Maximum 100 materials are allowed")
            .factory(|| {
                let materials: Vec<Value> = (0..101)
                    .map(|i| json!({"name": format!("Material {}", i), "price": 10, "quantity": 1, "unit": "piece"}))
                    .collect();
                product_with(json!({"materials": materials}))
            }),
        reject("TC-106", "Materials not an array", &["materials"])
            .message("Materials must be an array")
            .factory(|| {
                product_with(json!({"materials": {"name": "Clay", "price": 15, "quantity": 2, "unit": "kg"}}))
            }),
        reject("TC-107", "Too many techniques (51)", &["techniques"])
            .tags(&["boundary"])
            .message("Maximum 50 techniques are allowed")
            .factory(|| {
                let techniques: Vec<Value> =
                    (0..51).map(|i| json!({"id": format!("tech-{}", i)})).collect();
                product_with(json!({"techniques": techniques}))
            }),
        reject("TC-108", "Techniques not an array", &["techniques"])
            .message("techniques must be an array")
            .factory(|| product_with(json!({"techniques": {"id": TECHNIQUE_IDS[0]}}))),
        reject("TC-109", "Too many files (16)", &["files"])
            .tags(&["boundary"])
            .message("Maximum 15 files are allowed")
            .factory(|| {
                let files: Vec<Value> = (0..16).map(|i| json!({"id": format!("file-{}", i)})).collect();
                product_with(json!({"files": files}))
            }),
        reject("TC-110", "Files not an array", &["files"])
            .message("files must be an array")
            .factory(|| product_with(json!({"files": {"id": FILE_IDS[0]}}))),
        reject("TC-111", "Too many measurements (21)", &["measurements"])
            .tags(&["boundary"])
            .message("Maximum 20 measurements are allowed")
            .factory(|| {
                let measurements: Vec<Value> = (0..21)
                    .map(|i| json!({"size": format!("Size {}", i), "width": 10, "length": 20, "height": 5}))
                    .collect();
                product_with(json!({"measurements": measurements}))
            }),
        reject("TC-112", "Measurements not an array", &["measurements"])
            .message("Measurements must be an array")
            .factory(|| {
                product_with(json!({"measurements": {
                    "size": "M", "width": 50, "length": 70, "height": 5,
                    "description": "Single measurement"
                }}))
            }),
        reject("TC-113", "Negative hours to make", &["hours_to_make"])
            .factory(|| product_with(json!({"hours_to_make": -1}))),
        reject("TC-114", "Zero hours to make", &["hours_to_make"])
            .factory(|| product_with(json!({"hours_to_make": 0}))),
        reject("TC-115", "Negative monthly quantity", &["monthly_qty"])
            .factory(|| product_with(json!({"monthly_qty": -10}))),
        reject("TC-116", "Negative annual quantity", &["annual_qty"])
            .factory(|| product_with(json!({"annual_qty": -100}))),
        reject("TC-117", "Annual quantity below twelve months of monthly", &["annual_qty"])
            .factory(|| product_with(json!({"annual_qty": 500, "monthly_qty": 100}))),
        reject("TC-118", "Negative custom price", &["custom_price"])
            .factory(|| product_with(json!({"custom_price": -5}))),
    ]
}
