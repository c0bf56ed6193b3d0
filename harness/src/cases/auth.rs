//! Login, logout, registration and artisan-login tables.

use super::{ApiCase, AuthMode, Check};
use crate::generators::{unique_email, unique_pk_phone, unique_phone};
use client::endpoints;
use serde_json::json;
use std::time::Duration;

const REG_PASSWORD: &str = "SecurePass123!";
const USER_FIELDS_FULL: &[&str] = &["id", "phone", "email", "phone_verified", "email_verified"];

fn login(id: &'static str, description: &'static str, identifier: &str, password: &str) -> ApiCase {
    ApiCase::post(id, description, endpoints::LOGIN)
        .json(json!({"identifier": identifier, "password": password}))
}

fn invalid_login(id: &'static str, description: &'static str, identifier: &str, password: &str) -> ApiCase {
    login(id, description, identifier, password)
        .tags(&["negative", "security"])
        .status(401)
        .success(false)
        .message("Invalid credentials")
}

fn blank_login(id: &'static str, description: &'static str, identifier: &str, password: &str) -> ApiCase {
    login(id, description, identifier, password)
        .tags(&["negative", "validation"])
        .status(422)
        .success(false)
        .message("Validation failed")
        .check(Check::ErrorDetails.soft())
}

pub fn login_cases() -> Vec<ApiCase> {
    vec![
        login(
            "TC_Login_01",
            "Login with valid credentials",
            "{test_identifier}",
            "{test_password}",
        )
            .tags(&["smoke", "positive", "critical"])
            .status(200)
            .success(true)
            .message("Login verification successful")
            .check(Check::TokenPair.soft())
            .check(Check::UserData.soft())
            .check(Check::ResponseTime(Duration::from_secs(5)).soft()),
        invalid_login("TC_Login_02", "Login with wrong identifier and password", "adminteresa", "admin#123@"),
        invalid_login("TC_Login_03", "Login with wrong password", "admin", "helloteresa123"),
        invalid_login("TC_Login_04", "Login with wrong identifier", "teresaadmin", "admin123"),
        blank_login("TC_Login_05", "Login with empty identifier and password", "", ""),
        blank_login("TC_Login_06", "Login with empty identifier", "", "admin123"),
        blank_login("TC_Login_07", "Login with empty password", "admin", ""),
        blank_login("TC_Login_08", "Login with empty identifier and wrong password", "", "adminteresa@"),
        blank_login("TC_Login_09", "Login with wrong identifier and empty password", "adminteresa@", ""),
        invalid_login("TC_Login_10", "Login with unregistered email", "saira@gmail.com", "saira@123"),
    ]
}

pub fn logout_cases() -> Vec<ApiCase> {
    vec![
        ApiCase::post("TC_Logout_01", "Logout with a valid access token", endpoints::LOGOUT)
            .tags(&["smoke", "positive", "critical"])
            .auth(AuthMode::Fresh)
            .status(204),
        ApiCase::post("TC_Logout_02", "Logout with an invalid access token", endpoints::LOGOUT)
            .tags(&["negative", "security"])
            .auth(AuthMode::Raw("Bearer invalid_token_12345_uat_test".to_string()))
            .status(500)
            .success(false)
            .message("Invalid access token"),
        ApiCase::post("TC_Logout_03", "Logout without an authorization header", endpoints::LOGOUT)
            .tags(&["negative", "security"])
            .status(500)
            .success(false)
            .message("Authorization header required"),
    ]
}

fn register(id: &'static str, description: &'static str) -> ApiCase {
    ApiCase::post(id, description, endpoints::REGISTER)
}

fn registered(case: ApiCase) -> ApiCase {
    case.status(201)
        .success(true)
        .message("Register Successfully")
        .strict()
}

fn rejected(case: ApiCase, fields: &'static [&'static str]) -> ApiCase {
    let case = case
        .tags(&["negative", "validation"])
        .status(422)
        .success(false)
        .message("Validation failed");
    if fields.is_empty() {
        case
    } else {
        case.check(Check::ErrorFields(fields).soft())
    }
}

pub fn registration_cases() -> Vec<ApiCase> {
    vec![
        registered(
            register("TC_Artisan_Reg_01", "Valid artisan registration with all fields")
                .tags(&["smoke", "positive", "critical"])
                .factory(|| {
                    json!({
                        "f_name": "Artisan",
                        "l_name": "Test",
                        "phone": unique_phone(),
                        "email": unique_email("artisan"),
                        "password": REG_PASSWORD,
                    })
                }),
        )
        .check(Check::UserFields(USER_FIELDS_FULL).soft())
        .check(Check::Echo { response: "data.user.email", request: "email" }.soft()),
        register("TC_Artisan_Reg_02", "Registration with duplicate email")
            .tags(&["negative", "duplicate"])
            .skip("Requires an existing account with existing@example.com")
            .factory(|| {
                json!({
                    "f_name": "Duplicate",
                    "l_name": "User",
                    "phone": unique_phone(),
                    "email": "existing@example.com",
                    "password": REG_PASSWORD,
                })
            })
            .status(409)
            .success(false)
            .message("User already exists"),
        register("TC_Artisan_Reg_03", "Registration with duplicate phone")
            .tags(&["negative", "duplicate"])
            .skip("Requires an existing account with +8801712345678")
            .factory(|| {
                json!({
                    "f_name": "Duplicate",
                    "l_name": "Phone",
                    "phone": "+8801712345678",
                    "email": unique_email("dup_phone"),
                    "password": REG_PASSWORD,
                })
            })
            .status(409)
            .success(false)
            .message("User already exists"),
        rejected(
            register("TC_Artisan_Reg_04", "Registration with invalid email format").factory(|| {
                json!({
                    "f_name": "Invalid",
                    "l_name": "Email",
                    "phone": unique_phone(),
                    "email": "not-an-email",
                    "password": REG_PASSWORD,
                })
            }),
            &["email"],
        ),
        rejected(
            register("TC_Artisan_Reg_05", "Registration with weak password").factory(|| {
                json!({
                    "f_name": "Weak",
                    "l_name": "Password",
                    "phone": unique_phone(),
                    "email": unique_email("weak"),
                    "password": "123",
                })
            }),
            &["password"],
        ),
        registered(
            register("TC_Artisan_Reg_06", "Registration without first name")
                .tags(&["positive", "optional_fields"])
                .factory(|| {
                    json!({
                        "l_name": "Test",
                        "phone": unique_phone(),
                        "email": unique_email("no_fname"),
                        "password": REG_PASSWORD,
                    })
                }),
        ),
        registered(
            register("TC_Artisan_Reg_07", "Registration without last name")
                .tags(&["positive", "optional_fields"])
                .factory(|| {
                    json!({
                        "f_name": "Test",
                        "phone": unique_phone(),
                        "email": unique_email("no_lname"),
                        "password": REG_PASSWORD,
                    })
                }),
        ),
        registered(
            register("TC_Artisan_Reg_08", "Registration without email")
                .tags(&["positive", "optional_fields"])
                .factory(|| {
                    json!({
                        "f_name": "No",
                        "l_name": "Email",
                        "phone": unique_phone(),
                        "password": REG_PASSWORD,
                    })
                }),
        ),
        rejected(
            register("TC_Artisan_Reg_09", "Registration without phone").factory(|| {
                json!({
                    "f_name": "No",
                    "l_name": "Phone",
                    "email": unique_email("no_phone"),
                    "password": REG_PASSWORD,
                })
            }),
            &["phone"],
        ),
        rejected(
            register("TC_Artisan_Reg_10", "Registration without password").factory(|| {
                json!({
                    "f_name": "No",
                    "l_name": "Password",
                    "phone": unique_phone(),
                    "email": unique_email("no_pass"),
                })
            }),
            &["password"],
        ),
        rejected(
            register("TC_Artisan_Reg_11", "Registration with non-numeric phone").factory(|| {
                json!({
                    "f_name": "Bad",
                    "l_name": "Phone",
                    "phone": "abc123",
                    "email": unique_email("bad_phone"),
                    "password": REG_PASSWORD,
                })
            }),
            &["phone"],
        ),
        registered(
            register("TC_Artisan_Reg_12", "Registration with phone and password only")
                .tags(&["positive", "minimal"])
                .factory(|| json!({"phone": unique_phone(), "password": REG_PASSWORD})),
        )
        .check(Check::UserFields(&["id", "phone", "phone_verified"]).soft()),
        rejected(
            register("TC_Artisan_Reg_13", "SQL injection in first name")
                .tags(&["security"])
                .factory(|| {
                    json!({
                        "f_name": "Robert'); DROP TABLE users;--",
                        "l_name": "Test",
                        "phone": unique_phone(),
                        "email": unique_email("sqli"),
                        "password": REG_PASSWORD,
                    })
                }),
            &[],
        )
        .or_status(400),
        rejected(
            register("TC_Artisan_Reg_14", "XSS payload in first name")
                .tags(&["security"])
                .factory(|| {
                    json!({
                        "f_name": "<script>alert(1)</script>",
                        "l_name": "Test",
                        "phone": unique_phone(),
                        "email": unique_email("xss"),
                        "password": REG_PASSWORD,
                    })
                }),
            &[],
        )
        .or_status(400),
        rejected(
            register("TC_Artisan_Reg_15", "Phone number containing a space")
                .json(json!({"phone": "+92 3048942431", "password": "aminaIqbal@969000"})),
            &["phone"],
        ),
        registered(
            register("TC_Artisan_Reg_16", "Registration with a Pakistan phone number")
                .tags(&["positive", "regional"])
                .factory(|| {
                    json!({
                        "f_name": "Amina",
                        "l_name": "Iqbal",
                        "phone": unique_pk_phone(),
                        "password": "aminaIqbal@969000",
                    })
                }),
        ),
        rejected(
            register("TC_006", "Registration with a short password").factory(|| {
                json!({"phone": unique_pk_phone(), "password": "ejjjj"})
            }),
            &["password"],
        ),
    ]
}

fn artisan_login(id: &'static str, description: &'static str) -> ApiCase {
    ApiCase::post(id, description, endpoints::LOGIN)
}

/// `{approved_*}` and `{pending_*}` markers are filled from accounts the
/// user manager provisions.
pub fn artisan_login_cases() -> Vec<ApiCase> {
    vec![
        artisan_login("TC_Artisan_Login_01", "Approved artisan logs in")
            .tags(&["smoke", "positive", "critical"])
            .json(json!({"identifier": "{approved_identifier}", "password": "{approved_password}"}))
            .status(200)
            .success(true)
            .message("login successfully")
            .check(Check::TopLevelFields(&["data.access_token"]).soft()),
        artisan_login("TC_Artisan_Login_02", "Artisan pending approval is refused")
            .tags(&["negative", "whitelist"])
            .json(json!({"identifier": "{pending_identifier}", "password": "{pending_password}"}))
            .status(403)
            .success(false)
            .message("Access forbidden"),
        artisan_login("TC_Artisan_Login_03", "Approved phone with wrong password")
            .tags(&["negative", "security"])
            .json(json!({"identifier": "+923231348372", "password": "khanAli@9000"}))
            .status(401)
            .success(false)
            .message("unauthorized"),
        artisan_login("TC_Artisan_Login_04", "Unregistered phone")
            .tags(&["negative", "security"])
            .json(json!({"identifier": "+923231348343", "password": "khanAli@9000"}))
            .status(401)
            .success(false)
            .message("unauthorized"),
        artisan_login("TC_Artisan_Login_05", "Empty identifier")
            .tags(&["negative", "validation"])
            .json(json!({"identifier": "", "password": "khanAli@969000"}))
            .status(422)
            .success(false)
            .message("unprocessible"),
        artisan_login("TC_Artisan_Login_06", "Empty password")
            .tags(&["negative", "validation"])
            .json(json!({"identifier": "+923048942431", "password": ""}))
            .status(422)
            .success(false)
            .message("password is required"),
        artisan_login("TC_Artisan_Login_07", "Phone containing letters")
            .tags(&["negative", "validation"])
            .json(json!({"identifier": "+92abc1234567", "password": "Test@12345"}))
            .status(422)
            .success(false)
            .message("validation error"),
        artisan_login("TC_Artisan_Login_08", "Unknown phone with plausible password")
            .tags(&["negative", "security"])
            .json(json!({"identifier": "+923233348372", "password": "khanAli@969000"}))
            .status(401)
            .success(false)
            .message("Invalid credentials"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::{by_tag, find, runnable};

    #[test]
    fn test_login_table_shape() {
        let cases = login_cases();
        assert_eq!(cases.len(), 10);
        let smoke = by_tag(&cases, "smoke");
        assert_eq!(smoke.len(), 1);
        assert_eq!(smoke[0].id, "TC_Login_01");
        assert!(smoke[0].checks.iter().all(Check::is_soft));
        let valid = smoke[0].request.payload.resolve().unwrap();
        assert_eq!(valid["identifier"], "{test_identifier}");
        assert_eq!(valid["password"], "{test_password}");

        let blank = find(&cases, "TC_Login_05").unwrap();
        assert!(blank.expected.accepts(422));
        assert!(!blank.expected.strict_message);
        let payload = blank.request.payload.resolve().unwrap();
        assert_eq!(payload["identifier"], "");
    }

    #[test]
    fn test_registration_factories_and_skips() {
        let cases = registration_cases();
        assert_eq!(cases.len(), 17);
        assert_eq!(runnable(&cases).len(), 15);

        let first = find(&cases, "TC_Artisan_Reg_01").unwrap();
        assert!(first.expected.strict_message);
        let a = first.request.payload.resolve().unwrap();
        let b = first.request.payload.resolve().unwrap();
        assert_ne!(a["phone"], b["phone"]);

        let sqli = find(&cases, "TC_Artisan_Reg_13").unwrap();
        assert!(sqli.expected.accepts(400));
        assert!(sqli.expected.accepts(422));
        assert!(sqli.has_tag("security"));

        let minimal = find(&cases, "TC_Artisan_Reg_08").unwrap();
        assert!(minimal.request.payload.resolve().unwrap().get("email").is_none());
    }

    #[test]
    fn test_logout_auth_modes() {
        let cases = logout_cases();
        assert_eq!(cases[0].auth, AuthMode::Fresh);
        assert!(matches!(cases[1].auth, AuthMode::Raw(ref h) if h.starts_with("Bearer ")));
        assert_eq!(cases[2].auth, AuthMode::None);
    }

    #[test]
    fn test_artisan_login_placeholders() {
        let cases = artisan_login_cases();
        assert_eq!(cases.len(), 8);
        let approved = cases[0].request.payload.resolve().unwrap();
        assert_eq!(approved["identifier"], "{approved_identifier}");
    }
}
