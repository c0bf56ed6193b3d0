//! Endpoint paths relative to the API root.

// Authentication
pub const LOGIN: &str = "/auth/login";
pub const LOGOUT: &str = "/auth/";
pub const REGISTER: &str = "/auth/register";
pub const REFRESH_TOKEN: &str = "/auth/refresh";
pub const VERIFY_TOKEN: &str = "/auth/verify";

// Users
pub const PROFILE: &str = "/users/profile";
pub const USERS: &str = "/users";
pub const USER_BY_ID: &str = "/users/{user_id}";

// Admin
pub const ADMIN_USERS: &str = "/admin/users";
pub const ADMIN_DASHBOARD: &str = "/admin/dashboard";

// Techniques
pub const TECHNIQUES: &str = "/techniques/";
pub const TECHNIQUES_UPDATE: &str = "/rbac/techniques/update";

// Utility
pub const HEALTH: &str = "/health";
pub const STATUS: &str = "/status";
pub const METRICS: &str = "/metrics";

// Artisans
pub const ARTISAN_PROFILE: &str = "/artisans/profile";
pub const ARTISAN_SERVICES: &str = "/artisans/services";
pub const ARTISAN_BY_ID: &str = "/artisans/{artisan_id}";

// Verification
pub const VERIFY_EMAIL: &str = "/auth/verify-email";
pub const VERIFY_PHONE: &str = "/auth/verify-phone";
pub const RESEND_VERIFICATION: &str = "/auth/resend-verification";

// Whitelist
pub const WHITELIST_AUDIT: &str = "/whitelist-audit/";
pub const WHITELIST_APPROVE: &str = "/whitelist-audit/{id}/approve";
pub const WHITELIST_REJECT: &str = "/whitelist-audit/{id}/reject";

// Catalogue
pub const PRODUCTS: &str = "/products";
pub const FILES: &str = "/files/";
pub const UNITS: &str = "/units/";

pub fn user_detail(user_id: &str) -> String {
    USER_BY_ID.replace("{user_id}", user_id)
}

pub fn artisan_detail(artisan_id: &str) -> String {
    ARTISAN_BY_ID.replace("{artisan_id}", artisan_id)
}

pub fn whitelist_approve(id: &str) -> String {
    WHITELIST_APPROVE.replace("{id}", id)
}

pub fn whitelist_reject(id: &str) -> String {
    WHITELIST_REJECT.replace("{id}", id)
}

/// Joins an endpoint onto a base URL with exactly one separating slash.
pub fn join(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}
