//! HTTP paths and header values used by both ends.

pub const LOGIN_PATH: &str = "/login";
pub const SECURE_PATH: &str = "/secure";
pub const WEBSOCKETS_PATH: &str = "/websockets";
pub const HEALTH_PATH: &str = "/health";
pub const METRICS_PATH: &str = "/metrics";

pub const HTTP_APPLICATION_JSON: &str = "application/json; charset=UTF-8";

/// Scheme prefix of the `Authorization` header value.
pub const BEARER_SCHEME: &str = "Bearer";

/// Build the `Authorization` header value for a token.
pub fn bearer(token: &str) -> String {
    format!("{BEARER_SCHEME} {token}")
}
