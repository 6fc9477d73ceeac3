// Helper functions for safe logging and HTTP responses

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// Masks tokens for safe logging
/// Shows only first and last 4 characters
///
/// # Example
/// ```ignore
/// let masked = safe_token_log("12345678.abcdefghijklmnop");
/// // Returns: "1234...mnop"
/// ```
pub fn safe_token_log(token: &str) -> String {
    if token.len() > 8 && token.is_ascii() {
        format!("{}...{}", &token[..4], &token[token.len() - 4..])
    } else {
        "***".to_string()
    }
}

/// A plain `302 Found` redirect.
///
/// `axum::response::Redirect` only offers 303/307/308, while the OAuth
/// endpoints answer with 302 like the marketplace expects.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Strips OAuth secrets (`code`, `state`) from a query string before it is logged
pub fn redact_query(query: &str) -> String {
    query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if matches!(key, "code" | "state") => format!("{}=***", key),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}
