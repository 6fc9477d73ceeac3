// src/logging_middleware.rs
//! Middleware for logging request and response bodies in debug mode

use axum::body::to_bytes;
use axum::{body::Body, extract::Request, http::StatusCode, middleware::Next, response::Response};
use tracing::debug;

use crate::common::helpers::redact_query;

/// Bodies of these routes can carry credentials or subscriber emails and are never logged
const SENSITIVE_PREFIXES: [&str; 3] = ["/api/admin/", "/admin/", "/api/newsletter"];

fn is_sensitive(path: &str) -> bool {
    SENSITIVE_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

fn log_body(label: &'static str, bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    let body_str = std::str::from_utf8(bytes).ok()?;
    // Try to parse as JSON for pretty printing
    let rendered = match serde_json::from_str::<serde_json::Value>(body_str) {
        Ok(json) => serde_json::to_string_pretty(&json).unwrap_or_else(|_| body_str.to_string()),
        Err(_) => body_str.to_string(),
    };
    debug!(kind = label, body = %rendered, "Body");
    Some(rendered)
}

/// Middleware to log request and response bodies in debug mode.
///
/// OAuth `code`/`state` query values are masked and admin bodies skipped.
pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(redact_query);
    let sensitive = is_sensitive(&path);

    debug!(method = %request.method(), path = %path, query = ?query, "📥 Request");

    if sensitive {
        let response = next.run(request).await;
        debug!(status = %response.status(), path = %path, "📤 Response (body not logged)");
        return Ok(response);
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    log_body("request", &bytes);

    // Reconstruct request
    let request = Request::from_parts(parts, Body::from(bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    debug!(status = %parts.status, path = %path, "📤 Response");
    log_body("response", &bytes);

    // Reconstruct response
    Ok(Response::from_parts(parts, Body::from(bytes)))
}
