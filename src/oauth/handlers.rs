//! OAuth handlers
//!
//! Admin endpoints that connect the storefront to the marketplace account.
//! Every handler opens the request's token store and hands its cookie
//! changes back on the response.

use axum::{
    extract::{Extension, Json, Query},
    http::StatusCode,
    response::{Html, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::errors::{OAuthError, OAuthErrorKind};
use super::models::{now_millis, CallbackParams, StatusResponse};
use crate::common::helpers::found;
use crate::common::{ApiError, AppState};

pub const SUCCESS_PAGE: &str = "/admin/oauth/success";

/// GET /api/admin/oauth/start
///
/// Persists a fresh state + PKCE pair and redirects (302) to the marketplace
/// consent page.
///
/// # Errors
/// - 500 `NOT_CONFIGURED` when `ETSY_API_KEY` is missing
pub async fn oauth_start(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    jar: CookieJar,
) -> Result<(CookieJar, Response), ApiError> {
    let state = state_lock.read().await.clone();

    let authorization = state.oauth.begin_authorization().map_err(|e| match e {
        OAuthError::NotConfigured => ApiError::NotConfigured(e.to_string()),
        other => ApiError::InternalServer(format!("Failed to start OAuth flow: {}", other)),
    })?;

    let store = state.storage.open(&jar);
    store.save_oauth_state(&authorization.state).await?;

    info!(
        backend = state.storage.name(),
        redirect_uri = %authorization.state.redirect_uri,
        scopes = ?authorization.state.scopes,
        "Starting OAuth flow"
    );

    Ok((store.write_cookies(jar), found(&authorization.url)))
}

/// GET /api/admin/oauth/callback
///
/// Always answers with a 302: to the success page, or to the error page
/// carrying the failure kind.
pub async fn oauth_callback(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> (CookieJar, Response) {
    let state = state_lock.read().await.clone();
    let store = state.storage.open(&jar);

    let location = match state.oauth.handle_callback(store.as_ref(), params).await {
        Ok(_) => {
            state.catalog_cache.invalidate().await;
            SUCCESS_PAGE.to_string()
        }
        Err(failure) => {
            warn!(kind = failure.kind.as_str(), description = ?failure.description, "OAuth callback failed");
            failure.error_page_location()
        }
    };

    (store.write_cookies(jar), found(&location))
}

/// GET /api/admin/oauth/status
pub async fn oauth_status(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    jar: CookieJar,
) -> Json<StatusResponse> {
    let state = state_lock.read().await.clone();
    let store = state.storage.open(&jar);

    let tokens = store.load_tokens().await;
    Json(StatusResponse::from_tokens(tokens.as_ref(), now_millis()))
}

/// DELETE /api/admin/oauth/status
///
/// Logout: drops every stored token and pending state.
pub async fn oauth_logout(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    jar: CookieJar,
) -> (CookieJar, Json<serde_json::Value>) {
    let state = state_lock.read().await.clone();
    let store = state.storage.open(&jar);

    store.clear_all_oauth_data().await;
    state.catalog_cache.invalidate().await;
    info!(backend = state.storage.name(), "Marketplace connection removed");

    (
        store.write_cookies(jar),
        Json(json!({ "success": true, "message": "OAuth tokens cleared" })),
    )
}

/// GET /api/admin/storage/health
pub async fn storage_health(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let state = state_lock.read().await.clone();
    let backend = state.storage.name();
    let environment = state.config.environment.as_str();

    match state.storage.health_check().await {
        Ok(message) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "backend": backend,
                "environment": environment,
                "message": message,
                "timestamp": Utc::now().to_rfc3339(),
            })),
        ),
        Err(e) => {
            error!(backend, error = %e, "Storage health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "backend": backend,
                    "environment": environment,
                    "message": e.to_string(),
                    "timestamp": Utc::now().to_rfc3339(),
                })),
            )
        }
    }
}

/// GET /admin/oauth/success
pub async fn success_page() -> Html<String> {
    Html(render_page(
        "Connected",
        "The shop is connected. Products are loaded from the marketplace from now on.",
        None,
    ))
}

#[derive(Debug, Deserialize)]
pub struct ErrorPageQuery {
    pub error: Option<String>,
    pub description: Option<String>,
}

/// GET /admin/oauth/error?error=<kind>&description=<text>
pub async fn error_page(Query(query): Query<ErrorPageQuery>) -> Html<String> {
    let kind = OAuthErrorKind::from_code(query.error.as_deref().unwrap_or_default());
    let detail = query.description.filter(|d| !d.is_empty());

    let body = format!(
        "{}</p><p><strong>What to do:</strong> {}",
        html_escape(kind.description()),
        html_escape(kind.remedy())
    );

    Html(render_page(kind.title(), &body, detail.as_deref()))
}

fn render_page(title: &str, body: &str, detail: Option<&str>) -> String {
    let detail = detail
        .map(|d| format!("<pre>{}</pre>", html_escape(d)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>{title}</title>
    <style>
        body {{ font-family: sans-serif; max-width: 560px; margin: 80px auto; padding: 0 16px; }}
        pre {{ background: #f5f5f5; padding: 12px; white-space: pre-wrap; }}
    </style>
</head>
<body>
    <h1>{title}</h1>
    <p>{body}</p>
    {detail}
    <p><a href="/api/admin/oauth/start">Start again</a></p>
</body>
</html>"#,
        title = html_escape(title),
        body = body,
        detail = detail,
    )
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
