//! OAuth routes

use axum::{routing::get, Router};

use super::handlers;

/// Creates and returns the OAuth router
///
/// # Routes
/// - `GET /api/admin/oauth/start` - Redirect to the marketplace consent page
/// - `GET /api/admin/oauth/callback` - Finish the flow and store tokens
/// - `GET /api/admin/oauth/status` - Connection status
/// - `DELETE /api/admin/oauth/status` - Logout
/// - `GET /api/admin/storage/health` - Token storage connectivity check
/// - `GET /admin/oauth/success`, `GET /admin/oauth/error` - Result pages
pub fn oauth_routes() -> Router {
    Router::new()
        .route("/api/admin/oauth/start", get(handlers::oauth_start))
        .route("/api/admin/oauth/callback", get(handlers::oauth_callback))
        .route(
            "/api/admin/oauth/status",
            get(handlers::oauth_status).delete(handlers::oauth_logout),
        )
        .route("/api/admin/storage/health", get(handlers::storage_health))
        .route("/admin/oauth/success", get(handlers::success_page))
        .route("/admin/oauth/error", get(handlers::error_page))
}
