//! Instagram feed routes

use axum::{routing::get, Router};

use super::handlers;

/// Creates and returns the Instagram router
///
/// # Routes
/// - `GET /api/instagram` - Latest posts, or the fallback posts
pub fn instagram_routes() -> Router {
    Router::new().route("/api/instagram", get(handlers::list_posts))
}
