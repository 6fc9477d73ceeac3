//! Newsletter routes

use axum::{routing::post, Router};

use super::handlers;

/// Creates and returns the newsletter router
///
/// # Routes
/// - `POST /api/newsletter` - Subscribe an email address
pub fn newsletter_routes() -> Router {
    Router::new().route("/api/newsletter", post(handlers::subscribe))
}
