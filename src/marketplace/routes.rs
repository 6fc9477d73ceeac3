//! Catalog routes

use axum::{routing::get, Router};

use super::handlers;

/// Creates and returns the catalog router
///
/// # Routes
/// - `GET /api/products` - All products (empty list when unavailable)
/// - `GET /api/products/:id` - One product
/// - `GET /api/shop` - Shop details
/// - `GET /api/debug/categories` - Classifier results for the current catalog
pub fn marketplace_routes() -> Router {
    Router::new()
        .route("/api/products", get(handlers::list_products))
        .route("/api/products/:id", get(handlers::get_product))
        .route("/api/shop", get(handlers::get_shop))
        .route("/api/debug/categories", get(handlers::debug_categories))
}
