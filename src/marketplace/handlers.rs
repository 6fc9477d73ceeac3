//! Catalog handlers
//!
//! Marketplace failures never surface as 5xx here: listings degrade to an
//! empty list and a missing shop or product is a 404.

use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::classifier::classify;
use super::models::Product;
use crate::common::AppState;
use crate::storage::TokenStore;

const PRODUCTS_CACHE_KEY: &str = "all";
const SHOP_CACHE_KEY: &str = "shop";

/// Products from the catalog cache, falling back to the marketplace.
/// Empty results are not cached so a later request can retry.
async fn load_products(state: &AppState, store: &dyn TokenStore) -> Vec<Product> {
    if let Some(products) = state.catalog_cache.products.get(PRODUCTS_CACHE_KEY).await {
        return products;
    }

    let products = state.marketplace.get_products(store).await;
    if !products.is_empty() {
        state
            .catalog_cache
            .products
            .insert(PRODUCTS_CACHE_KEY, products.clone())
            .await;
    }
    products
}

/// GET /api/products
pub async fn list_products(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    jar: CookieJar,
) -> Response {
    let state = state_lock.read().await.clone();
    let store = state.storage.open(&jar);

    let products = load_products(&state, store.as_ref()).await;
    debug!(count = products.len(), "Serving products");

    let body = json!({
        "success": true,
        "count": products.len(),
        "products": products,
    });
    (store.write_cookies(jar), Json(body)).into_response()
}

/// GET /api/products/:id
pub async fn get_product(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Response {
    let state = state_lock.read().await.clone();
    let store = state.storage.open(&jar);

    let product = match state.catalog_cache.products.get(PRODUCTS_CACHE_KEY).await {
        Some(products) => products.into_iter().find(|p| p.id == id),
        None => state.marketplace.get_product(store.as_ref(), &id).await,
    };

    let response = match product {
        Some(product) => (
            StatusCode::OK,
            Json(json!({ "success": true, "product": product })),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "Product not found" })),
        ),
    };
    (store.write_cookies(jar), response).into_response()
}

/// GET /api/shop
pub async fn get_shop(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    jar: CookieJar,
) -> Response {
    let state = state_lock.read().await.clone();
    let store = state.storage.open(&jar);

    let shop = match state.catalog_cache.shop.get(SHOP_CACHE_KEY).await {
        Some(shop) => Some(shop),
        None => {
            let shop = state.marketplace.get_shop(store.as_ref()).await;
            if let Some(shop) = &shop {
                state.catalog_cache.shop.insert(SHOP_CACHE_KEY, shop.clone()).await;
            }
            shop
        }
    };

    let response = match shop {
        Some(shop) => (StatusCode::OK, Json(json!({ "success": true, "shop": shop }))),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "Shop not found" })),
        ),
    };
    (store.write_cookies(jar), response).into_response()
}

/// GET /api/debug/categories
///
/// How the classifier sorted the current catalog. Bypasses the cache.
pub async fn debug_categories(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    jar: CookieJar,
) -> Response {
    let state = state_lock.read().await.clone();
    let store = state.storage.open(&jar);

    let products = state.marketplace.get_products(store.as_ref()).await;

    let body = if products.is_empty() {
        json!({
            "message": "No listings found - marketplace not connected or not configured",
            "categories": {},
            "products": [],
        })
    } else {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for product in &products {
            *counts.entry(product.category.as_str()).or_default() += 1;
        }
        info!(?counts, "Category distribution");

        let detailed: Vec<_> = products
            .iter()
            .map(|p| {
                json!({
                    "id": p.id,
                    "name": p.name,
                    "category": p.category,
                    "tagOnlyCategory": classify(&p.tags, &p.name, None, &[]),
                    "tags": p.tags.iter().take(5).collect::<Vec<_>>(),
                    "etsyUrl": p.marketplace_url,
                })
            })
            .collect();

        json!({
            "totalProducts": products.len(),
            "categories": counts,
            "products": detailed,
            "timestamp": Utc::now().to_rfc3339(),
        })
    };

    (store.write_cookies(jar), Json(body)).into_response()
}
