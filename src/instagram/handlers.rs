//! Instagram feed handler

use axum::{
    extract::{Extension, Json},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::client::DEFAULT_POST_LIMIT;
use crate::common::AppState;

/// GET /api/instagram
///
/// Always 200; an unavailable API yields the fallback posts.
pub async fn list_posts(Extension(state_lock): Extension<Arc<RwLock<AppState>>>) -> Response {
    let instagram = state_lock.read().await.instagram.clone();
    let posts = instagram.get_posts_with_fallback(DEFAULT_POST_LIMIT).await;

    Json(json!({
        "success": true,
        "count": posts.len(),
        "posts": posts,
    }))
    .into_response()
}
