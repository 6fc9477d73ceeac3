//! Newsletter handlers

use axum::{
    extract::{rejection::JsonRejection, Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use super::models::{SubscribeRequest, SubscribeResult};
use crate::common::AppState;

/// POST /api/newsletter
///
/// 200 when Mailchimp accepted the address, 400 for every refusal, 500 when
/// the body could not be read at all.
pub async fn subscribe(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    payload: Result<Json<SubscribeRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection, "Unreadable newsletter request");
            let body = SubscribeResult::failed("Er ging iets mis. Probeer het later opnieuw.", None);
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
        }
    };

    let email = match request.email.filter(|e| !e.is_empty()) {
        Some(email) => email,
        None => {
            let body = SubscribeResult::failed("E-mailadres is verplicht.", None);
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
    };

    let newsletter = state_lock.read().await.newsletter.clone();
    let result = newsletter.subscribe(&email).await;

    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(result)).into_response()
}
