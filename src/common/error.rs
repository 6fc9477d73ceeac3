// Error handling types for the API

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt;
use tracing::error;

use crate::storage::StorageError;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    NotConfigured(String),
    InternalServer(String),
    StorageError(StorageError),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotConfigured(msg) => write!(f, "Not Configured: {}", msg),
            ApiError::InternalServer(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::StorageError(e) => write!(f, "Storage Error: {}", e),
        }
    }
}

/// JSON error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_message, code) = match self {
            ApiError::NotConfigured(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg, "NOT_CONFIGURED")
            }
            ApiError::InternalServer(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                msg,
                "INTERNAL_SERVER_ERROR",
            ),
            ApiError::StorageError(e) => {
                error!(error = %e, "Token storage error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Token storage operation failed".to_string(),
                    "STORAGE_ERROR",
                )
            }
        };

        let error_response = ErrorResponse {
            error: error_message,
            code: code.to_string(),
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError::StorageError(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_configured_maps_to_500() {
        let response = ApiError::NotConfigured("ETSY_API_KEY not configured".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_error_body_carries_code() {
        let response = ApiError::InternalServer("boom".into()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "boom");
        assert_eq!(json["code"], "INTERNAL_SERVER_ERROR");
    }

    #[test]
    fn test_storage_error_hides_details() {
        let err = ApiError::from(StorageError::Backend("connection refused".into()));
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
