// src/main.rs
use axum::{extract::Extension, middleware, routing::get, Json, Router};
use dotenv::dotenv;
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod common;
mod instagram;
mod logging_middleware;
mod marketplace;
mod newsletter;
mod oauth;
mod services;
mod storage;

// ============================================================================
// COMMON IMPORTS
// ============================================================================

use common::config::AppConfig;
use common::AppState;
use services::monitoring::{MonitoringConfig, MonitoringService};

// ============================================================================
// ROUTER COMPOSITION
// ============================================================================

/// The full application router around already-built shared state
pub fn build_app(shared: Arc<RwLock<AppState>>, cors_origins: &[String]) -> Router {
    let origins: Vec<axum::http::HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    Router::new()
        // ====================================================================
        // OAUTH ROUTES (Admin connection to the marketplace)
        // ====================================================================
        .merge(oauth::oauth_routes())
        // ====================================================================
        // CATALOG ROUTES (Products, Shop)
        // ====================================================================
        .merge(marketplace::marketplace_routes())
        // ====================================================================
        // HOMEPAGE ROUTES (Newsletter sign-up, Instagram feed)
        // ====================================================================
        .merge(newsletter::newsletter_routes())
        .merge(instagram::instagram_routes())
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        // ====================================================================
        // MIDDLEWARE AND LAYERS
        // ====================================================================
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(Extension(shared))
        .layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                    axum::http::HeaderName::from_static("x-request-id"),
                ])
                .allow_credentials(true),
        )
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Sentry must be up before the subscriber so its layer has a client
    let monitoring = MonitoringService::init(&MonitoringConfig::from_env());

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(sentry_tracing::layer())
        .init();

    if monitoring.is_enabled() {
        info!("Error reporting enabled");
    }

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let config = AppConfig::from_env();
    info!(
        environment = %config.environment,
        site_url = %config.site_url,
        storage = config.storage.kind.as_str(),
        "Configuration loaded"
    );

    if !config.marketplace.is_configured() {
        warn!("ETSY_API_KEY or ETSY_SHOP_ID not set, the catalog will be empty");
    }
    if !config.newsletter.is_configured() {
        warn!("Mailchimp not configured, newsletter sign-ups will be refused");
    }

    // ========================================================================
    // DIRECTORY SETUP
    // ========================================================================

    if config.storage.kind == common::config::StorageKind::File {
        tokio::fs::create_dir_all(&config.storage.data_dir).await?;
    }

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let port = config.port;
    let cors_origins = config.cors_origins.clone();

    let app_state = AppState::new(config)?;
    info!(backend = app_state.storage.name(), "Token storage initialized");

    let shared = Arc::new(RwLock::new(app_state));
    let app = build_app(shared, &cors_origins);

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::TempDir::new().unwrap();
        let state = AppState::new(AppConfig::for_tests(dir.path(), "http://127.0.0.1:9")).unwrap();
        let app = build_app(Arc::new(RwLock::new(state)), &[]);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }
}
