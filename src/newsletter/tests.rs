// Newsletter endpoint tests against a mocked Mailchimp audience

use super::models::SubscribeResult;
use crate::build_app;
use crate::common::config::AppConfig;
use crate::common::AppState;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::RwLock;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MEMBERS_PATH: &str = "/mailchimp/3.0/lists/test-audience/members";

struct TestApp {
    app: Router,
    server: MockServer,
    _dir: TempDir,
}

async fn spawn_app_with(customize: impl FnOnce(&mut AppConfig)) -> TestApp {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = AppConfig::for_tests(dir.path(), &server.uri());
    customize(&mut config);

    let state = AppState::new(config).expect("test state");
    TestApp {
        app: build_app(Arc::new(RwLock::new(state)), &[]),
        server,
        _dir: dir,
    }
}

async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

impl TestApp {
    async fn post_raw(&self, body: &str) -> Response {
        let request = Request::post("/api/newsletter")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn subscribe(&self, body: Value) -> (StatusCode, SubscribeResult) {
        let response = self.post_raw(&body.to_string()).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn mock_members(&self, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(MEMBERS_PATH))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }

    async fn expect_no_upstream_call(&self) {
        Mock::given(method("POST"))
            .and(path(MEMBERS_PATH))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&self.server)
            .await;
    }
}

fn problem(title: &str, detail: &str, status: u16) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "title": title,
        "detail": detail,
        "status": status,
    }))
}

#[tokio::test]
async fn test_subscribe_creates_pending_member() {
    let app = spawn_app().await;
    Mock::given(method("POST"))
        .and(path(MEMBERS_PATH))
        .and(wiremock::matchers::header("authorization", "apikey test-mailchimp-key"))
        .and(body_partial_json(json!({
            "email_address": "nina@example.nl",
            "status": "pending",
            "tags": ["Website", "Homepage"],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "abc" })))
        .expect(1)
        .mount(&app.server)
        .await;

    let (status, result) = app.subscribe(json!({ "email": "nina@example.nl" })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(result.success);
    assert!(result.message.starts_with("Bedankt!"));
    assert_eq!(result.error, None);
}

#[tokio::test]
async fn test_missing_email_is_rejected_locally() {
    let app = spawn_app().await;
    app.expect_no_upstream_call().await;

    for body in [json!({}), json!({ "email": "" })] {
        let (status, result) = app.subscribe(body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!result.success);
        assert_eq!(result.message, "E-mailadres is verplicht.");
    }
}

#[tokio::test]
async fn test_invalid_email_is_rejected_locally() {
    let app = spawn_app().await;
    app.expect_no_upstream_call().await;

    let (status, result) = app.subscribe(json!({ "email": "nina@example" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(result.message, "Vul een geldig e-mailadres in.");
    assert_eq!(result.error.as_deref(), Some("Invalid email format"));
}

#[tokio::test]
async fn test_existing_member() {
    let app = spawn_app().await;
    app.mock_members(problem(
        "Member Exists",
        "nina@example.nl is already a list member.",
        400,
    ))
    .await;

    let (status, result) = app.subscribe(json!({ "email": "nina@example.nl" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(result.message, "Je bent al ingeschreven voor onze nieuwsbrief! 💕");
    assert_eq!(result.error.as_deref(), Some("Member already exists"));
}

#[tokio::test]
async fn test_invalid_resource_keeps_mailchimp_detail() {
    let app = spawn_app().await;
    app.mock_members(problem(
        "Invalid Resource",
        "Please provide a valid email address.",
        400,
    ))
    .await;

    let (status, result) = app.subscribe(json!({ "email": "nina@example.nl" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(result.message, "Dit e-mailadres lijkt niet geldig te zijn.");
    assert_eq!(result.error.as_deref(), Some("Please provide a valid email address."));
}

#[tokio::test]
async fn test_other_mailchimp_errors_are_generic() {
    let app = spawn_app().await;
    app.mock_members(problem("Internal Server Error", "Try again later.", 500))
        .await;

    let (status, result) = app.subscribe(json!({ "email": "nina@example.nl" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(result.message, "Er ging iets mis. Probeer het later opnieuw.");
    assert_eq!(result.error.as_deref(), Some("Try again later."));
}

#[tokio::test]
async fn test_unconfigured_audience() {
    let app = spawn_app_with(|config| config.newsletter.audience_id = None).await;
    app.expect_no_upstream_call().await;

    let (status, result) = app.subscribe(json!({ "email": "nina@example.nl" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(result.message, "Nieuwsbrief service is tijdelijk niet beschikbaar.");
    assert_eq!(result.error.as_deref(), Some("Missing configuration"));
}

#[tokio::test]
async fn test_unreachable_mailchimp() {
    let app = spawn_app_with(|config| {
        config.newsletter.api_base = Some("http://127.0.0.1:9/3.0".to_string())
    })
    .await;

    let (status, result) = app.subscribe(json!({ "email": "nina@example.nl" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        result.message,
        "Er ging iets mis met de verbinding. Probeer het later opnieuw."
    );
    assert!(result.error.is_some());
}

#[tokio::test]
async fn test_malformed_body_is_a_server_error() {
    let app = spawn_app().await;
    app.expect_no_upstream_call().await;

    let response = app.post_raw("{not json").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let result: SubscribeResult = serde_json::from_slice(&bytes).unwrap();
    assert!(!result.success);
    assert_eq!(result.message, "Er ging iets mis. Probeer het later opnieuw.");
}
