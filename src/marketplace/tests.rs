// Listing mapping and catalog endpoint tests

use super::client::{map_listing_to_product, PLACEHOLDER_IMAGE};
use super::models::{Category, Listing, ListingProperty, TaxonomyInfo, TaxonomyNode};
use crate::build_app;
use crate::common::config::AppConfig;
use crate::common::AppState;
use crate::oauth::models::TokenUpdate;
use crate::storage::{FileTokenStore, TokenStore};
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::RwLock;
use tower::ServiceExt;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTINGS_PATH: &str = "/v3/application/shops/12345678/listings/active";
const SHOP_PATH: &str = "/v3/application/shops/12345678";

fn listing(value: Value) -> Listing {
    serde_json::from_value(value).unwrap()
}

fn listing_json(id: i64, title: &str, tags: &[&str]) -> Value {
    json!({
        "listing_id": id,
        "title": title,
        "description": "Handmade",
        "state": "active",
        "created_timestamp": (Utc::now() - Duration::days(90)).timestamp(),
        "quantity": 2,
        "url": format!("https://www.etsy.com/listing/{}", id),
        "num_favorers": 3,
        "tags": tags,
        "materials": [],
        "price": { "amount": 1850, "divisor": 100, "currency_code": "EUR" },
        "images": [],
    })
}

// ---------------------------------------------------------------------------
// map_listing_to_product
// ---------------------------------------------------------------------------

#[test]
fn test_price_and_images() {
    let mut value = listing_json(7, "Silver ring", &["ring"]);
    value["images"] = json!([
        { "url_570xN": "https://img/1_570.jpg", "url_fullxfull": "https://img/1_full.jpg" },
        { "url_570xN": "https://img/2_570.jpg", "url_fullxfull": "https://img/2_full.jpg" },
    ]);

    let product = map_listing_to_product(&listing(value), None, &[], Utc::now());

    assert_eq!(product.id, "7");
    assert_eq!(product.listing_id, 7);
    assert!((product.price - 18.5).abs() < f64::EPSILON);
    assert_eq!(product.currency, "EUR");
    assert_eq!(product.image, "https://img/1_570.jpg");
    assert_eq!(product.images, vec!["https://img/1_full.jpg", "https://img/2_full.jpg"]);
    assert_eq!(product.category, Category::Rings);
    assert_eq!(product.marketplace_url, "https://www.etsy.com/listing/7");
}

#[test]
fn test_missing_images_use_placeholder() {
    let mut value = listing_json(8, "Silver ring", &[]);
    value.as_object_mut().unwrap().remove("images");

    let product = map_listing_to_product(&listing(value), None, &[], Utc::now());
    assert_eq!(product.image, PLACEHOLDER_IMAGE);
    assert_eq!(product.images, vec![PLACEHOLDER_IMAGE]);
}

#[test]
fn test_new_and_bestseller_flags() {
    let now = Utc::now();

    let mut value = listing_json(9, "Gift", &[]);
    value["created_timestamp"] = json!((now - Duration::days(5)).timestamp());
    value["num_favorers"] = json!(11);
    let product = map_listing_to_product(&listing(value), None, &[], now);
    assert!(product.is_new);
    assert!(product.is_bestseller);

    let mut value = listing_json(10, "Gift", &[]);
    value["created_timestamp"] = json!((now - Duration::days(31)).timestamp());
    value["num_favorers"] = json!(10);
    let product = map_listing_to_product(&listing(value), None, &[], now);
    assert!(!product.is_new);
    assert!(!product.is_bestseller);
}

#[test]
fn test_stock_needs_quantity_and_active_state() {
    let now = Utc::now();

    let product = map_listing_to_product(&listing(listing_json(11, "Gift", &[])), None, &[], now);
    assert!(product.in_stock);

    let mut value = listing_json(12, "Gift", &[]);
    value["quantity"] = json!(0);
    assert!(!map_listing_to_product(&listing(value), None, &[], now).in_stock);

    let mut value = listing_json(13, "Gift", &[]);
    value["state"] = json!("sold_out");
    assert!(!map_listing_to_product(&listing(value), None, &[], now).in_stock);
}

#[test]
fn test_taxonomy_and_properties_feed_the_classifier() {
    let now = Utc::now();
    let plain = listing(listing_json(14, "Handmade gift", &[]));

    let taxonomy = TaxonomyInfo {
        node: TaxonomyNode {
            id: 1217,
            name: "Hoops".to_string(),
            level: 3,
            parent_id: Some(1210),
        },
        path: Vec::new(),
    };
    assert_eq!(
        map_listing_to_product(&plain, Some(&taxonomy), &[], now).category,
        Category::Earrings
    );

    let properties = vec![ListingProperty {
        property_id: 46803063641,
        property_name: Some("Jewelry type".to_string()),
        values: vec!["Choker".to_string()],
    }];
    assert_eq!(
        map_listing_to_product(&plain, None, &properties, now).category,
        Category::Necklaces
    );

    assert_eq!(
        map_listing_to_product(&plain, None, &[], now).category,
        Category::Bracelets
    );
}

// ---------------------------------------------------------------------------
// Catalog endpoints
// ---------------------------------------------------------------------------

struct TestApp {
    app: Router,
    dir: TempDir,
    server: MockServer,
}

async fn spawn_app() -> TestApp {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let state = AppState::new(AppConfig::for_tests(dir.path(), &server.uri())).expect("test state");

    TestApp {
        app: build_app(Arc::new(RwLock::new(state)), &[]),
        dir,
        server,
    }
}

impl TestApp {
    async fn get(&self, uri: &str) -> Response {
        self.app
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let response = self.get(uri).await;
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn connect(&self, expires_at: chrono::DateTime<Utc>) {
        FileTokenStore::new(self.dir.path())
            .save_tokens(TokenUpdate {
                access_token: Some("12345678.access".to_string()),
                refresh_token: Some("12345678.refresh".to_string()),
                expires_at: Some(expires_at),
                ..Default::default()
            })
            .await
            .unwrap();
    }

    async fn mock_listings(&self, body: Value, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path(LISTINGS_PATH))
            .and(query_param("limit", "100"))
            .and(query_param("includes", "images"))
            .and(header("x-api-key", "test-api-key"))
            .and(header("authorization", "Bearer 12345678.access"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }

    async fn properties_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path().ends_with("/properties"))
            .count()
    }
}

fn categories_by_id(products: &Value) -> Vec<(String, String)> {
    products
        .as_array()
        .unwrap()
        .iter()
        .map(|p| {
            (
                p["id"].as_str().unwrap().to_string(),
                p["category"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_products_empty_when_not_connected() {
    let app = spawn_app().await;

    let (status, body) = app.get_json("/api/products").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 0);
    assert_eq!(body["products"], json!([]));

    // no token, so the marketplace is never asked
    assert!(app.server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_products_empty_on_marketplace_error() {
    let app = spawn_app().await;
    app.connect(Utc::now() + Duration::hours(1)).await;

    Mock::given(method("GET"))
        .and(path(LISTINGS_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(2)
        .mount(&app.server)
        .await;

    let (status, body) = app.get_json("/api/products").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);

    // empty results are not cached, the next request retries
    let (_, body) = app.get_json("/api/products").await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_products_classified_and_cached() {
    let app = spawn_app().await;
    app.connect(Utc::now() + Duration::hours(1)).await;

    let mut ring = listing_json(1, "Silver ring", &["ring"]);
    ring["taxonomy_id"] = json!(1200);
    let unknown = listing_json(2, "Handmade gift", &[]);
    let anklet = listing_json(3, "Beaded piece", &["armband"]);
    app.mock_listings(json!({ "count": 3, "results": [ring, unknown, anklet] }), 1)
        .await;

    Mock::given(method("GET"))
        .and(path("/v3/application/buyer-taxonomy/nodes/1200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1200, "name": "Rings", "level": 1, "parent_id": null
        })))
        .expect(1)
        .mount(&app.server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v3/application/shops/12345678/listings/2/properties"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "results": [
                { "property_id": 46803063641_i64, "property_name": "Jewelry type", "values": ["Hoop earrings"] }
            ]
        })))
        .expect(1)
        .mount(&app.server)
        .await;

    let (status, body) = app.get_json("/api/products").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(
        categories_by_id(&body["products"]),
        vec![
            ("1".to_string(), "rings".to_string()),
            ("2".to_string(), "earrings".to_string()),
            ("3".to_string(), "bracelets".to_string()),
        ]
    );
    assert_eq!(body["products"][0]["etsyListingId"], 1);
    assert_eq!(body["products"][0]["inStock"], true);

    // properties only for the listing nothing else could classify
    assert_eq!(app.properties_requests().await, 1);

    // second request comes from the catalog cache
    let (_, cached) = app.get_json("/api/products").await;
    assert_eq!(cached["count"], 3);
}

#[tokio::test]
async fn test_product_by_id() {
    let app = spawn_app().await;
    app.connect(Utc::now() + Duration::hours(1)).await;
    app.mock_listings(
        json!({ "results": [listing_json(42, "Silver ring", &["ring"])] }),
        2,
    )
    .await;

    let (status, body) = app.get_json("/api/products/42").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["product"]["name"], "Silver ring");

    // the catalog cache is cold, so each lookup asks the marketplace
    let (status, body) = app.get_json("/api/products/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Product not found");
}

#[tokio::test]
async fn test_expired_token_is_refreshed_before_listing() {
    let app = spawn_app().await;
    app.connect(Utc::now() - Duration::minutes(5)).await;

    Mock::given(method("POST"))
        .and(path("/v3/public/oauth/token"))
        .and(wiremock::matchers::body_string_contains("grant_type=refresh_token"))
        .and(wiremock::matchers::body_string_contains("refresh_token=12345678.refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "12345678.fresh",
            "expires_in": 3600,
            "token_type": "Bearer",
        })))
        .expect(1)
        .mount(&app.server)
        .await;

    Mock::given(method("GET"))
        .and(path(LISTINGS_PATH))
        .and(header("authorization", "Bearer 12345678.fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [listing_json(5, "Silver ring", &["ring"])]
        })))
        .expect(1)
        .mount(&app.server)
        .await;

    let (_, body) = app.get_json("/api/products").await;
    assert_eq!(body["count"], 1);

    let stored = FileTokenStore::new(app.dir.path()).load_tokens().await.unwrap();
    assert_eq!(stored.access_token, "12345678.fresh");
    assert_eq!(stored.refresh_token, "12345678.refresh");
}

#[tokio::test]
async fn test_shop_cached() {
    let app = spawn_app().await;

    Mock::given(method("GET"))
        .and(path(SHOP_PATH))
        .and(header("x-api-key", "test-api-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "shop_id": 12345678,
            "shop_name": "LaNinaJewelry",
            "currency_code": "EUR",
            "listing_active_count": 3,
        })))
        .expect(1)
        .mount(&app.server)
        .await;

    let (status, body) = app.get_json("/api/shop").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["shop"]["shop_name"], "LaNinaJewelry");

    let (status, _) = app.get_json("/api/shop").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_shop_not_found() {
    let app = spawn_app().await;

    Mock::given(method("GET"))
        .and(path(SHOP_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&app.server)
        .await;

    let (status, body) = app.get_json("/api/shop").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Shop not found");
}

#[tokio::test]
async fn test_debug_categories() {
    let app = spawn_app().await;

    let (status, body) = app.get_json("/api/debug/categories").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["categories"], json!({}));

    app.connect(Utc::now() + Duration::hours(1)).await;
    app.mock_listings(
        json!({ "results": [
            listing_json(1, "Silver ring", &["ring"]),
            listing_json(2, "Gold ring", &["ring"]),
            listing_json(3, "Charm", &["ketting"]),
        ] }),
        1,
    )
    .await;

    let (_, body) = app.get_json("/api/debug/categories").await;
    assert_eq!(body["totalProducts"], 3);
    assert_eq!(body["categories"]["rings"], 2);
    assert_eq!(body["categories"]["necklaces"], 1);
    assert_eq!(body["products"][2]["tagOnlyCategory"], "necklaces");
}
