//! Integration tests for the HTTP API.
//!
//! Drives the full router (auth, handlers, service, SQLite repository and
//! the synthetic provider) through `tower::ServiceExt::oneshot`.
//!
//! This test requires the `sqlite` feature flag.

#![cfg(feature = "sqlite")]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use fx_hex::{RateService, ServiceConfig, inbound::HttpServer};
use fx_providers::DefaultProviderFactory;
use fx_repo::SqliteRepo;
use fx_repo::security::ApiKeyDigest;

const API_KEY: &str = "fx_test_key";

/// Helper to create a router backed by in-memory SQLite with USD, EUR and
/// GBP registered and the synthetic provider enabled.
async fn create_test_app() -> Router {
    let repo = SqliteRepo::new("sqlite::memory:").await.unwrap();
    let config = ServiceConfig {
        max_resolve_attempts: 3,
        refresh_on_read: false,
        lookback_days: 3,
    };
    let service = RateService::new(repo, Arc::new(DefaultProviderFactory::default()), config);
    let app = HttpServer::new(service, ApiKeyDigest::of(API_KEY)).router();

    for (code, name) in [("USD", "US Dollar"), ("EUR", "Euro"), ("GBP", "Pound Sterling")] {
        let response = app
            .clone()
            .oneshot(post("/api/currencies", json!({"code": code, "name": name})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(post(
            "/api/providers",
            json!({"name": "Mock", "token": "not-a-secret", "priority": 0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    app
}

/// Helper to make an authenticated GET request.
fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("Authorization", format!("Bearer {}", API_KEY))
        .body(Body::empty())
        .unwrap()
}

/// Helper to make an authenticated JSON POST request.
fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", API_KEY))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Helper to make an authenticated JSON PATCH request.
fn patch(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::PATCH)
        .uri(uri)
        .header("Authorization", format!("Bearer {}", API_KEY))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let app = create_test_app().await;

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_api_requires_valid_key() {
    let app = create_test_app().await;

    let missing = Request::builder()
        .uri("/api/currencies")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(missing).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], 401);

    let wrong = Request::builder()
        .uri("/api/currencies")
        .header("Authorization", "Bearer wrong-key")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(wrong).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_currency_registry_endpoints() {
    let app = create_test_app().await;

    let response = app.clone().oneshot(get("/api/currencies")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let codes: Vec<String> = body_json(response)
        .await
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["code"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(codes, vec!["EUR", "GBP", "USD"]);

    let response = app
        .clone()
        .oneshot(post("/api/currencies", json!({"code": "usd", "name": "Dollar"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(post("/api/currencies", json!({"code": "DOLLAR", "name": "Dollar"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.clone().oneshot(get("/api/currencies/gbp")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["name"], "Pound Sterling");

    let response = app.oneshot(get("/api/currencies/JPY")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_provider_token_never_returned() {
    let app = create_test_app().await;

    let response = app.oneshot(get("/api/providers")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json[0]["name"], "Mock");
    assert_eq!(json[0]["priority"], 0);
    assert!(!json.to_string().contains("not-a-secret"));
}

#[tokio::test]
async fn test_rates_are_fetched_then_served_from_cache() {
    let app = create_test_app().await;
    let uri = "/api/rates?source_currency=USD&date_from=2025-01-01&date_to=2025-01-03";

    let response = app.clone().oneshot(get(uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let first = body_json(response).await;

    let days = first.as_object().unwrap();
    assert_eq!(
        days.keys().collect::<Vec<_>>(),
        vec!["2025-01-01", "2025-01-02", "2025-01-03"]
    );
    for rates in days.values() {
        let targets: Vec<_> = rates.as_object().unwrap().keys().collect();
        assert_eq!(targets, vec!["EUR", "GBP"]);
    }

    // The synthetic provider is random; identical output proves the cache.
    let response = app.oneshot(get(uri)).await.unwrap();
    assert_eq!(body_json(response).await, first);
}

#[tokio::test]
async fn test_convert_endpoint() {
    let app = create_test_app().await;

    let response = app
        .oneshot(get(
            "/api/convert?source_currency=USD&exchanged_currency=EUR,XXX&amount=100",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["source_currency"]["USD"], 100.0);
    let converted = json["exchanged_currency"].as_object().unwrap();
    assert_eq!(converted.keys().collect::<Vec<_>>(), vec!["EUR"]);
    let eur = converted["EUR"].as_f64().unwrap();
    assert!((94.9..=105.1).contains(&eur), "converted {}", eur);
}

#[tokio::test]
async fn test_rates_error_statuses() {
    let app = create_test_app().await;

    let response = app
        .clone()
        .oneshot(get(
            "/api/rates?source_currency=USD&date_from=2025-13-01&date_to=2025-01-03",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(get(
            "/api/rates?source_currency=USD&date_from=2025-01-05&date_to=2025-01-01",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(get(
            "/api/rates?source_currency=JPY&date_from=2025-01-01&date_to=2025-01-01",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], 404);
}

#[tokio::test]
async fn test_refresh_reports_every_currency() {
    let app = create_test_app().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/refresh")
        .header("Authorization", format!("Bearer {}", API_KEY))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let refreshed: Vec<_> = json["refreshed"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["currency"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(refreshed, vec!["EUR", "GBP", "USD"]);
}

#[tokio::test]
async fn test_currency_patch_renames_only() {
    let app = create_test_app().await;

    let response = app
        .clone()
        .oneshot(patch(
            "/api/currencies/gbp",
            json!({"name": "British Pound", "symbol": "£", "code": "XXX"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["code"], "GBP");
    assert_eq!(json["name"], "British Pound");

    let response = app
        .clone()
        .oneshot(patch("/api/currencies/JPY", json!({"name": "Yen"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/api/currencies/GBP")).await.unwrap();
    assert_eq!(body_json(response).await["symbol"], "£");
}

#[tokio::test]
async fn test_provider_patch_disables_credential() {
    let app = create_test_app().await;

    let response = app.clone().oneshot(get("/api/providers")).await.unwrap();
    let id = body_json(response).await[0]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(patch(
            &format!("/api/providers/{}", id),
            json!({"enabled": false, "token": "rotated-secret"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["enabled"], false);
    assert!(!json.to_string().contains("rotated-secret"));

    // Nothing enabled is left to fill an empty cache.
    let response = app
        .clone()
        .oneshot(get(
            "/api/rates?source_currency=USD&date_from=2025-01-01&date_to=2025-01-01",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app
        .clone()
        .oneshot(patch(&format!("/api/providers/{}", id), json!({"priority": -3})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(patch(
            "/api/providers/00000000-0000-0000-0000-000000000000",
            json!({"enabled": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oversized_range_rejected() {
    let app = create_test_app().await;

    let response = app
        .oneshot(get(
            "/api/rates?source_currency=USD&date_from=0001-01-01&date_to=9999-12-31",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await["error"].as_str().unwrap().to_string();
    assert!(error.contains("maximum"), "{}", error);
}
