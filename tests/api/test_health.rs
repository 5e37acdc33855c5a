// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! GET /api/ and GET /api/health tests, plus CORS headers

use super::support::*;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use product_detector::config::Config;
use serde_json::json;
use std::sync::Arc;
use tower::util::ServiceExt;

fn request_with_origin(origin: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri("/api/health")
        .header(header::ORIGIN, origin)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_root_with_model() {
    let app = app(available(Arc::new(StubDetector::empty())));

    let response = app.oneshot(get_request("/api/")).await.unwrap();
    let (status, body) = json_response(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"message": "Product Detector API", "status": "online", "model_loaded": true})
    );
}

#[tokio::test]
async fn test_root_without_trailing_slash() {
    let app = app(unavailable());

    let response = app.oneshot(get_request("/api")).await.unwrap();
    let (status, body) = json_response(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model_loaded"], false);
}

#[tokio::test]
async fn test_health_healthy() {
    let app = app(available(Arc::new(StubDetector::empty())));

    let response = app.oneshot(get_request("/api/health")).await.unwrap();
    let (status, body) = json_response(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy", "model_path": MODEL_PATH}));
}

#[tokio::test]
async fn test_health_model_not_loaded() {
    let app = app(unavailable());

    let response = app.oneshot(get_request("/api/health")).await.unwrap();
    let (status, body) = json_response(response).await;

    // the service itself is up, only the model is missing
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "model not loaded");
    assert_eq!(body["model_path"], MODEL_PATH);
}

#[tokio::test]
async fn test_unknown_route() {
    let app = app(unavailable());

    let response = app.oneshot(get_request("/api/nope")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_any_origin() {
    let app = app(unavailable());

    let response = app
        .oneshot(request_with_origin("http://localhost:3000"))
        .await
        .unwrap();

    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
        .is_none());
}

#[tokio::test]
async fn test_cors_configured_origins() {
    let config = Config {
        allowed_origins: vec![
            "http://localhost:3000".to_string(),
            "https://shop.example.com".to_string(),
        ],
        ..Config::default()
    };
    let app = app_with_config(unavailable(), &config);

    let response = app
        .clone()
        .oneshot(request_with_origin("https://shop.example.com"))
        .await
        .unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://shop.example.com"
    );
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
        "true"
    );

    let response = app
        .oneshot(request_with_origin("https://evil.example.com"))
        .await
        .unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_cors_configured_origins_preflight() {
    let config = Config {
        allowed_origins: vec!["https://shop.example.com".to_string()],
        ..Config::default()
    };
    let app = app_with_config(unavailable(), &config);

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/detect")
        .header(header::ORIGIN, "https://shop.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://shop.example.com");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "authorization");
}
