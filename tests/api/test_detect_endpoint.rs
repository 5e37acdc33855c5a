// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /api/detect tests
//!
//! Drives the full router with a stub detector:
//! - response schema and rounding for a known detection
//! - availability checked before the upload is read
//! - decode, missing field, catalog and size failures

use super::support::*;
use axum::http::StatusCode;
use product_detector::config::Config;
use product_detector::vision::{BoundingBox, RawDetection};
use serde_json::json;
use std::sync::Arc;
use tower::util::ServiceExt;

#[tokio::test]
async fn test_detect_single_widget() {
    let detector = Arc::new(StubDetector::widget());
    let app = app(available(detector.clone()));

    let response = app
        .oneshot(upload_request("/api/detect", "file", &black_jpeg(100, 100)))
        .await
        .unwrap();
    let (status, body) = json_response(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "success": true,
            "image_dimensions": {"width": 100, "height": 100},
            "detections": [{
                "bbox": {"x1": 10.0, "y1": 10.0, "x2": 50.0, "y2": 50.0},
                "confidence": 0.877,
                "class_id": 0,
                "class_name": "widget"
            }],
            "total_detections": 1
        })
    );
    assert_eq!(detector.calls(), 1);
}

#[tokio::test]
async fn test_detect_has_no_visualized_image() {
    let app = app(available(Arc::new(StubDetector::widget())));

    let response = app
        .oneshot(upload_request("/api/detect", "file", &png(32, 24)))
        .await
        .unwrap();
    let (status, body) = json_response(response).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.get("visualized_image").is_none());
    assert_eq!(body["image_dimensions"], json!({"width": 32, "height": 24}));
}

#[tokio::test]
async fn test_detect_zero_detections() {
    let app = app(available(Arc::new(StubDetector::empty())));

    let response = app
        .oneshot(upload_request("/api/detect", "file", &black_jpeg(64, 48)))
        .await
        .unwrap();
    let (status, body) = json_response(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_detections"], 0);
    assert_eq!(body["detections"], json!([]));
}

#[tokio::test]
async fn test_total_matches_detection_count() {
    let detections = (0..5)
        .map(|i| RawDetection {
            bbox: BoundingBox::new(i as f32 * 10.0, 0.0, i as f32 * 10.0 + 8.0, 8.0),
            confidence: 0.9 - i as f32 * 0.1,
            class_id: i % 2,
        })
        .collect();
    let detector = Arc::new(StubDetector::new(detections, &["bottle", "box"]));
    let app = app(available(detector));

    let response = app
        .oneshot(upload_request("/api/detect", "file", &png(64, 64)))
        .await
        .unwrap();
    let (status, body) = json_response(response).await;

    assert_eq!(status, StatusCode::OK);
    let items = body["detections"].as_array().unwrap();
    assert_eq!(items.len(), 5);
    assert_eq!(body["total_detections"], 5);
    // detector order preserved
    assert_eq!(items[0]["confidence"], 0.9);
    assert_eq!(items[1]["class_name"], "box");
}

#[tokio::test]
async fn test_model_not_loaded() {
    let app = app(unavailable());

    let response = app
        .oneshot(upload_request("/api/detect", "file", &black_jpeg(16, 16)))
        .await
        .unwrap();
    let (status, body) = json_response(response).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"detail": "Model not loaded"}));
}

#[tokio::test]
async fn test_model_not_loaded_checked_before_upload() {
    let app = app(unavailable());

    // no `file` field: availability still wins over the missing upload
    let response = app
        .oneshot(upload_request("/api/detect", "image", b"ignored"))
        .await
        .unwrap();
    let (status, body) = json_response(response).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "Model not loaded");
}

#[tokio::test]
async fn test_undecodable_upload() {
    let detector = Arc::new(StubDetector::widget());
    let app = app(available(detector.clone()));

    let response = app
        .oneshot(upload_request("/api/detect", "file", b"definitely not an image"))
        .await
        .unwrap();
    let (status, body) = json_response(response).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .starts_with("Error processing image: "));
    assert_eq!(detector.calls(), 0, "detector must not run on a failed decode");
}

#[tokio::test]
async fn test_empty_upload() {
    let app = app(available(Arc::new(StubDetector::widget())));

    let response = app
        .oneshot(upload_request("/api/detect", "file", b""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_file_field() {
    let app = app(available(Arc::new(StubDetector::widget())));

    let response = app
        .oneshot(upload_request("/api/detect", "image", &black_jpeg(16, 16)))
        .await
        .unwrap();
    let (status, body) = json_response(response).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"], "Field required: file");
}

#[tokio::test]
async fn test_unknown_class_is_server_error() {
    let detector = StubDetector::new(
        vec![RawDetection {
            bbox: BoundingBox::new(1.0, 1.0, 5.0, 5.0),
            confidence: 0.5,
            class_id: 7,
        }],
        &["widget"],
    );
    let app = app(available(Arc::new(detector)));

    let response = app
        .oneshot(upload_request("/api/detect", "file", &png(16, 16)))
        .await
        .unwrap();
    let (status, body) = json_response(response).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("class id 7"));
    assert!(body.get("detections").is_none());
}

#[tokio::test]
async fn test_upload_over_limit() {
    let config = Config {
        max_upload_bytes: 1024,
        ..Config::default()
    };
    let app = app_with_config(available(Arc::new(StubDetector::widget())), &config);

    let response = app
        .oneshot(upload_request("/api/detect", "file", &vec![0u8; 8 * 1024]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_concurrent_requests() {
    let detector = Arc::new(StubDetector::widget());
    let app = app(available(detector.clone()));
    let image = black_jpeg(100, 100);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let app = app.clone();
            let request = upload_request("/api/detect", "file", &image);
            tokio::spawn(async move { app.oneshot(request).await.unwrap() })
        })
        .collect();

    for handle in handles {
        let (status, body) = json_response(handle.await.unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_detections"], 1);
    }
    assert_eq!(detector.calls(), 8);
}

#[tokio::test]
async fn test_detect_rejects_get() {
    let app = app(available(Arc::new(StubDetector::widget())));

    let response = app.oneshot(get_request("/api/detect")).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_non_multipart_body_model_not_loaded() {
    let app = app(unavailable());

    let response = app.oneshot(json_request("/api/detect")).await.unwrap();
    let (status, body) = json_response(response).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"detail": "Model not loaded"}));
}

#[tokio::test]
async fn test_non_multipart_body() {
    let detector = Arc::new(StubDetector::widget());
    let app = app(available(detector.clone()));

    let response = app.oneshot(json_request("/api/detect")).await.unwrap();
    let (status, body) = json_response(response).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("Error processing image: expected multipart/form-data"));
    assert_eq!(detector.calls(), 0);
}

#[tokio::test]
async fn test_large_upload_under_raised_limit() {
    let config = Config {
        max_upload_bytes: 64 * 1024 * 1024,
        ..Config::default()
    };
    let app = app_with_config(available(Arc::new(StubDetector::widget())), &config);

    // 1900x1900 24-bit BMP, a little over 10 MiB
    let image = bmp(1900, 1900);
    assert!(image.len() > 10 * 1024 * 1024);

    let response = app
        .oneshot(upload_request("/api/detect", "file", &image))
        .await
        .unwrap();
    let (status, body) = json_response(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["image_dimensions"], json!({"width": 1900, "height": 1900}));
    assert_eq!(body["total_detections"], 1);
}
