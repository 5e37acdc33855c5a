// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! DetectorHandle loading tests
//!
//! A model that cannot be loaded never aborts startup; the handle is
//! simply unavailable and reports the configured path.

use product_detector::config::Config;
use product_detector::vision::{DetectionError, DetectorHandle, YoloConfig, YoloDetector};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

#[tokio::test]
async fn test_missing_model_file() {
    let config = YoloConfig {
        model_path: "/nonexistent/models/best.onnx".into(),
        ..YoloConfig::default()
    };

    let err = YoloDetector::new(config.clone()).await.unwrap_err();
    assert!(err.to_string().contains("not found"));

    let handle = DetectorHandle::load(config).await;
    assert!(!handle.is_available());
    assert_eq!(handle.model_path(), "/nonexistent/models/best.onnx");
}

#[tokio::test]
async fn test_corrupt_model_file_is_unavailable() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"this is not an onnx graph").unwrap();

    let handle = DetectorHandle::load(YoloConfig {
        model_path: file.path().to_path_buf(),
        ..YoloConfig::default()
    })
    .await;

    assert!(!handle.is_available());
    assert!(matches!(handle.detector(), Err(DetectionError::Unavailable)));
}

#[test]
fn test_config_to_detector_settings() {
    let config = Config {
        model_path: "/srv/shelf.onnx".into(),
        confidence_threshold: 0.4,
        iou_threshold: 0.5,
        max_detections: 50,
        model_input_size: 320,
        class_names_path: Some("/srv/names.txt".into()),
        ..Config::default()
    };

    let yolo = config.yolo_config();
    assert_eq!(yolo.model_path, PathBuf::from("/srv/shelf.onnx"));
    assert_eq!(yolo.confidence_threshold, 0.4);
    assert_eq!(yolo.iou_threshold, 0.5);
    assert_eq!(yolo.max_detections, 50);
    assert_eq!(yolo.input_size, 320);
    assert_eq!(yolo.class_names_path, Some(PathBuf::from("/srv/names.txt")));
}
