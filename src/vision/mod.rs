// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing for the detection service
//!
//! This module provides:
//! - Upload decoding into RGB pixel buffers
//! - Object detection behind the `Detector` trait (YOLOv5 via ONNX Runtime)
//! - Formatting of detections into the response schema
//! - Annotated JPEG previews
//!
//! Everything runs on CPU.

pub mod detection;
pub mod formatter;
pub mod image_utils;
pub mod model_manager;
pub mod visualizer;

pub use detection::{
    BoundingBox, ClassCatalog, DetectionError, Detector, DetectorOutput, RawDetection,
    YoloConfig, YoloDetector,
};
pub use formatter::{format_detections, DetectionResult, FormatError, ImageDimensions};
pub use image_utils::{decode_image_bytes, detect_format, ImageError, ImageInfo, PixelBuffer};
pub use model_manager::DetectorHandle;
pub use visualizer::{VisualizationArtifact, VisualizeError, Visualizer};
