// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Structures raw detector output into the stable response schema
//!
//! Rounding is round-half-away-from-zero (`f64::round`) applied to the
//! value scaled by 10^decimals. Coordinates keep 2 decimals, confidence 3.
//! Detector order is preserved and boxes are passed through as given.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::vision::detection::{ClassCatalog, RawDetection};

/// Decimal places kept for bounding-box coordinates
pub const BBOX_DECIMALS: i32 = 2;

/// Decimal places kept for confidence scores
pub const CONFIDENCE_DECIMALS: i32 = 3;

#[derive(Debug, Error, PartialEq)]
pub enum FormatError {
    /// The model produced a class id that has no name
    #[error("class id {0} not found in class catalog")]
    UnknownClass(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxCoordinates {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedDetection {
    pub bbox: BoxCoordinates,
    pub confidence: f64,
    pub class_id: usize,
    pub class_name: String,
}

/// Formatted detections for one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub image_dimensions: ImageDimensions,
    pub detections: Vec<FormattedDetection>,
    pub total_detections: usize,
}

/// Round to `decimals` places, halves away from zero
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

/// Convert raw detections into a [`DetectionResult`]
///
/// Fails on the first class id missing from `catalog`; no placeholder
/// names are emitted.
pub fn format_detections(
    detections: &[RawDetection],
    catalog: &ClassCatalog,
    image_dimensions: ImageDimensions,
) -> Result<DetectionResult, FormatError> {
    let detections = detections
        .iter()
        .map(|detection| {
            let class_name = catalog
                .get(detection.class_id)
                .ok_or(FormatError::UnknownClass(detection.class_id))?;

            Ok(FormattedDetection {
                bbox: BoxCoordinates {
                    x1: round_to(detection.bbox.x1 as f64, BBOX_DECIMALS),
                    y1: round_to(detection.bbox.y1 as f64, BBOX_DECIMALS),
                    x2: round_to(detection.bbox.x2 as f64, BBOX_DECIMALS),
                    y2: round_to(detection.bbox.y2 as f64, BBOX_DECIMALS),
                },
                confidence: round_to(detection.confidence as f64, CONFIDENCE_DECIMALS),
                class_id: detection.class_id,
                class_name: class_name.to_string(),
            })
        })
        .collect::<Result<Vec<_>, FormatError>>()?;

    Ok(DetectionResult {
        image_dimensions,
        total_detections: detections.len(),
        detections,
    })
}
