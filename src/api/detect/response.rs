// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection response types

use serde::{Deserialize, Serialize};

use crate::vision::DetectionResult;

/// Response from POST /api/detect and POST /api/detect/visualize
///
/// The formatted result is flattened into the top level:
/// `{success, image_dimensions, detections, total_detections[, visualized_image]}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectResponse {
    pub success: bool,
    #[serde(flatten)]
    pub result: DetectionResult,
    /// `data:image/jpeg;base64,...`, visualize endpoint only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visualized_image: Option<String>,
}

impl DetectResponse {
    pub fn new(result: DetectionResult, visualized_image: Option<String>) -> Self {
        Self {
            success: true,
            result,
            visualized_image,
        }
    }
}
