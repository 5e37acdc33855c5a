// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process-wide handle to the loaded detection model

use std::fmt;
use std::sync::Arc;

use crate::vision::detection::{DetectionError, Detector, YoloConfig, YoloDetector};

/// The detector the service was started with, or an explicit "unavailable"
///
/// Built once at startup and shared read-only across requests. A model
/// that fails to load leaves the handle unavailable instead of aborting
/// startup; every request checks availability first.
#[derive(Clone)]
pub struct DetectorHandle {
    detector: Option<Arc<dyn Detector>>,
    model_path: String,
}

impl fmt::Debug for DetectorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorHandle")
            .field("model_path", &self.model_path)
            .field("available", &self.is_available())
            .finish()
    }
}

impl DetectorHandle {
    /// Load the YOLO model described by `config`
    ///
    /// Never fails: load errors are logged and yield an unavailable handle.
    pub async fn load(config: YoloConfig) -> Self {
        let model_path = config.model_path.display().to_string();
        match YoloDetector::new(config).await {
            Ok(detector) => {
                tracing::info!("✅ Detection model loaded from {}", model_path);
                Self::available(Arc::new(detector), model_path)
            }
            Err(e) => {
                tracing::warn!("⚠️ Failed to load detection model from {}: {:#}", model_path, e);
                Self::unavailable(model_path)
            }
        }
    }

    pub fn available(detector: Arc<dyn Detector>, model_path: impl Into<String>) -> Self {
        Self {
            detector: Some(detector),
            model_path: model_path.into(),
        }
    }

    pub fn unavailable(model_path: impl Into<String>) -> Self {
        Self {
            detector: None,
            model_path: model_path.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.detector.is_some()
    }

    /// Get the detector, or [`DetectionError::Unavailable`]
    pub fn detector(&self) -> Result<Arc<dyn Detector>, DetectionError> {
        self.detector.clone().ok_or(DetectionError::Unavailable)
    }

    /// Configured model path, reported by the health endpoint
    pub fn model_path(&self) -> &str {
        &self.model_path
    }
}
