// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLOv5 detector backed by ONNX Runtime
//!
//! Expects an ultralytics YOLOv5 ONNX export: one `[1, 3, S, S]` input and
//! one `[1, N, 5 + C]` output of `(cx, cy, w, h, objectness, class scores)`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use tracing::{debug, info};

use super::postprocessing::{decode_predictions, non_maximum_suppression, restore_coordinates};
use super::preprocessing::{preprocess_for_detection, DEFAULT_INPUT_SIZE};
use super::{ClassCatalog, DetectionError, Detector, DetectorOutput};
use crate::vision::image_utils::PixelBuffer;

/// Settings fixed when the model is loaded
#[derive(Debug, Clone)]
pub struct YoloConfig {
    /// Path to the ONNX model file
    pub model_path: PathBuf,
    /// Minimum score for a detection to be reported
    pub confidence_threshold: f32,
    /// IoU above which same-class boxes are merged
    pub iou_threshold: f32,
    /// Upper bound on detections per image
    pub max_detections: usize,
    /// Square input size the model was exported with
    pub input_size: u32,
    /// Optional class names file, one per line
    pub class_names_path: Option<PathBuf>,
}

impl Default for YoloConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./models/best.onnx"),
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 1000,
            input_size: DEFAULT_INPUT_SIZE,
            class_names_path: None,
        }
    }
}

/// YOLOv5 object detector
///
/// Runs on CPU. The ONNX session needs exclusive access per run, so
/// concurrent requests queue on the session mutex.
pub struct YoloDetector {
    /// ONNX Runtime session (one inference in flight at a time)
    session: Mutex<Session>,
    /// Model input name
    input_name: String,
    catalog: Arc<ClassCatalog>,
    confidence_threshold: f32,
    iou_threshold: f32,
    max_detections: usize,
    input_size: u32,
}

impl fmt::Debug for YoloDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YoloDetector")
            .field("input_name", &self.input_name)
            .field("classes", &self.catalog.len())
            .field("confidence_threshold", &self.confidence_threshold)
            .field("iou_threshold", &self.iou_threshold)
            .field("input_size", &self.input_size)
            .finish_non_exhaustive()
    }
}

impl YoloDetector {
    /// Load the detection model from disk
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    /// - No class names are available (neither a names file nor model metadata)
    pub async fn new(config: YoloConfig) -> Result<Self> {
        let model_path = config.model_path.as_path();

        if !model_path.exists() {
            anyhow::bail!("Detection model not found: {}", model_path.display());
        }

        info!("Loading detection model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load detection model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        let catalog = match config.class_names_path.as_deref() {
            Some(path) => load_names_file(path)?,
            None => {
                let raw = session
                    .metadata()
                    .ok()
                    .and_then(|metadata| metadata.custom("names").ok().flatten())
                    .context(
                        "Model has no class names metadata; set CLASS_NAMES_PATH to a names file",
                    )?;
                ClassCatalog::from_metadata(&raw)
                    .context(format!("Unrecognized class names metadata: {}", raw))?
            }
        };

        debug!(
            "Detection model loaded - input: {}, classes: {}",
            input_name,
            catalog.len()
        );

        info!(
            "✅ Detection model loaded ({} classes, confidence >= {:.2})",
            catalog.len(),
            config.confidence_threshold
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            catalog: Arc::new(catalog),
            confidence_threshold: config.confidence_threshold.clamp(0.0, 1.0),
            iou_threshold: config.iou_threshold.clamp(0.0, 1.0),
            max_detections: config.max_detections.max(1),
            input_size: config.input_size,
        })
    }
}

fn load_names_file(path: &Path) -> Result<ClassCatalog> {
    let catalog = ClassCatalog::from_file(path)
        .context(format!("Failed to read class names from {}", path.display()))?;
    if catalog.is_empty() {
        anyhow::bail!("Class names file {} is empty", path.display());
    }
    Ok(catalog)
}

impl Detector for YoloDetector {
    fn infer(&self, image: &PixelBuffer) -> Result<DetectorOutput, DetectionError> {
        let (input, letterbox) = preprocess_for_detection(image.as_rgb(), self.input_size);

        let input_value =
            Value::from_array(input).map_err(|e| DetectionError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectionError::Inference("model session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        debug!("Detection output shape: {:?}", output_tensor.shape());

        let candidates = decode_predictions(output_tensor.view(), self.confidence_threshold)?;
        let mut detections =
            non_maximum_suppression(candidates, self.iou_threshold, self.max_detections);
        restore_coordinates(&mut detections, &letterbox);

        Ok(DetectorOutput {
            detections,
            catalog: self.catalog.clone(),
        })
    }

    fn name(&self) -> &str {
        "yolov5"
    }
}
