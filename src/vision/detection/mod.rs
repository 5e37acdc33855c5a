// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection capability
//!
//! The request pipeline only talks to the [`Detector`] trait. Model-specific
//! output layouts stay inside the adapters (see [`yolo`]), which turn raw
//! tensor rows into typed [`RawDetection`] values in original image pixels.
//!
//! Components:
//! - `preprocessing` - Letterbox resize into an NCHW tensor
//! - `postprocessing` - Row decoding, NMS and coordinate restoration
//! - `yolo` - ONNX Runtime adapter for YOLOv5 exports

pub mod postprocessing;
pub mod preprocessing;
pub mod yolo;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::vision::image_utils::PixelBuffer;

pub use yolo::{YoloConfig, YoloDetector};

/// Errors raised at the detector boundary
#[derive(Debug, Error)]
pub enum DetectionError {
    /// No model is loaded; distinct from a per-request failure
    #[error("Model not loaded")]
    Unavailable,

    /// The model rejected or failed on a decoded image
    #[error("{0}")]
    Inference(String),
}

/// Axis-aligned box in original image pixel space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn intersection_over_union(&self, other: &BoundingBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let intersection = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// One predicted object, as produced by a detector
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub bbox: BoundingBox,
    /// Score in [0, 1]
    pub confidence: f32,
    pub class_id: usize,
}

/// Mapping from class id to human-readable name, fixed per loaded model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassCatalog {
    names: BTreeMap<usize, String>,
}

impl ClassCatalog {
    /// Build a catalog where the position in `names` is the class id
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .enumerate()
                .map(|(id, name)| (id, name.into()))
                .collect(),
        }
    }

    /// Read one class name per line; blank lines are skipped.
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(Self::from_names(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        ))
    }

    /// Parse the `names` entry that ultralytics writes into ONNX metadata,
    /// e.g. `{0: 'person', 1: 'bicycle'}`.
    pub fn from_metadata(raw: &str) -> Option<Self> {
        let mut rest = raw.trim().strip_prefix('{')?.strip_suffix('}')?.trim();
        let mut names = BTreeMap::new();

        // Names are quoted and may contain commas or colons
        while !rest.is_empty() {
            let (id, value) = rest.split_once(':')?;
            let id = id.trim().parse::<usize>().ok()?;

            let value = value.trim_start();
            let quote = value.chars().next().filter(|c| *c == '\'' || *c == '"')?;
            let quoted = &value[1..];
            let end = quoted.find(quote)?;
            names.insert(id, quoted[..end].to_string());

            rest = quoted[end + 1..].trim_start();
            rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
        }

        if names.is_empty() {
            None
        } else {
            Some(Self { names })
        }
    }

    pub fn get(&self, class_id: usize) -> Option<&str> {
        self.names.get(&class_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<(usize, String)> for ClassCatalog {
    fn from_iter<T: IntoIterator<Item = (usize, String)>>(iter: T) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

/// Result of running a detector over one image
#[derive(Debug, Clone)]
pub struct DetectorOutput {
    /// Detections in the detector's own order
    pub detections: Vec<RawDetection>,
    pub catalog: Arc<ClassCatalog>,
}

/// Capability interface for any object detection backend
///
/// Implementations pre-filter by their own confidence threshold and must
/// be callable from several request tasks at once. Backends that cannot
/// run concurrently serialize internally.
pub trait Detector: Send + Sync {
    /// Detect objects in one RGB image; the buffer is never modified.
    fn infer(&self, image: &PixelBuffer) -> Result<DetectorOutput, DetectionError>;

    /// Get the detector name (for logging)
    fn name(&self) -> &str;
}
