// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Startup configuration
//!
//! Every setting can be given as a flag or through the environment (a
//! `.env` file is loaded first by the binary). Values are read once.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;

use crate::vision::YoloConfig;

pub const DEFAULT_MODEL_PATH: &str = "./models/best.onnx";
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
pub const DEFAULT_MAX_DETECTIONS: usize = 1000;
pub const DEFAULT_INPUT_SIZE: u32 = 640;
pub const DEFAULT_API_HOST: &str = "0.0.0.0";
pub const DEFAULT_API_PORT: u16 = 8000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Product Detector service configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "product-detector")]
#[command(version)]
#[command(about = "HTTP object detection service for product images", long_about = None)]
pub struct Config {
    /// YOLOv5 ONNX weights
    #[arg(long, env = "MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    pub model_path: PathBuf,

    /// Minimum detection score, clamped to [0, 1]
    #[arg(long, env = "CONFIDENCE_THRESHOLD", default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
    pub confidence_threshold: f32,

    /// IoU above which overlapping boxes of one class are suppressed
    #[arg(long, env = "IOU_THRESHOLD", default_value_t = DEFAULT_IOU_THRESHOLD)]
    pub iou_threshold: f32,

    #[arg(long, env = "MAX_DETECTIONS", default_value_t = DEFAULT_MAX_DETECTIONS)]
    pub max_detections: usize,

    /// Square model input side in pixels
    #[arg(
        long,
        env = "MODEL_INPUT_SIZE",
        default_value_t = DEFAULT_INPUT_SIZE,
        value_parser = clap::value_parser!(u32).range(32..=4096)
    )]
    pub model_input_size: u32,

    /// Class names, one per line; defaults to the model's `names` metadata
    #[arg(long, env = "CLASS_NAMES_PATH")]
    pub class_names_path: Option<PathBuf>,

    /// TTF/OTF font for preview labels
    #[arg(long, env = "LABEL_FONT_PATH")]
    pub label_font_path: Option<PathBuf>,

    /// Comma separated CORS origins, `*` for any
    #[arg(long, env = "ALLOWED_ORIGINS", default_value = "*", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    #[arg(long, env = "API_HOST", default_value = DEFAULT_API_HOST)]
    pub api_host: String,

    #[arg(long, env = "API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Request body limit in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_detections: DEFAULT_MAX_DETECTIONS,
            model_input_size: DEFAULT_INPUT_SIZE,
            class_names_path: None,
            label_font_path: None,
            allowed_origins: vec!["*".to_string()],
            api_host: DEFAULT_API_HOST.to_string(),
            api_port: DEFAULT_API_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    /// Detector settings, with thresholds clamped to [0, 1]
    pub fn yolo_config(&self) -> YoloConfig {
        YoloConfig {
            model_path: self.model_path.clone(),
            confidence_threshold: clamp_unit("CONFIDENCE_THRESHOLD", self.confidence_threshold),
            iou_threshold: clamp_unit("IOU_THRESHOLD", self.iou_threshold),
            max_detections: self.max_detections,
            input_size: self.model_input_size,
            class_names_path: self.class_names_path.clone(),
        }
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.api_host, self.api_port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.api_host, self.api_port))
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o.trim() == "*")
    }
}

fn clamp_unit(name: &str, value: f32) -> f32 {
    if value.is_nan() {
        warn!("{} is NaN, using 0.0", name);
        return 0.0;
    }
    let clamped = value.clamp(0.0, 1.0);
    if clamped != value {
        warn!("{} {} outside [0, 1], using {}", name, value, clamped);
    }
    clamped
}
