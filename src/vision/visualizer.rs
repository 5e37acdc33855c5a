// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Annotated preview rendering
//!
//! Boxes and labels are drawn on a copy of the decoded image, which is then
//! JPEG-encoded and exposed as base64 / a `data:` URI for JSON responses.

use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::{FontArc, PxScale};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::vision::detection::{ClassCatalog, RawDetection};
use crate::vision::image_utils::PixelBuffer;

/// JPEG quality for rendered previews
pub const JPEG_QUALITY: u8 = 95;

/// Media type of the encoded artifact
pub const MEDIA_TYPE: &str = "image/jpeg";

/// Fonts tried when no label font is configured
pub const DEFAULT_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

const BOX_THICKNESS: i32 = 2;
const LABEL_PADDING: i32 = 2;
const PALETTE_SIZE: usize = 20;

#[derive(Debug, Error)]
pub enum VisualizeError {
    #[error("Failed to encode annotated image: {0}")]
    Encode(String),

    #[error("Failed to load label font {path}: {message}")]
    Font { path: PathBuf, message: String },
}

/// JPEG bytes of an annotated image
#[derive(Debug, Clone)]
pub struct VisualizationArtifact {
    jpeg: Vec<u8>,
}

impl VisualizationArtifact {
    pub fn as_bytes(&self) -> &[u8] {
        &self.jpeg
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.jpeg)
    }

    /// `data:image/jpeg;base64,...`
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", MEDIA_TYPE, self.to_base64())
    }
}

/// Draws detections onto images
pub struct Visualizer {
    /// Label font; without one only boxes and label bars are drawn
    font: Option<FontArc>,
    font_scale: PxScale,
    /// Bounding box color per class id (cycled)
    colors: Vec<Rgb<u8>>,
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Visualizer {
    pub fn new(font: Option<FontArc>) -> Self {
        let colors = (0..PALETTE_SIZE)
            .map(|i| {
                let hue = (i as f32 / PALETTE_SIZE as f32) * 360.0;
                hsv_to_rgb(hue, 0.8, 0.9)
            })
            .collect();

        Self {
            font,
            font_scale: PxScale::from(16.0),
            colors,
        }
    }

    /// Load a TTF/OTF label font
    pub fn from_font_file<P: AsRef<Path>>(path: P) -> Result<Self, VisualizeError> {
        let path = path.as_ref();
        let font_err = |message: String| VisualizeError::Font {
            path: path.to_path_buf(),
            message,
        };
        let bytes = fs::read(path).map_err(|e| font_err(e.to_string()))?;
        let font = FontArc::try_from_vec(bytes).map_err(|e| font_err(e.to_string()))?;
        Ok(Self::new(Some(font)))
    }

    /// Use the configured font, else the first system font found
    ///
    /// A missing or broken font only disables label text.
    pub fn discover(configured: Option<&Path>) -> Self {
        if let Some(path) = configured {
            match Self::from_font_file(path) {
                Ok(visualizer) => {
                    info!("Label font loaded from {}", path.display());
                    return visualizer;
                }
                Err(e) => warn!("⚠️ {}", e),
            }
        }

        for candidate in DEFAULT_FONT_PATHS {
            if let Ok(visualizer) = Self::from_font_file(candidate) {
                info!("Label font loaded from {}", candidate);
                return visualizer;
            }
        }

        warn!("⚠️ No label font found, previews will have boxes without label text");
        Self::new(None)
    }

    /// Annotate a copy of `image` and encode it as JPEG
    ///
    /// With no detections the artifact is the re-encoded original.
    pub fn render(
        &self,
        image: &PixelBuffer,
        detections: &[RawDetection],
        catalog: &ClassCatalog,
    ) -> Result<VisualizationArtifact, VisualizeError> {
        let mut canvas = image.as_rgb().clone();
        self.draw_detections(&mut canvas, detections, catalog);
        debug!("Rendered {} detections", detections.len());
        encode_jpeg(&canvas)
    }

    /// Draw each box and its label in place
    pub fn draw_detections(
        &self,
        image: &mut RgbImage,
        detections: &[RawDetection],
        catalog: &ClassCatalog,
    ) {
        let (w, h) = (image.width() as i32, image.height() as i32);
        if w == 0 || h == 0 {
            return;
        }

        for detection in detections {
            let color = self.colors[detection.class_id % self.colors.len()];

            let bbox = &detection.bbox;
            let x_min = (bbox.x1.min(bbox.x2).floor() as i32).clamp(0, w - 1);
            let y_min = (bbox.y1.min(bbox.y2).floor() as i32).clamp(0, h - 1);
            let x_max = (bbox.x1.max(bbox.x2).ceil() as i32).clamp(0, w - 1);
            let y_max = (bbox.y1.max(bbox.y2).ceil() as i32).clamp(0, h - 1);

            for t in 0..BOX_THICKNESS {
                let width = x_max - x_min - 2 * t + 1;
                let height = y_max - y_min - 2 * t + 1;
                if width <= 0 || height <= 0 {
                    break;
                }
                let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32, height as u32);
                draw_hollow_rect_mut(image, rect, color);
            }

            let label = match catalog.get(detection.class_id) {
                Some(name) => format!("{} {:.2}", name, detection.confidence),
                None => format!("{} {:.2}", detection.class_id, detection.confidence),
            };
            self.draw_label(image, &label, x_min, y_min, color);
        }
    }

    fn draw_label(&self, image: &mut RgbImage, label: &str, x: i32, y: i32, color: Rgb<u8>) {
        let (text_w, text_h) = match &self.font {
            Some(font) => text_size(self.font_scale, font, label),
            None => ((label.len() as f32 * self.font_scale.x * 0.55) as u32, self.font_scale.y as u32),
        };

        let bar_h = text_h as i32 + 2 * LABEL_PADDING;
        let bar_w = (text_w as i32 + 2 * LABEL_PADDING).min(image.width() as i32 - x);
        if bar_w <= 0 {
            return;
        }

        // above the box when there is room, otherwise just inside it
        let bar_y = if y >= bar_h { y - bar_h } else { y };
        let rect = Rect::at(x, bar_y).of_size(bar_w as u32, bar_h as u32);
        draw_filled_rect_mut(image, rect, color);

        if let Some(font) = &self.font {
            draw_text_mut(
                image,
                Rgb([255, 255, 255]),
                x + LABEL_PADDING,
                bar_y + LABEL_PADDING,
                self.font_scale,
                font,
                label,
            );
        }
    }
}

/// Encode as JPEG at [`JPEG_QUALITY`]
pub fn encode_jpeg(image: &RgbImage) -> Result<VisualizationArtifact, VisualizeError> {
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
        .encode_image(image)
        .map_err(|e| VisualizeError::Encode(e.to_string()))?;
    Ok(VisualizationArtifact { jpeg })
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    Rgb([
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    ])
}
