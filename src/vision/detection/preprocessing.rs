// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for YOLO-style detectors

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use ndarray::Array4;

/// Default square input size for YOLOv5 exports
pub const DEFAULT_INPUT_SIZE: u32 = 640;

/// Gray value used for letterbox padding
pub const PAD_VALUE: u8 = 114;

/// Scaling and offsets applied by [`letterbox`]
///
/// Used to map detections from tensor space back to original pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxInfo {
    /// Scale factor applied to the original image
    pub scale: f32,
    /// Horizontal padding added on the left
    pub pad_x: f32,
    /// Vertical padding added on the top
    pub pad_y: f32,
    /// Original image width
    pub original_width: u32,
    /// Original image height
    pub original_height: u32,
}

impl LetterboxInfo {
    /// Map a point from tensor space back into original image pixels
    pub fn restore(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Resize image with aspect ratio preservation and padding
///
/// The image is scaled to fit within target_size x target_size
/// while preserving aspect ratio, then centered on a gray (114) canvas.
pub fn letterbox(image: &RgbImage, target_size: u32) -> (RgbImage, LetterboxInfo) {
    let (orig_w, orig_h) = image.dimensions();

    if orig_w == 0 || orig_h == 0 {
        let canvas = RgbImage::from_pixel(target_size, target_size, Rgb([PAD_VALUE; 3]));
        let info = LetterboxInfo {
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
            original_width: orig_w,
            original_height: orig_h,
        };
        return (canvas, info);
    }

    let scale = (target_size as f32 / orig_w as f32).min(target_size as f32 / orig_h as f32);

    let new_w = ((orig_w as f32 * scale).round() as u32).clamp(1, target_size);
    let new_h = ((orig_h as f32 * scale).round() as u32).clamp(1, target_size);

    let resized = if (new_w, new_h) == (orig_w, orig_h) {
        image.clone()
    } else {
        imageops::resize(image, new_w, new_h, FilterType::Triangle)
    };

    let offset_x = (target_size - new_w) / 2;
    let offset_y = (target_size - new_h) / 2;

    let mut canvas = RgbImage::from_pixel(target_size, target_size, Rgb([PAD_VALUE; 3]));
    imageops::replace(&mut canvas, &resized, offset_x as i64, offset_y as i64);

    let info = LetterboxInfo {
        scale,
        pad_x: offset_x as f32,
        pad_y: offset_y as f32,
        original_width: orig_w,
        original_height: orig_h,
    };

    (canvas, info)
}

/// Preprocess an image for detection
///
/// Steps:
/// 1. Letterbox to `target_size` x `target_size`
/// 2. Scale pixels to [0, 1]
/// 3. Convert to NCHW tensor format [1, 3, H, W]
pub fn preprocess_for_detection(image: &RgbImage, target_size: u32) -> (Array4<f32>, LetterboxInfo) {
    let (canvas, info) = letterbox(image, target_size);
    let size = target_size as usize;

    let mut tensor = Array4::zeros((1, 3, size, size));
    for (x, y, pixel) in canvas.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    (tensor, info)
}
