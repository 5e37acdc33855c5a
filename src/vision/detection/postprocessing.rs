// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Turns raw YOLOv5 prediction rows into [`RawDetection`] values

use ndarray::{ArrayViewD, Axis, Ix2};

use super::preprocessing::LetterboxInfo;
use super::{BoundingBox, DetectionError, RawDetection};

/// Number of leading values per row before the class scores:
/// cx, cy, w, h, objectness
const ROW_PREFIX: usize = 5;

/// Parse a `[1, N, 5 + C]` (or `[N, 5 + C]`) prediction tensor
///
/// Score is objectness times the best class score. Rows scoring below
/// `confidence_threshold` are dropped. Boxes stay in tensor space.
pub fn decode_predictions(
    output: ArrayViewD<f32>,
    confidence_threshold: f32,
) -> Result<Vec<RawDetection>, DetectionError> {
    let rows = match output.ndim() {
        3 if output.shape()[0] == 1 => output.index_axis_move(Axis(0), 0),
        2 => output,
        _ => {
            return Err(DetectionError::Inference(format!(
                "unexpected model output shape {:?}, expected [1, N, 5 + classes]",
                output.shape()
            )))
        }
    };
    let rows = rows
        .into_dimensionality::<Ix2>()
        .map_err(|e| DetectionError::Inference(e.to_string()))?;

    if rows.ncols() <= ROW_PREFIX {
        return Err(DetectionError::Inference(format!(
            "model output rows have {} values, expected at least {}",
            rows.ncols(),
            ROW_PREFIX + 1
        )));
    }

    let mut detections = Vec::new();
    for row in rows.axis_iter(Axis(0)) {
        let objectness = row[4];
        if objectness < confidence_threshold {
            continue;
        }

        let Some((class_id, class_score)) = row
            .iter()
            .skip(ROW_PREFIX)
            .copied()
            .enumerate()
            .reduce(|best, next| if next.1 > best.1 { next } else { best })
        else {
            continue;
        };

        let confidence = objectness * class_score;
        if confidence < confidence_threshold || !confidence.is_finite() {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        detections.push(RawDetection {
            bbox: BoundingBox::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0),
            confidence,
            class_id,
        });
    }

    Ok(detections)
}

/// Class-aware non maximum suppression
///
/// Output is sorted by descending confidence and truncated to `max_detections`.
pub fn non_maximum_suppression(
    mut detections: Vec<RawDetection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<RawDetection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<RawDetection> = Vec::new();
    for candidate in detections {
        if keep.len() >= max_detections {
            break;
        }
        let suppressed = keep.iter().any(|kept| {
            kept.class_id == candidate.class_id
                && kept.bbox.intersection_over_union(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            keep.push(candidate);
        }
    }
    keep
}

/// Map boxes from tensor space back to original pixels, clipped to the image
pub fn restore_coordinates(detections: &mut [RawDetection], info: &LetterboxInfo) {
    let max_x = info.original_width as f32;
    let max_y = info.original_height as f32;

    for detection in detections.iter_mut() {
        let (x1, y1) = info.restore(detection.bbox.x1, detection.bbox.y1);
        let (x2, y2) = info.restore(detection.bbox.x2, detection.bbox.y2);
        detection.bbox = BoundingBox::new(
            x1.clamp(0.0, max_x),
            y1.clamp(0.0, max_y),
            x2.clamp(0.0, max_x),
            y2.clamp(0.0, max_y),
        );
    }
}
