// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection endpoint handlers

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, Json};
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use tracing::{debug, info, warn};

use super::request::{read_upload, rejected_upload};
use super::response::DetectResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::vision::{
    decode_image_bytes, format_detections, Detector, ImageDimensions, Visualizer,
};

/// POST /api/detect - Detect products in an uploaded image
///
/// # Request
/// Multipart form with the image in the `file` field.
///
/// # Response
/// - `success`: always `true`
/// - `image_dimensions`: decoded width and height in pixels
/// - `detections`: boxes in original pixel space, confidence, class id and name
/// - `total_detections`: number of entries in `detections`
///
/// # Errors
/// - 500 `Model not loaded`: no detector, checked before the upload is read
/// - 400 `Error processing image: ...`: undecodable upload or inference failure
/// - 400 `Error processing image: ...`: body is not `multipart/form-data`
/// - 413: body over the upload limit
/// - 422: no `file` field
pub async fn detect_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectResponse>, ApiError> {
    process_upload(state, multipart, false).await.map(Json)
}

/// POST /api/detect/visualize - Detect and return an annotated preview
///
/// Same as [`detect_handler`], plus `visualized_image`: the input with boxes
/// and labels drawn, as a `data:image/jpeg;base64,...` URI.
pub async fn detect_visualize_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectResponse>, ApiError> {
    process_upload(state, multipart, true).await.map(Json)
}

async fn process_upload(
    state: AppState,
    multipart: Result<Multipart, MultipartRejection>,
    visualize: bool,
) -> Result<DetectResponse, ApiError> {
    let started = Instant::now();

    // 1. Availability, before the upload is touched
    let detector = state.detector.detector().map_err(|e| {
        warn!("Detection request rejected: {}", e);
        ApiError::from(e)
    })?;

    // 2. Read the upload exactly once
    let mut multipart = multipart.map_err(|rejection| {
        let e = rejected_upload(rejection);
        warn!("Upload rejected: {}", e);
        e
    })?;
    let upload = read_upload(&mut multipart).await.map_err(|e| {
        warn!("Upload rejected: {}", e);
        e
    })?;

    // 3. CPU-bound work off the async runtime
    let visualizer = visualize.then(|| Arc::clone(&state.visualizer));
    let response = tokio::task::spawn_blocking(move || {
        run_pipeline(&*detector, visualizer.as_deref(), &upload.bytes)
    })
    .await
    .map_err(|e| ApiError::InternalError(format!("detection task failed: {}", e)))?
    .map_err(|e| {
        warn!("Detection failed: {}", e);
        e
    })?;

    info!(
        "Detection complete: {} objects, {}x{}, visualized={}, {}ms",
        response.result.total_detections,
        response.result.image_dimensions.width,
        response.result.image_dimensions.height,
        visualize,
        started.elapsed().as_millis()
    );

    Ok(response)
}

/// Decode, detect, format and optionally render one image
///
/// Any failing step aborts the whole pipeline; nothing partial is returned.
pub fn run_pipeline(
    detector: &dyn Detector,
    visualizer: Option<&Visualizer>,
    bytes: &[u8],
) -> Result<DetectResponse, ApiError> {
    let (image, image_info) = decode_image_bytes(bytes)?;
    debug!(
        "Decoded image: {}x{} {:?}, {} bytes",
        image_info.width, image_info.height, image_info.format, image_info.size_bytes
    );

    let output = detector.infer(&image)?;
    debug!("{} returned {} detections", detector.name(), output.detections.len());

    let dimensions = ImageDimensions {
        width: image.width(),
        height: image.height(),
    };
    let result = format_detections(&output.detections, &output.catalog, dimensions)?;

    let visualized_image = match visualizer {
        Some(visualizer) => Some(
            visualizer
                .render(&image, &output.detections, &output.catalog)?
                .to_data_uri(),
        ),
        None => None,
    };

    Ok(DetectResponse::new(result, visualized_image))
}
