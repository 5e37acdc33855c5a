// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::vision::{DetectionError, FormatError, ImageError, VisualizeError};

/// Prefix of every per-request pipeline failure message
pub const PROCESSING_ERROR_PREFIX: &str = "Error processing image: ";

/// Error body, `{"detail": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Every way a detection request can fail
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// No model loaded; checked before the upload is read
    DetectorUnavailable,
    /// Upload is not a decodable image
    InvalidImage(String),
    /// The detector failed on a decoded image
    InferenceError(String),
    /// Model produced a class id with no name (weights / names mismatch)
    UnknownClass(String),
    /// No `file` part in the multipart body
    MissingUpload,
    /// Body exceeds the configured upload limit
    UploadTooLarge(String),
    /// Anything else on the server side (encode failure, worker panic)
    InternalError(String),
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        let detail = match self {
            ApiError::DetectorUnavailable => "Model not loaded".to_string(),
            ApiError::InvalidImage(msg)
            | ApiError::InferenceError(msg)
            | ApiError::UnknownClass(msg)
            | ApiError::UploadTooLarge(msg)
            | ApiError::InternalError(msg) => format!("{}{}", PROCESSING_ERROR_PREFIX, msg),
            ApiError::MissingUpload => "Field required: file".to_string(),
        };
        ErrorResponse { detail }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::DetectorUnavailable => 500,
            ApiError::InvalidImage(_) | ApiError::InferenceError(_) => 400,
            ApiError::UnknownClass(_) => 500,
            ApiError::MissingUpload => 422,
            ApiError::UploadTooLarge(_) => 413,
            ApiError::InternalError(_) => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::DetectorUnavailable => write!(f, "Model not loaded"),
            ApiError::InvalidImage(msg) => write!(f, "Invalid image: {}", msg),
            ApiError::InferenceError(msg) => write!(f, "Inference failed: {}", msg),
            ApiError::UnknownClass(msg) => write!(f, "Class catalog mismatch: {}", msg),
            ApiError::MissingUpload => write!(f, "Missing upload field 'file'"),
            ApiError::UploadTooLarge(msg) => write!(f, "Upload too large: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ImageError> for ApiError {
    fn from(e: ImageError) -> Self {
        ApiError::InvalidImage(e.to_string())
    }
}

impl From<DetectionError> for ApiError {
    fn from(e: DetectionError) -> Self {
        match e {
            DetectionError::Unavailable => ApiError::DetectorUnavailable,
            DetectionError::Inference(msg) => ApiError::InferenceError(msg),
        }
    }
}

impl From<FormatError> for ApiError {
    fn from(e: FormatError) -> Self {
        ApiError::UnknownClass(e.to_string())
    }
}

impl From<VisualizeError> for ApiError {
    fn from(e: VisualizeError) -> Self {
        ApiError::InternalError(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_response())).into_response()
    }
}
