// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multipart upload extraction

use axum::http::StatusCode;
use axum_extra::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use tracing::debug;

use crate::api::errors::ApiError;

/// Form field carrying the image
pub const UPLOAD_FIELD: &str = "file";

/// Raw bytes of the uploaded image
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Read the `file` part of a multipart body
///
/// Other fields are skipped. The bytes are taken as-is; the declared
/// content type is not trusted for decoding.
pub async fn read_upload(multipart: &mut Multipart) -> Result<UploadedImage, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error("malformed multipart body", e))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| upload_error("failed to read upload", e))?;

        debug!(
            "Upload received: {} bytes, filename={:?}, content_type={:?}",
            bytes.len(),
            filename,
            content_type
        );

        return Ok(UploadedImage {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::MissingUpload)
}

fn upload_error(context: &str, e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::UploadTooLarge(e.body_text())
    } else {
        ApiError::InvalidImage(format!("{}: {}", context, e.body_text()))
    }
}

/// Map a body that never parsed as multipart (wrong or missing content type)
pub fn rejected_upload(rejection: MultipartRejection) -> ApiError {
    ApiError::InvalidImage(format!("expected multipart/form-data: {}", rejection.body_text()))
}
