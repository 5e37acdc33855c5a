// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection API endpoint module
//!
//! Provides POST /api/detect and POST /api/detect/visualize for running the
//! product detector on an uploaded image.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{detect_handler, detect_visualize_handler, run_pipeline};
pub use request::{read_upload, UploadedImage, UPLOAD_FIELD};
pub use response::DetectResponse;
