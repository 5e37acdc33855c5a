// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::http_server::AppState;

pub const SERVICE_NAME: &str = "Product Detector API";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RootResponse {
    pub message: String,
    pub status: String,
    pub model_loaded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    /// `healthy` or `model not loaded`
    pub status: String,
    pub model_path: String,
}

/// GET /api/
pub async fn root_handler(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: SERVICE_NAME.to_string(),
        status: "online".to_string(),
        model_loaded: state.detector.is_available(),
    })
}

/// GET /api/health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.detector.is_available() {
        "healthy"
    } else {
        "model not loaded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        model_path: state.detector.model_path().to_string(),
    })
}
