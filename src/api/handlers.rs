// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

use super::http_server::AppState;
use crate::vision::{LprModelInfo, ALLOWED_EXTENSIONS};

pub const API_NAME: &str = "Vehicle License Plate Recognition API";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InfoResponse {
    pub name: String,
    pub version: String,
    pub endpoints: BTreeMap<String, String>,
    pub usage: serde_json::Value,
    pub supported_formats: Vec<String>,
    pub models: Vec<LprModelInfo>,
}

/// GET /health - liveness probe, no side effects
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "License Plate Recognition API is running".to_string(),
    })
}

/// GET /info - static API metadata
pub async fn info_handler(State(state): State<AppState>) -> Json<InfoResponse> {
    let endpoints = [
        ("GET /health", "Health check"),
        ("GET /info", "API information"),
        ("POST /recognize", "Recognize license plate from image"),
        ("GET /result_image/<filename>", "Get processed result image"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let usage = json!({
        "POST /recognize": {
            "description": "Upload an image to recognize license plate",
            "parameters": {
                "image (file)": "Image file (form-data, key \"image\" or \"file\")",
                "return_image (optional)": "Set to \"true\" to return image directly instead of JSON"
            },
            "example": "curl -X POST -F \"image=@vehicle.jpg\" http://localhost:5000/recognize"
        }
    });

    Json(InfoResponse {
        name: API_NAME.to_string(),
        version: crate::version::VERSION_NUMBER.to_string(),
        endpoints,
        usage,
        supported_formats: ALLOWED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        models: state.models.as_ref().clone(),
    })
}
