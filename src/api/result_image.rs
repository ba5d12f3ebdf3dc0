// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::errors::ApiError;
use super::http_server::AppState;
use crate::storage::StoreError;

/// GET /result_image/:filename - serve a previously generated annotated image
pub async fn result_image_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Response {
    match state.store.load_result(&filename).await {
        Ok(bytes) => {
            debug!("Serving result image {} ({} bytes)", filename, bytes.len());
            (StatusCode::OK, [(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response()
        }
        Err(StoreError::NotFound(_)) | Err(StoreError::InvalidFilename(_)) => {
            debug!("Result image not found: {}", filename);
            ApiError::ResultNotFound.into_response_with(state.enable_error_details)
        }
        Err(e) => {
            warn!("Failed to read result image {}: {}", filename, e);
            ApiError::InternalError(e.to_string()).into_response_with(state.enable_error_details)
        }
    }
}
