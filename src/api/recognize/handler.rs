// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Recognition endpoint handler

use axum::{
    body::to_bytes,
    extract::{rejection::QueryRejection, FromRequest, Query, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::Multipart;
use image::DynamicImage;
use tracing::{debug, error, info, warn};

use super::request::{
    from_multipart, from_raw_body, is_multipart, is_raw_image, RecognizeParams, RecognizeRequest,
};
use super::response::RecognizeResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::{AppState, MAX_BODY_SIZE};
use crate::vision::{decode_image_bytes, encode_jpeg, PipelineError};

/// POST /recognize - Detect and read the license plate in an uploaded image
///
/// # Request
/// - multipart field `image` or `file`: the image file (png, jpg, jpeg, gif, bmp)
/// - multipart field or query parameter `return_image`: `"true"` to receive the
///   annotated JPEG instead of JSON
/// - alternatively a raw body with an `image/*` content type
///
/// # Response
/// - JSON with the plate text, confidence, bounding box and result image path
/// - or the annotated image (`image/jpeg`) when `return_image=true`
///
/// # Errors
/// - 400 Bad Request: malformed query, body over the size limit, missing or
///   invalid upload, or no plate detected
/// - 500 Internal Server Error: recognition or storage failed
pub async fn recognize_handler(
    State(state): State<AppState>,
    query: Result<Query<RecognizeParams>, QueryRejection>,
    request: Request,
) -> Response {
    let include_details = state.enable_error_details;
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => {
            warn!("Recognition request rejected: {}", rejection.body_text());
            return ApiError::InvalidRequest(rejection.body_text())
                .into_response_with(include_details);
        }
    };

    match recognize(state, params, request).await {
        Ok(response) => response,
        Err(e) => {
            match e.status_code() {
                500 => error!("Recognition request failed: {}", e),
                _ => warn!("Recognition request rejected: {}", e),
            }
            e.into_response_with(include_details)
        }
    }
}

async fn recognize(
    state: AppState,
    params: RecognizeParams,
    request: Request,
) -> Result<Response, ApiError> {
    // 1. Extract the upload
    let request = extract_request(&state, params, request).await?;

    // 2. Validate before touching disk or models
    request.validate()?;

    // 3. Save the upload; the guard removes it on every return path
    let upload = state
        .store
        .save_upload(&request.filename, &request.data)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    debug!("Processing upload {}", upload.path().display());

    // 4. Decode the stored upload
    let stored = upload
        .read()
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    let (image, info) =
        decode_image_bytes(&stored).map_err(|e| ApiError::InvalidImage(e.to_string()))?;
    debug!(
        "Decoded image: {}x{}, {} bytes",
        info.width, info.height, info.size_bytes
    );

    // 5. Run the pipeline off the async executor
    let pipeline = state.pipeline.clone();
    let outcome = tokio::task::spawn_blocking(move || pipeline.run(&image))
        .await
        .map_err(|e| ApiError::InternalError(format!("Recognition task failed: {}", e)))?;

    let recognition = match outcome {
        Ok(Some(recognition)) => recognition,
        Ok(None) | Err(PipelineError::InvalidPlateBox(_)) => {
            return Err(ApiError::PlateNotDetected)
        }
        Err(PipelineError::Detection(e)) => return Err(ApiError::InternalError(format!("{:#}", e))),
        Err(e @ PipelineError::Recognition(_)) => {
            return Err(ApiError::RecognitionFailed(e.to_string()))
        }
    };

    // 6. Save the annotated result
    let jpeg = encode_jpeg(&DynamicImage::ImageRgb8(recognition.annotated))
        .map_err(|e| ApiError::RecognitionFailed(e.to_string()))?;
    let result_name = state
        .store
        .save_result(upload.filename(), &jpeg)
        .await
        .map_err(|e| ApiError::RecognitionFailed(e.to_string()))?;

    info!(
        "Plate '{}' recognized in {} ({}ms)",
        recognition.plate.text,
        upload.filename(),
        recognition.processing_time_ms
    );

    // 7. Respond
    if request.return_image {
        return Ok((StatusCode::OK, [(header::CONTENT_TYPE, "image/jpeg")], jpeg).into_response());
    }

    let response = RecognizeResponse::new(
        &result_name,
        upload.filename(),
        recognition.plate.text,
        recognition.plate.confidence,
        &recognition.plate_box,
        recognition.processing_time_ms,
    );
    Ok(Json(response).into_response())
}

async fn extract_request(
    state: &AppState,
    params: RecognizeParams,
    request: Request,
) -> Result<RecognizeRequest, ApiError> {
    let headers = request.headers().clone();

    if is_multipart(&headers) {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        return from_multipart(multipart, &params).await;
    }

    if is_raw_image(&headers) {
        let body = to_bytes(request.into_body(), MAX_BODY_SIZE)
            .await
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to read body: {}", e)))?;
        return from_raw_body(body, &params);
    }

    Err(ApiError::NoImageProvided)
}
