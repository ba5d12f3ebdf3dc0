// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Recognition request extraction
//!
//! An image arrives either as a multipart file field (`image` or `file`) or
//! as a raw request body with an `image/*` content type.

use axum::http::{header, HeaderMap};
use axum_extra::extract::Multipart;
use bytes::Bytes;
use serde::Deserialize;
use tracing::debug;

use crate::api::errors::ApiError;
use crate::vision::allowed_file;

/// Query parameters accepted by `POST /recognize`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecognizeParams {
    pub return_image: Option<String>,
}

/// How the image reached the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadSource {
    Form,
    RawBody,
}

/// A parsed recognition request
#[derive(Debug, Clone)]
pub struct RecognizeRequest {
    /// Client filename (generated for raw bodies)
    pub filename: String,
    pub data: Bytes,
    pub source: UploadSource,
    /// Reply with the annotated JPEG instead of JSON
    pub return_image: bool,
}

impl RecognizeRequest {
    /// Reject uploads before anything touches the disk or the models
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.source == UploadSource::Form {
            if self.filename.is_empty() {
                return Err(ApiError::NoFileSelected);
            }
            if !allowed_file(&self.filename) {
                return Err(ApiError::InvalidFileType);
            }
        }
        Ok(())
    }
}

/// `"true"` in any case enables raw image replies; anything else does not
pub fn parse_return_image(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// Name for an upload that arrived as a raw body
pub fn raw_upload_name() -> String {
    format!("upload_{}.jpg", uuid::Uuid::new_v4().simple())
}

pub fn is_multipart(headers: &HeaderMap) -> bool {
    content_type(headers).starts_with("multipart/form-data")
}

pub fn is_raw_image(headers: &HeaderMap) -> bool {
    content_type(headers).contains("image")
}

fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Read the image and options from a multipart form
///
/// The `image` field wins over `file` when both are present. Fields
/// without a filename are plain form values, not uploads.
pub async fn from_multipart(
    mut multipart: Multipart,
    params: &RecognizeParams,
) -> Result<RecognizeRequest, ApiError> {
    let mut image_field: Option<(String, Bytes)> = None;
    let mut file_field: Option<(String, Bytes)> = None;
    let mut return_image = params.return_image.clone();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);

        match (name.as_str(), filename) {
            ("image", Some(filename)) | ("file", Some(filename)) => {
                let data = field.bytes().await.map_err(|e| {
                    ApiError::InvalidRequest(format!("Failed to read upload: {}", e))
                })?;
                debug!("Multipart upload '{}' ({} bytes)", filename, data.len());
                if name == "image" {
                    image_field = Some((filename, data));
                } else {
                    file_field = Some((filename, data));
                }
            }
            ("return_image", None) => {
                let value = field.text().await.map_err(|e| {
                    ApiError::InvalidRequest(format!("Failed to read form field: {}", e))
                })?;
                return_image = Some(value);
            }
            _ => {}
        }
    }

    let (filename, data) = image_field
        .or(file_field)
        .ok_or(ApiError::NoImageProvided)?;

    Ok(RecognizeRequest {
        filename,
        data,
        source: UploadSource::Form,
        return_image: parse_return_image(return_image.as_deref()),
    })
}

/// Wrap a raw `image/*` body
pub fn from_raw_body(body: Bytes, params: &RecognizeParams) -> Result<RecognizeRequest, ApiError> {
    if body.is_empty() {
        return Err(ApiError::NoImageProvided);
    }

    Ok(RecognizeRequest {
        filename: raw_upload_name(),
        data: body,
        source: UploadSource::RawBody,
        return_image: parse_return_image(params.return_image.as_deref()),
    })
}
