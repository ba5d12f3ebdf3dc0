// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::vision::ALLOWED_EXTENSIONS;

/// JSON body of every failed request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    NoImageProvided,
    NoFileSelected,
    InvalidFileType,
    InvalidRequest(String),
    InvalidImage(String),
    PlateNotDetected,
    RecognitionFailed(String),
    ResultNotFound,
    InternalError(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NoImageProvided
            | ApiError::NoFileSelected
            | ApiError::InvalidFileType
            | ApiError::InvalidRequest(_)
            | ApiError::InvalidImage(_)
            | ApiError::PlateNotDetected => 400,
            ApiError::ResultNotFound => 404,
            ApiError::RecognitionFailed(_) | ApiError::InternalError(_) => 500,
        }
    }

    /// Value of the `error` field
    pub fn error_title(&self) -> String {
        match self {
            ApiError::NoImageProvided => "No image file provided. Send image as form-data with key \"image\" or \"file\", or as raw binary data.".to_string(),
            ApiError::NoFileSelected => "No file selected".to_string(),
            ApiError::InvalidFileType => format!(
                "Invalid file type. Allowed types: {}",
                ALLOWED_EXTENSIONS.join(", ")
            ),
            ApiError::InvalidRequest(_) => "Invalid request".to_string(),
            ApiError::InvalidImage(_) => "Invalid image".to_string(),
            ApiError::PlateNotDetected => "Could not detect license plate in the image".to_string(),
            ApiError::RecognitionFailed(_) => "Error during license plate recognition".to_string(),
            ApiError::ResultNotFound => "Result image not found".to_string(),
            ApiError::InternalError(_) => "Internal server error".to_string(),
        }
    }

    /// Value of the `message` field, if any
    pub fn message(&self) -> Option<String> {
        match self {
            ApiError::PlateNotDetected => Some(
                "The image may not contain a visible license plate. Try a different image with a clearer license plate.".to_string(),
            ),
            ApiError::InvalidRequest(msg)
            | ApiError::InvalidImage(msg)
            | ApiError::RecognitionFailed(msg)
            | ApiError::InternalError(msg) => Some(msg.clone()),
            _ => None,
        }
    }

    /// Build the JSON body; `details` carries the internal error text when enabled
    pub fn to_response(&self, include_details: bool) -> ErrorResponse {
        let details = if include_details {
            Some(self.to_string())
        } else {
            None
        };

        ErrorResponse {
            success: false,
            error: self.error_title(),
            message: self.message(),
            details,
        }
    }

    pub fn into_response_with(self, include_details: bool) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_response(include_details))).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_response_with(false)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NoImageProvided => write!(f, "No image in request"),
            ApiError::NoFileSelected => write!(f, "Uploaded file has an empty filename"),
            ApiError::InvalidFileType => write!(f, "File extension not allowed"),
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::InvalidImage(msg) => write!(f, "Invalid image: {}", msg),
            ApiError::PlateNotDetected => write!(f, "No license plate detected"),
            ApiError::RecognitionFailed(msg) => write!(f, "Recognition failed: {}", msg),
            ApiError::ResultNotFound => write!(f, "Result image not found"),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}
