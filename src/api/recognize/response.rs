// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Recognition response types

use serde::{Deserialize, Serialize};

use crate::vision::PlateBox;

/// Plate location in the uploaded image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl From<&PlateBox> for BoundingBox {
    fn from(plate: &PlateBox) -> Self {
        Self {
            x: plate.x,
            y: plate.y,
            width: plate.width,
            height: plate.height,
        }
    }
}

/// Successful recognition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizeResponse {
    pub success: bool,
    pub message: String,
    /// Path of the annotated image under `/result_image/`
    pub result_image: String,
    pub uploaded_file: String,
    pub plate_text: String,
    /// Mean character confidence (0.0-1.0)
    pub confidence: f32,
    pub detection_confidence: f32,
    pub bounding_box: BoundingBox,
    pub processing_time_ms: u64,
}

impl RecognizeResponse {
    pub fn new(
        result_filename: &str,
        uploaded_file: &str,
        plate_text: String,
        confidence: f32,
        plate: &PlateBox,
        processing_time_ms: u64,
    ) -> Self {
        Self {
            success: true,
            message: "License plate recognized successfully".to_string(),
            result_image: format!("/result_image/{}", result_filename),
            uploaded_file: uploaded_file.to_string(),
            plate_text,
            confidence,
            detection_confidence: plate.confidence,
            bounding_box: BoundingBox::from(plate),
            processing_time_ms,
        }
    }
}
