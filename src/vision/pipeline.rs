// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! End-to-end plate recognition: detect, crop, segment, classify, overlay

use ab_glyph::FontVec;
use image::{DynamicImage, RgbImage};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

use super::detection::{PlateBox, PlateDetector};
use super::overlay::annotate;
use super::recognition::{recognize_characters, CharacterClassifier, RecognizedPlate};
use super::segmentation::segment_characters;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Plate detection failed: {0}")]
    Detection(anyhow::Error),

    #[error("Character recognition failed: {0}")]
    Recognition(anyhow::Error),

    #[error("Detected plate {0:?} lies outside the image")]
    InvalidPlateBox(PlateBox),
}

/// Result of a successful recognition
#[derive(Debug, Clone)]
pub struct PlateRecognition {
    pub plate_box: PlateBox,
    pub plate: RecognizedPlate,
    /// Input image with the plate rectangle and text drawn on it
    pub annotated: RgbImage,
    pub processing_time_ms: u64,
}

/// Shared, read-only recognition pipeline
#[derive(Clone)]
pub struct PlatePipeline {
    detector: Arc<dyn PlateDetector>,
    classifier: Arc<dyn CharacterClassifier>,
    font: Option<Arc<FontVec>>,
}

impl std::fmt::Debug for PlatePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatePipeline")
            .field("has_font", &self.font.is_some())
            .finish_non_exhaustive()
    }
}

impl PlatePipeline {
    pub fn new(
        detector: Arc<dyn PlateDetector>,
        classifier: Arc<dyn CharacterClassifier>,
        font: Option<Arc<FontVec>>,
    ) -> Self {
        Self {
            detector,
            classifier,
            font,
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Run the full pipeline on one image
    ///
    /// Returns `Ok(None)` when no plate is detected. A plate with no
    /// segmentable characters is still a success with empty text.
    pub fn run(&self, image: &DynamicImage) -> Result<Option<PlateRecognition>, PipelineError> {
        let start = Instant::now();

        let detected = self
            .detector
            .detect(image)
            .map_err(PipelineError::Detection)?;

        let Some(detected) = detected else {
            info!("No license plate detected");
            return Ok(None);
        };

        let plate_box = detected
            .clamp_to(image.width(), image.height())
            .ok_or(PipelineError::InvalidPlateBox(detected))?;

        let crop = image.crop_imm(plate_box.x, plate_box.y, plate_box.width, plate_box.height);
        let characters = segment_characters(&crop);
        debug!(
            "Plate {}x{} yielded {} character candidates",
            plate_box.width,
            plate_box.height,
            characters.len()
        );

        let plate = recognize_characters(self.classifier.as_ref(), &characters)
            .map_err(PipelineError::Recognition)?;

        let annotated = annotate(image, &plate_box, &plate.text, self.font.as_deref());

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Recognized plate '{}' (confidence {:.2}) in {}ms",
            plate.text, plate.confidence, processing_time_ms
        );

        Ok(Some(PlateRecognition {
            plate_box,
            plate,
            annotated,
            processing_time_ms,
        }))
    }
}
