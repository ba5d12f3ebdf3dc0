// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for license plate recognition
//!
//! This module provides:
//! - Plate detection via a YOLOv3 model
//! - Plate segmentation into character glyphs
//! - Character classification via a CNN
//! - Result overlays
//!
//! Both models run on CPU through ONNX Runtime.

pub mod detection;
pub mod image_utils;
pub mod model_manager;
pub mod overlay;
pub mod pipeline;
pub mod preprocessing;
pub mod recognition;
pub mod segmentation;

pub use detection::{PlateBox, PlateDetector, YoloPlateDetector};
pub use image_utils::{
    allowed_file, decode_image_bytes, detect_format, encode_jpeg, ImageError, ImageInfo,
    ALLOWED_EXTENSIONS, MAX_IMAGE_SIZE,
};
pub use model_manager::{FileCheck, LprModelConfig, LprModelInfo, LprModelManager};
pub use pipeline::{PipelineError, PlatePipeline, PlateRecognition};
pub use recognition::{
    CharacterClassifier, OnnxCharacterClassifier, RecognizedPlate, CHARACTER_SET,
};
pub use segmentation::{segment_characters, CharacterImage};
