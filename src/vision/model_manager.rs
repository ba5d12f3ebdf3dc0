// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model manager for the plate detector, character classifier and overlay font

use ab_glyph::FontVec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::vision::detection::{
    PlateDetector, YoloPlateDetector, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_NMS_THRESHOLD,
};
use crate::vision::overlay::load_font;
use crate::vision::pipeline::PlatePipeline;
use crate::vision::preprocessing::YOLO_INPUT_SIZE;
use crate::vision::recognition::{CharacterClassifier, OnnxCharacterClassifier};

/// Configuration for loading the recognition models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LprModelConfig {
    /// YOLOv3 plate detector exported to ONNX
    pub yolo_model: PathBuf,
    /// Detector class names, one per line
    pub yolo_classes: PathBuf,
    /// Character classification CNN exported to ONNX
    pub ocr_model: PathBuf,
    /// TrueType font for the text overlay (optional)
    pub font_path: Option<PathBuf>,
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
    /// Square detector input size in pixels
    pub input_size: u32,
    /// ONNX Runtime intra-op threads per session
    pub intra_threads: usize,
}

impl Default for LprModelConfig {
    fn default() -> Self {
        Self {
            yolo_model: PathBuf::from("models/Licence_plate_detection/lapi.onnx"),
            yolo_classes: PathBuf::from("models/Licence_plate_detection/classes.names"),
            ocr_model: PathBuf::from("models/Licence_Plate_Recognition/ocrmodel.onnx"),
            font_path: Some(PathBuf::from("models/fonts/DejaVuSans.ttf")),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            nms_threshold: DEFAULT_NMS_THRESHOLD,
            input_size: YOLO_INPUT_SIZE,
            intra_threads: 4,
        }
    }
}

/// Presence check for one model file
#[derive(Debug, Clone, Serialize)]
pub struct FileCheck {
    pub path: PathBuf,
    pub description: String,
    pub required: bool,
    /// File size in bytes, `None` when missing
    pub size_bytes: Option<u64>,
}

impl FileCheck {
    fn probe(path: &Path, description: &str, required: bool) -> Self {
        let size_bytes = std::fs::metadata(path)
            .ok()
            .filter(|m| m.is_file())
            .map(|m| m.len());
        Self {
            path: path.to_path_buf(),
            description: description.to_string(),
            required,
            size_bytes,
        }
    }

    pub fn exists(&self) -> bool {
        self.size_bytes.is_some()
    }

    pub fn size_mb(&self) -> Option<f64> {
        self.size_bytes.map(|b| b as f64 / (1024.0 * 1024.0))
    }
}

impl LprModelConfig {
    /// Check every model file without loading anything
    pub fn verify_files(&self) -> Vec<FileCheck> {
        let mut checks = vec![
            FileCheck::probe(&self.yolo_model, "YOLO weights", true),
            FileCheck::probe(&self.yolo_classes, "YOLO class names", true),
            FileCheck::probe(&self.ocr_model, "OCR model", true),
        ];
        if let Some(font) = &self.font_path {
            checks.push(FileCheck::probe(font, "Overlay font", false));
        }
        checks
    }

    /// True when every required file exists
    pub fn required_files_present(&self) -> bool {
        self.verify_files()
            .iter()
            .filter(|c| c.required)
            .all(FileCheck::exists)
    }
}

/// Information about a loaded model, reported by `/info`
#[derive(Debug, Clone, Serialize)]
pub struct LprModelInfo {
    pub name: String,
    /// Model type (detection, recognition, font)
    pub model_type: String,
    pub path: String,
    pub available: bool,
}

/// Owns the loaded models and hands out the shared pipeline
pub struct LprModelManager {
    config: LprModelConfig,
    pipeline: PlatePipeline,
}

impl std::fmt::Debug for LprModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LprModelManager")
            .field("config", &self.config)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

impl LprModelManager {
    /// Load every model once
    ///
    /// A missing detector or classifier is fatal. A missing or unreadable
    /// font only disables the text overlay.
    pub fn load(config: LprModelConfig) -> anyhow::Result<Self> {
        let detector = YoloPlateDetector::new(
            &config.yolo_model,
            &config.yolo_classes,
            config.intra_threads,
        )?
        .with_input_size(config.input_size)
        .with_confidence_threshold(config.confidence_threshold)
        .with_nms_threshold(config.nms_threshold);
        tracing::info!("✅ Plate detector loaded from {}", config.yolo_model.display());

        let classifier = OnnxCharacterClassifier::new(&config.ocr_model, config.intra_threads)?;
        tracing::info!(
            "✅ Character classifier loaded from {}",
            config.ocr_model.display()
        );

        let font = match &config.font_path {
            Some(path) => match load_font(path) {
                Ok(font) => Some(Arc::new(font)),
                Err(e) => {
                    tracing::warn!("⚠️ Text overlay disabled: {:#}", e);
                    None
                }
            },
            None => None,
        };

        Ok(Self::from_models(
            config,
            Arc::new(detector),
            Arc::new(classifier),
            font,
        ))
    }

    /// Build a manager around already constructed models
    pub fn from_models(
        config: LprModelConfig,
        detector: Arc<dyn PlateDetector>,
        classifier: Arc<dyn CharacterClassifier>,
        font: Option<Arc<FontVec>>,
    ) -> Self {
        Self {
            config,
            pipeline: PlatePipeline::new(detector, classifier, font),
        }
    }

    pub fn pipeline(&self) -> PlatePipeline {
        self.pipeline.clone()
    }

    pub fn config(&self) -> &LprModelConfig {
        &self.config
    }

    /// List all models with their availability
    pub fn list_models(&self) -> Vec<LprModelInfo> {
        let mut models = vec![
            LprModelInfo {
                name: "yolov3-plate-detector".to_string(),
                model_type: "detection".to_string(),
                path: self.config.yolo_model.display().to_string(),
                available: true,
            },
            LprModelInfo {
                name: "character-cnn".to_string(),
                model_type: "recognition".to_string(),
                path: self.config.ocr_model.display().to_string(),
                available: true,
            },
        ];

        if let Some(font) = &self.config.font_path {
            models.push(LprModelInfo {
                name: "overlay-font".to_string(),
                model_type: "font".to_string(),
                path: font.display().to_string(),
                available: self.pipeline.has_font(),
            });
        }

        models
    }
}
