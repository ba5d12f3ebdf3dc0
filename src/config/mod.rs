// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server configuration
//!
//! Layering: built-in defaults, then an optional TOML file, then `LPR_*`
//! environment variables. CLI flags are applied last by the binary.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::vision::LprModelConfig;

/// Configuration for the recognition server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    pub listen_addr: String,
    /// Temporary upload folder
    pub upload_dir: PathBuf,
    /// Folder for annotated result images
    pub output_dir: PathBuf,
    /// Include internal error details in error responses
    pub enable_error_details: bool,
    pub models: LprModelConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:5000".to_string(),
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("output"),
            enable_error_details: false,
            models: LprModelConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load defaults, overlay the TOML file if given, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Parse a TOML configuration file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Override fields from `LPR_*` environment variables
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Override fields from any key lookup (environment, tests)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("LPR_LISTEN_ADDR") {
            self.listen_addr = v;
        }
        if let Some(v) = lookup("LPR_UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("LPR_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("LPR_YOLO_MODEL") {
            self.models.yolo_model = PathBuf::from(v);
        }
        if let Some(v) = lookup("LPR_YOLO_CLASSES") {
            self.models.yolo_classes = PathBuf::from(v);
        }
        if let Some(v) = lookup("LPR_OCR_MODEL") {
            self.models.ocr_model = PathBuf::from(v);
        }
        if let Some(v) = lookup("LPR_FONT_PATH") {
            // Empty value disables the overlay font
            self.models.font_path = if v.is_empty() {
                None
            } else {
                Some(PathBuf::from(v))
            };
        }
        if let Some(v) = lookup("LPR_CONFIDENCE_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.models.confidence_threshold = v;
        }
        if let Some(v) = lookup("LPR_NMS_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.models.nms_threshold = v;
        }
        if let Some(v) = lookup("LPR_ENABLE_ERROR_DETAILS") {
            self.enable_error_details = matches!(v.to_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let in_unit_range = |v: f32| v > 0.0 && v <= 1.0;

        if !in_unit_range(self.models.confidence_threshold) {
            return Err(format!(
                "Confidence threshold must be in (0, 1], got {}",
                self.models.confidence_threshold
            ));
        }
        if !in_unit_range(self.models.nms_threshold) {
            return Err(format!(
                "NMS threshold must be in (0, 1], got {}",
                self.models.nms_threshold
            ));
        }
        if self.models.input_size == 0 {
            return Err("Detector input size must be greater than 0".to_string());
        }
        if self.models.intra_threads == 0 {
            return Err("Intra-op threads must be greater than 0".to_string());
        }
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!("Invalid listen address: {}", self.listen_addr));
        }
        Ok(())
    }
}
