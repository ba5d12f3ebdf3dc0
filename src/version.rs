// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the license plate recognition node

/// Full version string with feature description
pub const VERSION: &str = "v1.0.0-yolo-cnn-plates-2025-11-02";

/// Semantic version number
pub const VERSION_NUMBER: &str = "1.0.0";

/// Build date
pub const BUILD_DATE: &str = "2025-11-02";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "yolov3-plate-detection",
    "cnn-character-classification",
    "plate-segmentation",
    "annotated-result-images",
    "multipart-upload",
    "raw-body-upload",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("License Plate Recognition Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}
