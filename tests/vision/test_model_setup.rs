// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use image::{DynamicImage, ImageReader};
use lpr_node::vision::{LprModelConfig, LprModelManager};
use std::path::PathBuf;

fn config_in(dir: &std::path::Path) -> LprModelConfig {
    LprModelConfig {
        yolo_model: dir.join("lapi.onnx"),
        yolo_classes: dir.join("classes.names"),
        ocr_model: dir.join("ocrmodel.onnx"),
        font_path: Some(dir.join("font.ttf")),
        ..Default::default()
    }
}

#[test]
fn test_verify_files_reports_missing() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    let checks = config.verify_files();
    assert_eq!(checks.len(), 4);
    assert!(checks.iter().all(|c| !c.exists()));
    assert!(!config.required_files_present());
    assert!(!checks[3].required);
}

#[test]
fn test_font_is_optional_for_setup() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    std::fs::write(&config.yolo_model, vec![0u8; 2048]).unwrap();
    std::fs::write(&config.yolo_classes, "plate\n").unwrap();
    std::fs::write(&config.ocr_model, vec![0u8; 1024]).unwrap();

    assert!(config.required_files_present());

    let checks = config.verify_files();
    assert_eq!(checks[0].size_bytes, Some(2048));
    assert!(checks[0].size_mb().unwrap() > 0.0);
    assert!(!checks[3].exists());
}

#[test]
fn test_load_fails_without_detector() {
    let dir = tempfile::tempdir().unwrap();
    let err = LprModelManager::load(config_in(dir.path())).unwrap_err();
    assert!(err.to_string().contains("YOLO weights not found"));
}

fn default_models_present() -> bool {
    LprModelConfig::default().required_files_present()
}

#[test]
#[ignore] // Requires model files
fn test_real_models_load() {
    if !default_models_present() {
        eprintln!("Skipping: model files not found under models/");
        return;
    }

    let manager = LprModelManager::load(LprModelConfig::default()).unwrap();
    let models = manager.list_models();
    assert!(models.iter().any(|m| m.model_type == "detection" && m.available));
    assert!(models.iter().any(|m| m.model_type == "recognition" && m.available));
}

#[test]
#[ignore] // Requires model files and test_images/car.jpg
fn test_real_models_read_sample_plate() {
    let sample = PathBuf::from("test_images/car.jpg");
    if !default_models_present() || !sample.exists() {
        eprintln!("Skipping: models or sample image missing");
        return;
    }

    let manager = LprModelManager::load(LprModelConfig::default()).unwrap();
    let image: DynamicImage = ImageReader::open(&sample).unwrap().decode().unwrap();

    let result = manager.pipeline().run(&image).unwrap();
    let recognition = result.expect("sample image should contain a plate");
    println!(
        "Plate '{}' (confidence {:.2}) at {:?}",
        recognition.plate.text, recognition.plate.confidence, recognition.plate_box
    );
    assert!(!recognition.plate.text.is_empty());
    assert!(recognition
        .plate
        .text
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
}
