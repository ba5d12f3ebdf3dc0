// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use lpr_node::vision::{
    CharacterClassifier, PipelineError, PlateBox, PlateDetector, PlatePipeline,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct FixedDetector(Option<PlateBox>);

impl PlateDetector for FixedDetector {
    fn detect(&self, _image: &DynamicImage) -> Result<Option<PlateBox>> {
        Ok(self.0)
    }
}

/// Reads characters off a fixed string in call order
struct SequenceClassifier {
    text: Vec<char>,
    next: AtomicUsize,
}

impl SequenceClassifier {
    fn new(text: &str) -> Self {
        Self {
            text: text.chars().collect(),
            next: AtomicUsize::new(0),
        }
    }
}

impl CharacterClassifier for SequenceClassifier {
    fn classify(&self, _glyph: &GrayImage) -> Result<(char, f32)> {
        let i = self.next.fetch_add(1, Ordering::SeqCst);
        match self.text.get(i) {
            Some(&c) => Ok((c, 0.8 + i as f32 * 0.05)),
            None => anyhow::bail!("unexpected glyph {}", i),
        }
    }
}

fn plate_box(x: u32, y: u32, width: u32, height: u32) -> PlateBox {
    PlateBox {
        x,
        y,
        width,
        height,
        confidence: 0.9,
    }
}

/// 640x360 scene with a plate at (150, 200) carrying four bars
fn scene() -> DynamicImage {
    let mut img = RgbImage::from_pixel(640, 360, Rgb([60, 70, 80]));
    for x in 150..483 {
        for y in 200..275 {
            img.put_pixel(x, y, Rgb([245, 245, 245]));
        }
    }
    for left in [40u32, 110, 180, 250] {
        for x in 150 + left..150 + left + 20 {
            for y in 215..260 {
                img.put_pixel(x, y, Rgb([20, 20, 20]));
            }
        }
    }
    DynamicImage::ImageRgb8(img)
}

fn pipeline(plate: Option<PlateBox>, text: &str) -> PlatePipeline {
    PlatePipeline::new(
        Arc::new(FixedDetector(plate)),
        Arc::new(SequenceClassifier::new(text)),
        None,
    )
}

#[test]
fn test_plate_text_read_in_order() {
    let result = pipeline(Some(plate_box(150, 200, 333, 75)), "KA01")
        .run(&scene())
        .unwrap()
        .unwrap();

    assert_eq!(result.plate.text, "KA01");
    assert_eq!(result.plate.char_confidences.len(), 4);
    let expected = (0.8 + 0.85 + 0.9 + 0.95) / 4.0;
    assert!((result.plate.confidence - expected).abs() < 1e-5);
    assert_eq!(result.plate_box, plate_box(150, 200, 333, 75));
}

#[test]
fn test_annotation_draws_box_on_copy() {
    let image = scene();
    let result = pipeline(Some(plate_box(150, 200, 333, 75)), "KA01")
        .run(&image)
        .unwrap()
        .unwrap();

    assert_eq!(result.annotated.dimensions(), (640, 360));
    assert_eq!(*result.annotated.get_pixel(150, 200), Rgb([0, 255, 0]));
    assert_eq!(*result.annotated.get_pixel(482, 274), Rgb([0, 255, 0]));
    // Away from the box the scene is untouched
    assert_eq!(*result.annotated.get_pixel(10, 10), Rgb([60, 70, 80]));
    assert_eq!(image.to_rgb8().get_pixel(150, 200), &Rgb([245, 245, 245]));
}

#[test]
fn test_box_overhanging_edge_is_clamped() {
    let result = pipeline(Some(plate_box(500, 300, 333, 75)), "")
        .run(&scene())
        .unwrap()
        .unwrap();

    assert_eq!(result.plate_box, plate_box(500, 300, 140, 60));
    assert_eq!(result.plate.text, "");
}

#[test]
fn test_box_outside_image_rejected() {
    let outcome = pipeline(Some(plate_box(700, 400, 50, 20)), "").run(&scene());
    assert!(matches!(outcome, Err(PipelineError::InvalidPlateBox(_))));
}

#[test]
fn test_no_detection_is_none() {
    assert!(pipeline(None, "").run(&scene()).unwrap().is_none());
}

#[test]
fn test_pipeline_shared_across_threads() {
    let pipeline = PlatePipeline::new(
        Arc::new(FixedDetector(Some(plate_box(150, 200, 333, 75)))),
        Arc::new(FixedClassifier),
        None,
    );
    let image = Arc::new(scene());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let pipeline = pipeline.clone();
            let image = image.clone();
            std::thread::spawn(move || pipeline.run(&image).unwrap().unwrap().plate.text)
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), "7777");
    }
}

struct FixedClassifier;

impl CharacterClassifier for FixedClassifier {
    fn classify(&self, _glyph: &GrayImage) -> Result<(char, f32)> {
        Ok(('7', 0.99))
    }
}
