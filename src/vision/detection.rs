// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! License plate detection with a YOLOv3 model
//!
//! The detector is a darknet YOLOv3 network exported to ONNX. Each output head
//! yields rows of `[cx, cy, w, h, objectness, class scores...]` with coordinates
//! normalised to the network input.

use anyhow::{Context, Result};
use image::DynamicImage;
use ndarray::{Array4, ArrayD, ArrayView2, Axis, Ix2};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::{preprocess_for_detection, YOLO_INPUT_SIZE};

/// Default minimum class score for a plate candidate
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Default IoU above which overlapping candidates are suppressed
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.4;

/// Detected license plate region in original image pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlateBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Detection confidence score (0.0-1.0)
    pub confidence: f32,
}

impl PlateBox {
    /// Right edge (exclusive)
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Bottom edge (exclusive)
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u32 {
        self.width * self.height
    }

    /// Check that the box is non-empty and lies inside a `width x height` image
    pub fn is_within(&self, width: u32, height: u32) -> bool {
        self.width > 0 && self.height > 0 && self.right() <= width && self.bottom() <= height
    }

    /// Clip the box to image bounds
    ///
    /// Returns `None` when nothing of the box remains inside the image.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<PlateBox> {
        let x = self.x.min(width);
        let y = self.y.min(height);
        let right = self.right().min(width);
        let bottom = self.bottom().min(height);

        if right <= x || bottom <= y {
            return None;
        }

        Some(PlateBox {
            x,
            y,
            width: right - x,
            height: bottom - y,
            confidence: self.confidence,
        })
    }
}

/// A candidate box before suppression, in floating point pixel space
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
}

impl Candidate {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    /// Intersection over union with another candidate
    pub fn iou(&self, other: &Candidate) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let intersection = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }

    /// Convert to an integer box clipped to the image
    pub fn to_plate_box(&self, width: u32, height: u32) -> Option<PlateBox> {
        let x1 = self.x1.max(0.0).round() as u32;
        let y1 = self.y1.max(0.0).round() as u32;
        let x2 = self.x2.max(0.0).round() as u32;
        let y2 = self.y2.max(0.0).round() as u32;

        PlateBox {
            x: x1,
            y: y1,
            width: x2.saturating_sub(x1),
            height: y2.saturating_sub(y1),
            confidence: self.confidence,
        }
        .clamp_to(width, height)
    }
}

/// Locates the license plate in a vehicle image
#[cfg_attr(test, mockall::automock)]
pub trait PlateDetector: Send + Sync {
    /// Return the most confident plate, or `None` when nothing passes the threshold
    fn detect(&self, image: &DynamicImage) -> Result<Option<PlateBox>>;
}

/// Turn raw YOLO rows into candidates above the confidence threshold
///
/// `rows` has shape `[N, 5 + C]` (or `[1, N, 5 + C]`). A row's confidence is
/// its best class score, matching darknet post-processing.
pub fn parse_yolo_rows(
    rows: &ArrayD<f32>,
    image_width: u32,
    image_height: u32,
    confidence_threshold: f32,
) -> Result<Vec<Candidate>> {
    let rows: ArrayView2<f32> = match rows.ndim() {
        2 => rows.view().into_dimensionality::<Ix2>()?,
        3 if rows.shape()[0] == 1 => rows.index_axis(Axis(0), 0).into_dimensionality::<Ix2>()?,
        _ => anyhow::bail!("Unexpected YOLO output shape: {:?}", rows.shape()),
    };

    let num_cols = rows.shape()[1];
    if num_cols < 6 {
        anyhow::bail!("YOLO output has {} columns, expected at least 6", num_cols);
    }

    let img_w = image_width as f32;
    let img_h = image_height as f32;
    let mut candidates = Vec::new();

    for row in rows.outer_iter() {
        let best_score = row
            .iter()
            .skip(5)
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);

        if best_score > confidence_threshold {
            let cx = row[0] * img_w;
            let cy = row[1] * img_h;
            let w = row[2] * img_w;
            let h = row[3] * img_h;

            candidates.push(Candidate {
                x1: cx - w / 2.0,
                y1: cy - h / 2.0,
                x2: cx + w / 2.0,
                y2: cy + h / 2.0,
                confidence: best_score,
            });
        }
    }

    Ok(candidates)
}

/// Non-maximum suppression, strongest first
pub fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if keep.iter().all(|k| k.iou(&candidate) <= iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}

/// Pick the plate from all output heads of one forward pass
pub fn select_plate(
    outputs: &[ArrayD<f32>],
    image_width: u32,
    image_height: u32,
    confidence_threshold: f32,
    nms_threshold: f32,
) -> Result<Option<PlateBox>> {
    let mut candidates = Vec::new();
    for output in outputs {
        candidates.extend(parse_yolo_rows(
            output,
            image_width,
            image_height,
            confidence_threshold,
        )?);
    }

    let survivors = nms(candidates, nms_threshold);
    debug!("{} plate candidates after NMS", survivors.len());

    Ok(survivors
        .iter()
        .find_map(|c| c.to_plate_box(image_width, image_height)))
}

/// YOLOv3 plate detector backed by ONNX Runtime
///
/// Runs on CPU. The session is shared behind a mutex because inference
/// needs exclusive access.
#[derive(Clone)]
pub struct YoloPlateDetector {
    session: Arc<Mutex<Session>>,
    input_name: String,
    output_names: Vec<String>,
    class_names: Vec<String>,
    input_size: u32,
    confidence_threshold: f32,
    nms_threshold: f32,
}

impl std::fmt::Debug for YoloPlateDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloPlateDetector")
            .field("input_name", &self.input_name)
            .field("output_names", &self.output_names)
            .field("class_names", &self.class_names)
            .field("input_size", &self.input_size)
            .field("confidence_threshold", &self.confidence_threshold)
            .field("nms_threshold", &self.nms_threshold)
            .finish_non_exhaustive()
    }
}

impl YoloPlateDetector {
    /// Load the detector from an ONNX file and a class names file
    ///
    /// # Errors
    /// Returns error if either file is missing or ONNX Runtime cannot load the model.
    pub fn new<P: AsRef<Path>>(model_path: P, classes_path: P, intra_threads: usize) -> Result<Self> {
        let model_path = model_path.as_ref();
        let classes_path = classes_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("YOLO weights not found: {}", model_path.display());
        }

        let class_names = load_class_names(classes_path)?;

        info!("Loading YOLO plate detector from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load YOLO model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "input".to_string());

        let output_names: Vec<String> = session
            .outputs
            .iter()
            .map(|output| output.name.clone())
            .collect();

        if output_names.is_empty() {
            anyhow::bail!("YOLO model {} has no outputs", model_path.display());
        }

        debug!(
            "Detector loaded - input: {}, outputs: {:?}, classes: {:?}",
            input_name, output_names, class_names
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            output_names,
            class_names,
            input_size: YOLO_INPUT_SIZE,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            nms_threshold: DEFAULT_NMS_THRESHOLD,
        })
    }

    pub fn with_input_size(mut self, input_size: u32) -> Self {
        self.input_size = input_size;
        self
    }

    /// Set the confidence threshold for detections
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_nms_threshold(mut self, threshold: f32) -> Self {
        self.nms_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    fn forward(&self, input: Array4<f32>) -> Result<Vec<ArrayD<f32>>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Detector session lock poisoned"))?;

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")?;

        let mut heads = Vec::with_capacity(self.output_names.len());
        for name in &self.output_names {
            let tensor = outputs[name.as_str()]
                .try_extract_array::<f32>()
                .context("Failed to extract output tensor")?;
            heads.push(tensor.to_owned());
        }
        Ok(heads)
    }
}

impl PlateDetector for YoloPlateDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Option<PlateBox>> {
        let input = preprocess_for_detection(image, self.input_size);
        let outputs = self.forward(input)?;

        let plate = select_plate(
            &outputs,
            image.width(),
            image.height(),
            self.confidence_threshold,
            self.nms_threshold,
        )?;

        match &plate {
            Some(b) => debug!(
                "Plate at ({}, {}) {}x{} conf {:.2}",
                b.x, b.y, b.width, b.height, b.confidence
            ),
            None => debug!("No plate above threshold {}", self.confidence_threshold),
        }

        Ok(plate)
    }
}

/// Read one class name per non-empty line
pub fn load_class_names<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    if !path.exists() {
        anyhow::bail!("YOLO class names not found: {}", path.display());
    }

    let contents = fs::read_to_string(path)
        .context(format!("Failed to read class names: {}", path.display()))?;

    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
