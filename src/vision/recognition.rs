// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Character classification for segmented plate glyphs
//!
//! A CNN trained on 36 classes (digits then uppercase letters) scores each
//! glyph independently; the plate string is the argmax characters in
//! left-to-right order.

use anyhow::{Context, Result};
use image::GrayImage;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::{preprocess_character, CHAR_INPUT_SIZE};
use super::segmentation::CharacterImage;

/// Classifier output index `i` maps to the `i`-th character
pub const CHARACTER_SET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Recognized plate text with confidence scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedPlate {
    /// Classified characters, left to right
    pub text: String,
    /// Mean of the per-character confidences (0.0 when no characters)
    pub confidence: f32,
    /// Per-character confidences
    pub char_confidences: Vec<f32>,
}

impl RecognizedPlate {
    pub fn from_characters(characters: Vec<(char, f32)>) -> Self {
        let text: String = characters.iter().map(|(c, _)| *c).collect();
        let char_confidences: Vec<f32> = characters.iter().map(|(_, p)| *p).collect();
        let confidence = if char_confidences.is_empty() {
            0.0
        } else {
            char_confidences.iter().sum::<f32>() / char_confidences.len() as f32
        };

        Self {
            text,
            confidence,
            char_confidences,
        }
    }

    /// Check if no characters were recognized
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Scores one glyph against the character set
#[cfg_attr(test, mockall::automock)]
pub trait CharacterClassifier: Send + Sync {
    /// Classify a white-on-black glyph, returning the character and its score
    fn classify(&self, glyph: &GrayImage) -> Result<(char, f32)>;
}

/// Map a score vector to the best character
pub fn decode_scores(scores: &[f32]) -> Result<(char, f32)> {
    let classes = CHARACTER_SET.len();
    if scores.len() < classes {
        anyhow::bail!(
            "Classifier produced {} scores, expected {}",
            scores.len(),
            classes
        );
    }

    let (index, score) = scores[..classes]
        .iter()
        .copied()
        .enumerate()
        .fold((0usize, f32::NEG_INFINITY), |best, (i, s)| {
            if s > best.1 {
                (i, s)
            } else {
                best
            }
        });

    let ch = CHARACTER_SET
        .chars()
        .nth(index)
        .context("Class index outside character set")?;

    Ok((ch, score))
}

/// Classify every glyph in order and assemble the plate string
pub fn recognize_characters(
    classifier: &dyn CharacterClassifier,
    characters: &[CharacterImage],
) -> Result<RecognizedPlate> {
    let mut results = Vec::with_capacity(characters.len());
    for character in characters {
        results.push(classifier.classify(&character.glyph)?);
    }

    let plate = RecognizedPlate::from_characters(results);
    debug!("Recognized plate '{}' ({:.2})", plate.text, plate.confidence);
    Ok(plate)
}

/// CNN character classifier backed by ONNX Runtime
#[derive(Clone)]
pub struct OnnxCharacterClassifier {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    input_name: String,
    output_name: String,
    input_size: u32,
}

impl std::fmt::Debug for OnnxCharacterClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxCharacterClassifier")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("input_size", &self.input_size)
            .finish_non_exhaustive()
    }
}

impl OnnxCharacterClassifier {
    /// Load the classifier from an ONNX file
    ///
    /// # Errors
    /// Returns error if the file is missing or ONNX Runtime cannot load it.
    pub fn new<P: AsRef<Path>>(model_path: P, intra_threads: usize) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("OCR model not found: {}", model_path.display());
        }

        info!("Loading character classifier from {}", model_path.display());

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
                "Failed to load OCR model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "input".to_string());

        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .context("OCR model has no outputs")?;

        debug!(
            "Classifier loaded - input: {}, output: {}",
            input_name, output_name
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            output_name,
            input_size: CHAR_INPUT_SIZE,
        })
    }

    pub fn with_input_size(mut self, input_size: u32) -> Self {
        self.input_size = input_size;
        self
    }
}

impl CharacterClassifier for OnnxCharacterClassifier {
    fn classify(&self, glyph: &GrayImage) -> Result<(char, f32)> {
        let input = preprocess_character(glyph, self.input_size);

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Classifier session lock poisoned"))?;

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Character classification failed")?;

        let scores = outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let scores: Vec<f32> = scores.iter().copied().collect();
        decode_scores(&scores)
    }
}
