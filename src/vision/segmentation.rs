// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Plate segmentation: split a cropped plate into per-character glyphs

use image::{imageops, DynamicImage, GrayImage, Luma};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, erode};
use imageproc::region_labelling::{connected_components, Connectivity};
use std::collections::HashMap;
use tracing::debug;

/// Plate width after normalisation
pub const PLATE_WIDTH: u32 = 333;

/// Plate height after normalisation
pub const PLATE_HEIGHT: u32 = 75;

/// Border blanked after thresholding to detach glyphs from the plate frame
pub const BORDER: u32 = 3;

/// Glyph size before padding
pub const GLYPH_WIDTH: u32 = 20;
pub const GLYPH_HEIGHT: u32 = 40;

/// Canvas each glyph is centred on
pub const CANVAS_WIDTH: u32 = 24;
pub const CANVAS_HEIGHT: u32 = 44;

/// Accepted glyph bounding box sizes in the normalised plate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphBounds {
    pub min_width: f32,
    pub max_width: f32,
    pub min_height: f32,
    pub max_height: f32,
}

impl Default for GlyphBounds {
    fn default() -> Self {
        let w = PLATE_HEIGHT as f32;
        let h = PLATE_WIDTH as f32;
        Self {
            min_width: w / 6.0,
            max_width: w / 2.0,
            min_height: h / 10.0,
            max_height: 2.0 * h / 3.0,
        }
    }
}

impl GlyphBounds {
    pub fn accepts(&self, width: u32, height: u32) -> bool {
        let (w, h) = (width as f32, height as f32);
        w > self.min_width && w < self.max_width && h > self.min_height && h < self.max_height
    }
}

/// One segmented character, white glyph on black
#[derive(Debug, Clone)]
pub struct CharacterImage {
    /// Left edge in the normalised plate, used for ordering
    pub x: u32,
    /// Padded glyph (`CANVAS_WIDTH x CANVAS_HEIGHT`)
    pub glyph: GrayImage,
}

#[derive(Debug, Clone, Copy)]
struct ComponentBox {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl ComponentBox {
    fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }
}

/// Normalise the plate and binarise it so glyphs are white
///
/// Resize, grayscale, inverted Otsu threshold, 3x3 erode then dilate, and a
/// blanked border.
pub fn binarize_plate(plate: &DynamicImage) -> GrayImage {
    let resized = plate.resize_exact(PLATE_WIDTH, PLATE_HEIGHT, imageops::FilterType::Triangle);
    let gray = resized.to_luma8();

    let level = otsu_level(&gray);
    let binary = threshold(&gray, level, ThresholdType::BinaryInverted);

    let mut cleaned = dilate(&erode(&binary, Norm::LInf, 1), Norm::LInf, 1);

    let (width, height) = cleaned.dimensions();
    for (x, y, pixel) in cleaned.enumerate_pixels_mut() {
        if x < BORDER || y < BORDER || x >= width - BORDER || y >= height - BORDER {
            *pixel = Luma([0]);
        }
    }

    cleaned
}

/// Segment a cropped plate into ordered character glyphs
pub fn segment_characters(plate: &DynamicImage) -> Vec<CharacterImage> {
    segment_characters_with(plate, &GlyphBounds::default())
}

pub fn segment_characters_with(plate: &DynamicImage, bounds: &GlyphBounds) -> Vec<CharacterImage> {
    if plate.width() == 0 || plate.height() == 0 {
        return Vec::new();
    }

    let binary = binarize_plate(plate);
    let boxes = component_boxes(&binary);

    let mut characters: Vec<CharacterImage> = boxes
        .into_iter()
        .filter(|b| bounds.accepts(b.width(), b.height()))
        .map(|b| CharacterImage {
            x: b.min_x,
            glyph: pad_glyph(&binary, &b),
        })
        .collect();

    characters.sort_by_key(|c| c.x);
    debug!("Segmented {} characters", characters.len());
    characters
}

/// Bounding boxes of the white connected components
fn component_boxes(binary: &GrayImage) -> Vec<ComponentBox> {
    let labeled = connected_components(binary, Connectivity::Eight, Luma([0u8]));

    let mut regions: HashMap<u32, ComponentBox> = HashMap::new();
    for (x, y, label) in labeled.enumerate_pixels() {
        let label = label[0];
        if label == 0 {
            continue;
        }

        regions
            .entry(label)
            .and_modify(|b| {
                b.min_x = b.min_x.min(x);
                b.min_y = b.min_y.min(y);
                b.max_x = b.max_x.max(x);
                b.max_y = b.max_y.max(y);
            })
            .or_insert(ComponentBox {
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
            });
    }

    regions.into_values().collect()
}

/// Crop a component, resize it to the glyph size and centre it on a black canvas
fn pad_glyph(binary: &GrayImage, b: &ComponentBox) -> GrayImage {
    let crop = imageops::crop_imm(binary, b.min_x, b.min_y, b.width(), b.height()).to_image();
    let glyph = imageops::resize(&crop, GLYPH_WIDTH, GLYPH_HEIGHT, imageops::FilterType::Triangle);

    let mut canvas = GrayImage::new(CANVAS_WIDTH, CANVAS_HEIGHT);
    imageops::overlay(
        &mut canvas,
        &glyph,
        ((CANVAS_WIDTH - GLYPH_WIDTH) / 2) as i64,
        ((CANVAS_HEIGHT - GLYPH_HEIGHT) / 2) as i64,
    );
    canvas
}
