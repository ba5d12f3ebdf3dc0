// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tensor preprocessing for the plate detector and the character classifier

use image::{DynamicImage, GrayImage};
use ndarray::Array4;

/// Default YOLOv3 input size
pub const YOLO_INPUT_SIZE: u32 = 416;

/// Default character classifier input size (square)
pub const CHAR_INPUT_SIZE: u32 = 28;

/// Preprocess an image for YOLO detection
///
/// Steps:
/// 1. Resize (no aspect ratio preservation) to `input_size x input_size`
/// 2. Convert to RGB
/// 3. Scale pixel values to [0, 1]
/// 4. Convert to NCHW tensor format [1, 3, H, W]
///
/// Detector outputs are normalised to the input, so boxes map back to the
/// original image by multiplying with its width and height.
pub fn preprocess_for_detection(image: &DynamicImage, input_size: u32) -> Array4<f32> {
    let resized = image.resize_exact(
        input_size,
        input_size,
        image::imageops::FilterType::Triangle,
    );
    let rgb = resized.to_rgb8();

    let size = input_size as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    tensor
}

/// Preprocess one segmented character for classification
///
/// The glyph is resized to `size x size`, replicated across three channels
/// and scaled to [0, 1]. Layout is NHWC [1, H, W, 3].
pub fn preprocess_character(glyph: &GrayImage, size: u32) -> Array4<f32> {
    let resized = image::imageops::resize(glyph, size, size, image::imageops::FilterType::Triangle);

    let side = size as usize;
    let mut tensor = Array4::zeros((1, side, side, 3));

    for (x, y, pixel) in resized.enumerate_pixels() {
        let value = pixel[0] as f32 / 255.0;
        for c in 0..3 {
            tensor[[0, y as usize, x as usize, c]] = value;
        }
    }

    tensor
}
