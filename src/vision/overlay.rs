// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Result overlay: plate rectangle and recognized text

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::Path;
use tracing::info;

use super::detection::PlateBox;

/// Rectangle thickness in pixels
pub const BOX_THICKNESS: u32 = 3;

/// Text height in pixels
pub const TEXT_SCALE: f32 = 32.0;

/// Gap between the text and the rectangle
const TEXT_MARGIN: u32 = 6;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Load a TrueType font for text overlays
pub fn load_font<P: AsRef<Path>>(path: P) -> Result<FontVec> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read font {}", path.display()))?;
    let font = FontVec::try_from_vec(bytes)
        .map_err(|e| anyhow::anyhow!("Invalid font {}: {}", path.display(), e))?;
    info!("Loaded overlay font from {}", path.display());
    Ok(font)
}

/// Draw the plate rectangle and, when a font is available, the plate text
pub fn annotate(
    image: &DynamicImage,
    plate: &PlateBox,
    text: &str,
    font: Option<&FontVec>,
) -> RgbImage {
    let mut canvas = image.to_rgb8();

    // Thickness grows inward so the box stays inside the plate bounds
    for offset in 0..BOX_THICKNESS {
        let width = plate.width.saturating_sub(2 * offset);
        let height = plate.height.saturating_sub(2 * offset);
        if width == 0 || height == 0 {
            break;
        }
        let rect = Rect::at((plate.x + offset) as i32, (plate.y + offset) as i32)
            .of_size(width, height);
        draw_hollow_rect_mut(&mut canvas, rect, BOX_COLOR);
    }

    if let Some(font) = font {
        if !text.is_empty() {
            let scale = PxScale::from(TEXT_SCALE);
            let (_, text_height) = text_size(scale, font, text);
            let y = text_origin_y(plate, text_height, canvas.height());
            draw_text_mut(
                &mut canvas,
                TEXT_COLOR,
                plate.x as i32,
                y as i32,
                scale,
                font,
                text,
            );
        }
    }

    canvas
}

/// Top of the text: above the box, or below it when there is no room above
fn text_origin_y(plate: &PlateBox, text_height: u32, image_height: u32) -> u32 {
    let needed = text_height + TEXT_MARGIN;
    if plate.y >= needed {
        plate.y - needed
    } else {
        let below = plate.bottom() + TEXT_MARGIN;
        below.min(image_height.saturating_sub(text_height))
    }
}
