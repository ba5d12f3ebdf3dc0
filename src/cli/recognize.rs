// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Args;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::config::ServerConfig;
use crate::vision::{
    decode_image_bytes, encode_jpeg, LprModelManager, PlatePipeline, PlateRecognition,
};

/// Arguments for the recognize command
#[derive(Args, Debug, Clone)]
pub struct RecognizeArgs {
    /// Path to the vehicle image
    #[arg(long)]
    pub image: PathBuf,

    /// Where to write the annotated image
    #[arg(long, default_value = "output/final_image.jpg")]
    pub output: PathBuf,
}

/// Run the pipeline on one file and write the annotated result
///
/// Returns `Ok(None)` when no plate is detected; nothing is written then.
pub fn recognize_file(
    pipeline: &PlatePipeline,
    image_path: &Path,
    output_path: &Path,
) -> Result<Option<PlateRecognition>> {
    if !image_path.is_file() {
        anyhow::bail!("Image file '{}' does not exist", image_path.display());
    }

    let bytes = std::fs::read(image_path)
        .with_context(|| format!("Failed to read {}", image_path.display()))?;
    let (image, _) = decode_image_bytes(&bytes)
        .with_context(|| format!("Failed to decode {}", image_path.display()))?;

    let Some(recognition) = pipeline.run(&image)? else {
        return Ok(None);
    };

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let jpeg = encode_jpeg(&DynamicImage::ImageRgb8(recognition.annotated.clone()))?;
    std::fs::write(output_path, jpeg)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    Ok(Some(recognition))
}

/// Execute the recognize command
pub async fn run(config: &ServerConfig, args: &RecognizeArgs) -> Result<ExitCode> {
    let models = config.models.clone();
    let manager = tokio::task::spawn_blocking(move || LprModelManager::load(models)).await??;
    let pipeline = manager.pipeline();

    println!("Processing image: {}", args.image.display());
    let image = args.image.clone();
    let output = args.output.clone();
    let result =
        tokio::task::spawn_blocking(move || recognize_file(&pipeline, &image, &output)).await??;

    match result {
        Some(recognition) => {
            info!("Recognition took {}ms", recognition.processing_time_ms);
            println!(
                "Plate: {} (confidence {:.2})",
                recognition.plate.text, recognition.plate.confidence
            );
            println!("Result saved to: {}", args.output.display());
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!("Error: Could not detect license plate in the image");
            println!("   - The image may not contain a visible license plate");
            println!("   - Try a different image with a clearer license plate");
            Ok(ExitCode::FAILURE)
        }
    }
}
