// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod check_setup;
pub mod recognize;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::api::start_server;
use crate::config::ServerConfig;
use crate::vision::LprModelManager;

/// License Plate Recognition Node
#[derive(Parser, Debug)]
#[command(name = "lpr-node")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Vehicle license plate recognition over HTTP", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "LPR_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub models: ModelArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve(ServeArgs),

    /// Verify that model files are in place
    CheckSetup,

    /// Recognize the plate in one image and write the annotated result
    Recognize(recognize::RecognizeArgs),
}

/// Model file overrides shared by every command
#[derive(Args, Debug, Default, Clone)]
pub struct ModelArgs {
    /// YOLOv3 plate detector (ONNX)
    #[arg(long, global = true)]
    pub yolo_model: Option<PathBuf>,

    /// Detector class names file
    #[arg(long, global = true)]
    pub yolo_classes: Option<PathBuf>,

    /// Character classifier (ONNX)
    #[arg(long, global = true)]
    pub ocr_model: Option<PathBuf>,

    /// TrueType font for the text overlay
    #[arg(long, global = true)]
    pub font: Option<PathBuf>,
}

/// Arguments for the serve command
#[derive(Args, Debug, Default, Clone)]
pub struct ServeArgs {
    /// Address to listen on (e.g. 0.0.0.0:5000)
    #[arg(long)]
    pub listen: Option<String>,

    /// Temporary upload folder
    #[arg(long)]
    pub upload_dir: Option<PathBuf>,

    /// Folder for annotated result images
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Include internal error details in error responses
    #[arg(long)]
    pub enable_error_details: bool,
}

impl ModelArgs {
    pub fn apply(&self, config: &mut ServerConfig) {
        if let Some(path) = &self.yolo_model {
            config.models.yolo_model = path.clone();
        }
        if let Some(path) = &self.yolo_classes {
            config.models.yolo_classes = path.clone();
        }
        if let Some(path) = &self.ocr_model {
            config.models.ocr_model = path.clone();
        }
        if let Some(path) = &self.font {
            config.models.font_path = Some(path.clone());
        }
    }
}

impl ServeArgs {
    pub fn apply(&self, config: &mut ServerConfig) {
        if let Some(listen) = &self.listen {
            config.listen_addr = listen.clone();
        }
        if let Some(dir) = &self.upload_dir {
            config.upload_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if self.enable_error_details {
            config.enable_error_details = true;
        }
    }
}

/// Resolve the effective configuration: file and environment, then flags
pub fn resolve_config(cli: &Cli) -> Result<ServerConfig> {
    let mut config = ServerConfig::load(cli.config.as_deref())?;
    cli.models.apply(&mut config);
    if let Some(Commands::Serve(args)) = &cli.command {
        args.apply(&mut config);
    }
    config.validate().map_err(|e| anyhow!("Invalid configuration: {}", e))?;
    Ok(config)
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<ExitCode> {
    let config = resolve_config(&cli)?;

    match cli.command {
        None | Some(Commands::Serve(_)) => serve(config).await,
        Some(Commands::CheckSetup) => Ok(check_setup::run(&config)),
        Some(Commands::Recognize(args)) => recognize::run(&config, &args).await,
    }
}

async fn serve(config: ServerConfig) -> Result<ExitCode> {
    tracing::info!("{}", crate::version::get_version_string());
    tracing::info!("Features: {}", crate::version::FEATURES.join(", "));

    let models = config.models.clone();
    let manager = tokio::task::spawn_blocking(move || LprModelManager::load(models)).await??;

    start_server(&config, &manager).await?;
    Ok(ExitCode::SUCCESS)
}
