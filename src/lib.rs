// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod storage;
pub mod version;
pub mod vision;

// Re-export main types
pub use api::{create_app, start_server, AppState};
pub use config::ServerConfig;
pub use storage::ImageStore;
pub use vision::{
    CharacterClassifier, LprModelConfig, LprModelManager, PlateBox, PlateDetector, PlatePipeline,
    PlateRecognition, RecognizedPlate,
};
