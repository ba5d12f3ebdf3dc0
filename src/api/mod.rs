// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod handlers;
pub mod http_server;
pub mod recognize;
pub mod result_image;

pub use errors::{ApiError, ErrorResponse};
pub use handlers::{health_handler, info_handler, HealthResponse, InfoResponse};
pub use http_server::{create_app, start_server, AppState, MAX_BODY_SIZE};
pub use recognize::{recognize_handler, BoundingBox, RecognizeResponse};
pub use result_image::result_image_handler;
