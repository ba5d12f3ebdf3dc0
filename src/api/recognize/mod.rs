// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Recognition API endpoint module
//!
//! Provides POST /recognize for reading license plates from vehicle images.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::recognize_handler;
pub use request::{RecognizeParams, RecognizeRequest, UploadSource};
pub use response::{BoundingBox, RecognizeResponse};
