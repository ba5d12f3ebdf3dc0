// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod image_store;

pub use image_store::{result_filename, secure_filename, ImageStore, StoreError, UploadGuard};
