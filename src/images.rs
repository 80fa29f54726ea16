//! Local checks on reference images before they are uploaded.

use crate::error::{RodinError, Result};
use std::path::Path;

/// File extensions the API accepts.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Largest accepted file, in bytes.
pub const MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Smallest accepted width and height.
pub const MIN_RESOLUTION: (u32, u32) = (512, 512);

/// Largest accepted width and height.
pub const MAX_RESOLUTION: (u32, u32) = (4096, 4096);

/// Validates a single reference image.
///
/// Only the image header is decoded, so this stays cheap even for large files.
///
/// # Errors
///
/// Returns [`RodinError::Validation`] if the file is missing, too large, has an
/// unsupported extension, or its resolution is outside the accepted range.
pub fn validate_image(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|_| {
        RodinError::Validation(format!("image file does not exist: {}", path.display()))
    })?;
    if !metadata.is_file() {
        return Err(RodinError::Validation(format!(
            "image path is not a file: {}",
            path.display()
        )));
    }

    if metadata.len() > MAX_FILE_SIZE {
        return Err(RodinError::Validation(format!(
            "image {} exceeds the {}MB size limit",
            path.display(),
            MAX_FILE_SIZE / (1024 * 1024)
        )));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(RodinError::Validation(format!(
            "unsupported image format for {}; use one of: {}",
            path.display(),
            SUPPORTED_EXTENSIONS.join(", ")
        )));
    }

    let (width, height) = ::image::image_dimensions(path).map_err(|e| {
        RodinError::Validation(format!("failed to read image {}: {e}", path.display()))
    })?;
    if width < MIN_RESOLUTION.0 || height < MIN_RESOLUTION.1 {
        return Err(RodinError::Validation(format!(
            "image {} is {width}x{height}; minimum resolution is {}x{}",
            path.display(),
            MIN_RESOLUTION.0,
            MIN_RESOLUTION.1
        )));
    }
    if width > MAX_RESOLUTION.0 || height > MAX_RESOLUTION.1 {
        return Err(RodinError::Validation(format!(
            "image {} is {width}x{height}; maximum resolution is {}x{}",
            path.display(),
            MAX_RESOLUTION.0,
            MAX_RESOLUTION.1
        )));
    }

    Ok(())
}
