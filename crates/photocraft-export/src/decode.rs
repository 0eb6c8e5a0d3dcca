//! Decode image file bytes into an RGBA buffer.

use photocraft_filters::RgbaImage;
use tracing::info;

use crate::error::ExportError;

/// Decode PNG, JPEG, BMP or WebP bytes into an 8-bit RGBA image.
///
/// The format is sniffed from the data. Grayscale and RGB sources gain
/// an opaque alpha channel.
///
/// # Errors
///
/// Returns [`ExportError::EmptyInput`] for an empty slice and
/// [`ExportError::ImageDecode`] if the bytes are not a supported image.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, ExportError> {
    if bytes.is_empty() {
        return Err(ExportError::EmptyInput);
    }
    let image = image::load_from_memory(bytes)
        .map_err(ExportError::ImageDecode)?
        .into_rgba8();
    info!(
        bytes = bytes.len(),
        width = image.width(),
        height = image.height(),
        "decoded image"
    );
    Ok(image)
}
