//! Encode RGBA buffers to PNG, JPEG or WebP.

use std::fmt;
use std::str::FromStr;

use image::ImageEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use photocraft_filters::RgbaImage;
use photocraft_filters::crop::flatten_onto_white;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ExportError;

/// Output file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Lossless PNG, alpha preserved.
    #[default]
    Png,
    /// Baseline JPEG. Alpha is flattened onto white.
    #[serde(rename = "jpg", alias = "jpeg")]
    Jpeg,
    /// Lossless WebP, alpha preserved.
    WebP,
}

impl ExportFormat {
    /// Every format, in menu order.
    pub const ALL: [Self; 3] = [Self::Png, Self::Jpeg, Self::WebP];

    /// MIME type for the encoded bytes.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// File extension without the leading dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Quality preset offered for this format.
    #[must_use]
    pub const fn default_quality(self) -> Quality {
        match self {
            Self::Png => Quality(1.0),
            Self::Jpeg => Quality(0.9),
            Self::WebP => Quality(0.85),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    /// Parse an extension or format name, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::WebP),
            _ => Err(format!("unknown export format: {s}")),
        }
    }
}

/// Encoder quality in `[0, 1]`.
///
/// Only JPEG honours it. PNG and WebP are written losslessly.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Quality(f64);

impl Quality {
    /// Build from a fraction in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidQuality`] outside that range or for NaN.
    pub fn new(value: f64) -> Result<Self, ExportError> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ExportError::InvalidQuality(value))
        }
    }

    /// Build from a percentage in `0..=100`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidQuality`] above 100.
    pub fn from_percent(percent: u8) -> Result<Self, ExportError> {
        Self::new(f64::from(percent) / 100.0)
    }

    /// The fraction in `[0, 1]`.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// JPEG encoder quality, `1..=100`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn jpeg_quality(self) -> u8 {
        (self.0 * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

impl TryFrom<f64> for Quality {
    type Error = ExportError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quality> for f64 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

/// Encode `image` in `format`.
///
/// # Errors
///
/// Returns [`ExportError::Encode`] if the encoder rejects the image.
pub fn encode(
    image: &RgbaImage,
    format: ExportFormat,
    quality: Quality,
) -> Result<Vec<u8>, ExportError> {
    let (width, height) = image.dimensions();
    let mut buf = Vec::new();
    let result = match format {
        ExportFormat::Png => PngEncoder::new(&mut buf).write_image(
            image.as_raw(),
            width,
            height,
            image::ExtendedColorType::Rgba8,
        ),
        ExportFormat::Jpeg => {
            let rgb = image::DynamicImage::ImageRgba8(flatten_onto_white(image)).into_rgb8();
            JpegEncoder::new_with_quality(&mut buf, quality.jpeg_quality()).write_image(
                rgb.as_raw(),
                width,
                height,
                image::ExtendedColorType::Rgb8,
            )
        }
        ExportFormat::WebP => WebPEncoder::new_lossless(&mut buf).write_image(
            image.as_raw(),
            width,
            height,
            image::ExtendedColorType::Rgba8,
        ),
    };
    result.map_err(|source| ExportError::Encode {
        format: format.extension(),
        source,
    })?;
    info!(
        %format,
        width,
        height,
        quality = quality.value(),
        bytes = buf.len(),
        "encoded image"
    );
    Ok(buf)
}

/// Download file name for a processed image:
/// `photocraft-{mode}-{timestamp_ms}.{ext}`.
#[must_use]
pub fn export_file_name(mode: &str, timestamp_ms: u64, format: ExportFormat) -> String {
    format!("photocraft-{mode}-{timestamp_ms}.{}", format.extension())
}
