//! Crop a fractional rectangle and scale it to an exact output size.
//!
//! Used for passport and ID photos: the crop rectangle is given as
//! fractions of the source so it survives any preview scaling, and the
//! result is flattened onto an opaque white background the way a photo
//! print would be.

use std::fmt;
use std::str::FromStr;

use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::buffer::clamp_channel;
use crate::types::{CropRect, FilterError, OutputSize, RgbaImage};

/// Resampling filter used when scaling the cropped region.
///
/// Ordered from fastest/lowest-quality to slowest/highest-quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResampleFilter {
    /// Nearest-neighbor: fastest, blocky artifacts.
    Nearest,
    /// Bilinear interpolation: fast, decent quality.
    #[default]
    Triangle,
    /// Bicubic (Catmull-Rom): moderate speed, good quality.
    CatmullRom,
    /// Gaussian: moderate speed, smooth output.
    Gaussian,
    /// Lanczos with 3 lobes: slowest, sharpest/best for photos.
    Lanczos3,
}

impl ResampleFilter {
    /// Every filter, fastest first.
    pub const ALL: [Self; 5] = [
        Self::Nearest,
        Self::Triangle,
        Self::CatmullRom,
        Self::Gaussian,
        Self::Lanczos3,
    ];

    /// Convert to the `image` crate's `FilterType`.
    const fn to_image_filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Nearest => "Nearest",
            Self::Triangle => "Triangle",
            Self::CatmullRom => "CatmullRom",
            Self::Gaussian => "Gaussian",
            Self::Lanczos3 => "Lanczos3",
        }
    }
}

impl fmt::Display for ResampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResampleFilter {
    type Err = FilterError;

    /// Parse a filter name, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|filter| filter.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| FilterError::InvalidParameter(format!("unknown resample filter: {s}")))
    }
}

/// Crop `rect` out of `image`, scale it to `size`, and flatten the
/// result onto opaque white.
///
/// The rectangle is first clamped into the unit square, then snapped
/// outward to whole source pixels. A rectangle that covers no source
/// pixel yields a white image of the requested size. Every output
/// pixel is fully opaque.
///
/// # Errors
///
/// Returns [`FilterError::InvalidParameter`] if either output dimension
/// is zero or any rectangle component is not finite.
pub fn crop_and_scale(
    image: &RgbaImage,
    rect: &CropRect,
    size: OutputSize,
    filter: ResampleFilter,
) -> Result<RgbaImage, FilterError> {
    if size.width == 0 || size.height == 0 {
        return Err(FilterError::InvalidParameter(format!(
            "output size must be non-zero, got {}x{}",
            size.width, size.height
        )));
    }
    if !rect.is_finite() {
        return Err(FilterError::InvalidParameter(format!(
            "crop rectangle must be finite, got {rect:?}"
        )));
    }

    let Some((x, y, width, height)) = pixel_bounds(image, &rect.clamped()) else {
        debug!(?rect, "crop covers no pixels");
        return Ok(RgbaImage::from_pixel(
            size.width,
            size.height,
            image::Rgba([255, 255, 255, 255]),
        ));
    };

    let region = imageops::crop_imm(image, x, y, width, height).to_image();
    let scaled = if (width, height) == (size.width, size.height) {
        region
    } else {
        imageops::resize(&region, size.width, size.height, filter.to_image_filter())
    };
    debug!(
        x,
        y,
        width,
        height,
        out_width = size.width,
        out_height = size.height,
        %filter,
        "crop and scale"
    );
    Ok(flatten_onto_white(&scaled))
}

/// Source pixel rectangle covering a clamped fractional rect, or `None`
/// when it covers nothing.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::similar_names
)]
fn pixel_bounds(image: &RgbaImage, rect: &CropRect) -> Option<(u32, u32, u32, u32)> {
    let (w, h) = (f64::from(image.width()), f64::from(image.height()));
    let x0 = (rect.x * w).floor();
    let y0 = (rect.y * h).floor();
    let x1 = ((rect.x + rect.width) * w).ceil().min(w);
    let y1 = ((rect.y + rect.height) * h).ceil().min(h);
    if rect.width <= 0.0 || rect.height <= 0.0 || x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
}

/// Composite every pixel over opaque white.
///
/// The result is fully opaque. Fully transparent pixels become white
/// regardless of their stored color.
#[must_use = "returns the flattened image"]
pub fn flatten_onto_white(image: &RgbaImage) -> RgbaImage {
    let mut output = image.clone();
    for pixel in output.pixels_mut() {
        let alpha = f64::from(pixel.0[3]) / 255.0;
        for channel in &mut pixel.0[..3] {
            *channel = clamp_channel(f64::from(*channel).mul_add(alpha, 255.0 * (1.0 - alpha)));
        }
        pixel.0[3] = 255;
    }
    output
}
