//! Point-wise color filters: posterization, saturation, and the
//! brightness/contrast/saturation/sharpness enhancement chain.
//!
//! Everything here except the final sharpening pass of [`enhance`] maps
//! each pixel independently. Grayscale for saturation math always uses
//! the ITU-R BT.601 luma weights.

use crate::buffer::clamp_channel;
use crate::types::{EnhanceConfig, FilterError, RgbaImage};

/// BT.601 luma weight for red.
pub const LUMA_R: f64 = 0.299;
/// BT.601 luma weight for green.
pub const LUMA_G: f64 = 0.587;
/// BT.601 luma weight for blue.
pub const LUMA_B: f64 = 0.114;

/// Fewest posterization levels accepted.
pub const MIN_LEVELS: u8 = 2;
/// Most posterization levels accepted.
pub const MAX_LEVELS: u8 = 16;

/// Saturation factor applied by the cartoon pipeline.
pub const CARTOON_SATURATION: f64 = 1.3;

/// Check a posterization level count.
///
/// # Errors
///
/// Returns [`FilterError::InvalidParameter`] if `levels` is outside
/// `2..=16`. A single level would divide by zero.
pub fn validate_levels(levels: u8) -> Result<(), FilterError> {
    if (MIN_LEVELS..=MAX_LEVELS).contains(&levels) {
        Ok(())
    } else {
        Err(FilterError::InvalidParameter(format!(
            "color_levels must be in {MIN_LEVELS}..={MAX_LEVELS}, got {levels}"
        )))
    }
}

/// BT.601 luma of an RGB triple, unrounded.
#[must_use]
#[allow(clippy::suboptimal_flops)]
pub fn luma(r: f64, g: f64, b: f64) -> f64 {
    LUMA_R * r + LUMA_G * g + LUMA_B * b
}

/// Posterize each RGB channel to `levels` evenly spaced values.
///
/// With `step = 255 / (levels - 1)`, each channel becomes
/// `round(v / step) * step`. Alpha is untouched. Quantizing an already
/// quantized image with the same `levels` changes nothing.
///
/// # Errors
///
/// Returns [`FilterError::InvalidParameter`] if `levels` is outside
/// `2..=16`.
pub fn quantize(image: &RgbaImage, levels: u8) -> Result<RgbaImage, FilterError> {
    validate_levels(levels)?;
    let step = 255.0 / f64::from(levels - 1);
    let inv_step = 1.0 / step;

    let mut output = image.clone();
    for pixel in output.pixels_mut() {
        for channel in &mut pixel.0[..3] {
            *channel = clamp_channel((f64::from(*channel) * inv_step).round() * step);
        }
    }
    Ok(output)
}

/// Scale each pixel's distance from its luma by `factor`.
///
/// `factor > 1` boosts saturation, `0..1` mutes it, `0` yields grayscale
/// and negative values invert hue around the gray axis. Results are
/// clamped; alpha is untouched.
#[must_use = "returns the adjusted image"]
pub fn saturate(image: &RgbaImage, factor: f64) -> RgbaImage {
    let mut output = image.clone();
    for pixel in output.pixels_mut() {
        let [r, g, b, _] = pixel.0.map(f64::from);
        let [r, g, b] = blend_from_gray([r, g, b], factor);
        pixel.0[0] = clamp_channel(r);
        pixel.0[1] = clamp_channel(g);
        pixel.0[2] = clamp_channel(b);
    }
    output
}

/// `gray + factor * (channel - gray)` for each channel, unclamped.
#[allow(clippy::suboptimal_flops)]
fn blend_from_gray(rgb: [f64; 3], factor: f64) -> [f64; 3] {
    let gray = luma(rgb[0], rgb[1], rgb[2]);
    rgb.map(|v| gray + factor * (v - gray))
}

/// Contrast multiplier `259(c + 255) / (255(259 - c))`.
///
/// Only meaningful for `c < 259`; [`EnhanceConfig::validate`] restricts
/// `c` to `[-100, 100]`.
#[must_use]
pub fn contrast_factor(contrast: f64) -> f64 {
    (259.0 * (contrast + 255.0)) / (255.0 * (259.0 - contrast))
}

/// Apply brightness, contrast and saturation to every pixel.
///
/// Per channel, in this exact order and without intermediate clamping:
///
/// 1. `v += brightness`
/// 2. `v = contrast_factor * (v - 128) + 128`
/// 3. if `saturation != 0`: luma blend with factor `1 + saturation / 100`
///
/// The result is clamped once at the end. Alpha is untouched. This is
/// the point-wise half of [`enhance`]; parameters are not validated.
#[must_use = "returns the adjusted image"]
#[allow(clippy::suboptimal_flops)]
pub fn adjust(image: &RgbaImage, config: &EnhanceConfig) -> RgbaImage {
    let contrast = contrast_factor(config.contrast);
    let saturation = 1.0 + config.saturation / 100.0;

    let mut output = image.clone();
    for pixel in output.pixels_mut() {
        let [r, g, b, _] = pixel.0.map(f64::from);
        let mut rgb = [r, g, b].map(|v| contrast * (v + config.brightness - 128.0) + 128.0);
        if config.saturation != 0.0 {
            rgb = blend_from_gray(rgb, saturation);
        }
        for (channel, value) in pixel.0.iter_mut().zip(rgb) {
            *channel = clamp_channel(value);
        }
    }
    output
}

/// Enhance an image: [`adjust`] followed, when `sharpness > 0`, by
/// [`crate::sharpen::sharpen`] over the adjusted result.
///
/// # Errors
///
/// Returns [`FilterError::InvalidParameter`] if the config fails
/// [`EnhanceConfig::validate`].
pub fn enhance(image: &RgbaImage, config: &EnhanceConfig) -> Result<RgbaImage, FilterError> {
    config.validate()?;
    let adjusted = adjust(image, config);
    if config.sharpness > 0.0 {
        Ok(crate::sharpen::sharpen(&adjusted, config.sharpness))
    } else {
        Ok(adjusted)
    }
}
