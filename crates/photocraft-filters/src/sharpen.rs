//! Unsharp-mask sharpening.
//!
//! The blurred reference for each interior pixel is the mean of its four
//! direct neighbors (up, down, left, right). The output pushes the pixel
//! away from that mean by `strength / 100` of the difference.

use crate::buffer::{clamp_channel, has_interior};
use crate::types::RgbaImage;

/// Sharpening strength applied by [`crate::restore::restore`].
pub const RESTORE_STRENGTH: f64 = 25.0;

/// Sharpen the RGB channels of an image.
///
/// `output = center + strength / 100 * (center - cross_mean)`, clamped.
/// Border pixels and alpha are copied unchanged; images narrower or
/// shorter than 3 pixels are returned unchanged.
#[must_use = "returns the sharpened image"]
#[allow(clippy::suboptimal_flops)]
pub fn sharpen(image: &RgbaImage, strength: f64) -> RgbaImage {
    let mut output = image.clone();
    if !has_interior(image, 1) {
        return output;
    }

    let factor = strength / 100.0;
    let width = image.width() as usize;
    let height = image.height() as usize;
    let src = image.as_raw();
    let dst: &mut [u8] = &mut output;
    let at = |x: usize, y: usize, c: usize| f64::from(src[(y * width + x) * 4 + c]);

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            for c in 0..3 {
                let center = at(x, y, c);
                let blur =
                    (at(x, y - 1, c) + at(x, y + 1, c) + at(x - 1, y, c) + at(x + 1, y, c)) / 4.0;
                dst[(y * width + x) * 4 + c] = clamp_channel(center + factor * (center - blur));
            }
        }
    }

    output
}
