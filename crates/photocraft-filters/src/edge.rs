//! Sobel edge magnitude.
//!
//! Produces a single-channel map the size of the input where each
//! interior pixel holds the Sobel gradient magnitude of the RGB-mean
//! intensity, saturated at 255. The one-pixel border is left at 0.

use image::GrayImage;

use crate::types::RgbaImage;

/// Horizontal Sobel kernel, row-major.
const SOBEL_X: [i32; 9] = [-1, 0, 1, -2, 0, 2, -1, 0, 1];

/// Vertical Sobel kernel (transpose of [`SOBEL_X`]), row-major.
const SOBEL_Y: [i32; 9] = [-1, -2, -1, 0, 0, 0, 1, 2, 1];

/// Compute the Sobel edge magnitude map of an image.
///
/// Intensity is the plain mean of R, G and B (not luma). The magnitude
/// `sqrt(gx² + gy²)` is capped at 255 and truncated to an integer.
/// Images narrower or shorter than 3 pixels produce an all-zero map.
#[must_use = "returns the edge magnitude map"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn sobel_edges(image: &RgbaImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut edges = GrayImage::new(width, height);
    if width < 3 || height < 3 {
        return edges;
    }

    let intensity = |x: u32, y: u32| {
        let p = image.get_pixel(x, y).0;
        (f64::from(p[0]) + f64::from(p[1]) + f64::from(p[2])) / 3.0
    };

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut gx = 0.0;
            let mut gy = 0.0;
            for (k, (kx, ky)) in SOBEL_X.iter().zip(SOBEL_Y.iter()).enumerate() {
                let k = k as u32;
                let gray = intensity(x + k % 3 - 1, y + k / 3 - 1);
                gx += gray * f64::from(*kx);
                gy += gray * f64::from(*ky);
            }
            let magnitude = gx.hypot(gy).min(255.0);
            edges.put_pixel(x, y, image::Luma([magnitude as u8]));
        }
    }

    edges
}

/// Count pixels in an edge map whose magnitude exceeds `threshold`.
#[must_use]
pub fn count_above(edges: &GrayImage, threshold: u8) -> u64 {
    edges
        .pixels()
        .map(|p| u64::from(u8::from(p.0[0] > threshold)))
        .sum()
}
