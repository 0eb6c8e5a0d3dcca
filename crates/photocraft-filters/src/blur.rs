//! 3x3 Gaussian denoise.
//!
//! A fixed binomial kernel
//!
//! ```text
//! 1 2 1
//! 2 4 2   / 16
//! 1 2 1
//! ```
//!
//! applied to the R, G and B channels of interior pixels. The one-pixel
//! border and the alpha channel are copied unchanged.

use crate::buffer::{clamp_channel, has_interior};
use crate::types::RgbaImage;

/// Row-major 3x3 binomial kernel; the weights sum to 16.
const KERNEL: [u32; 9] = [1, 2, 1, 2, 4, 2, 1, 2, 1];

/// Smooth an image with the 3x3 Gaussian kernel.
///
/// Images narrower or shorter than 3 pixels are returned unchanged.
#[must_use = "returns the denoised image"]
pub fn denoise(image: &RgbaImage) -> RgbaImage {
    let mut output = image.clone();
    if !has_interior(image, 1) {
        return output;
    }

    let width = image.width() as usize;
    let height = image.height() as usize;
    let src = image.as_raw();
    let dst: &mut [u8] = &mut output;

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let center = (y * width + x) * 4;
            for c in 0..3 {
                let mut sum = 0;
                for (k, weight) in KERNEL.iter().enumerate() {
                    let nx = x + k % 3 - 1;
                    let ny = y + k / 3 - 1;
                    sum += weight * u32::from(src[(ny * width + nx) * 4 + c]);
                }
                dst[center + c] = clamp_channel(f64::from(sum) / 16.0);
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_spike(value: u8) -> RgbaImage {
        RgbaImage::from_fn(5, 5, |x, y| {
            if x == 2 && y == 2 {
                image::Rgba([value, value, value, 255])
            } else {
                image::Rgba([0, 0, 0, 255])
            }
        })
    }

    #[test]
    fn spike_is_spread_by_kernel_weights() {
        let out = denoise(&single_spike(160));
        // 160 * 4/16, 160 * 2/16, 160 * 1/16.
        assert_eq!(out.get_pixel(2, 2).0[0], 40);
        assert_eq!(out.get_pixel(1, 2).0[0], 20);
        assert_eq!(out.get_pixel(1, 1).0[0], 10);
    }

    #[test]
    fn half_values_round_to_even() {
        // 8 * 1/16 = 0.5 -> 0, 24 * 1/16 = 1.5 -> 2.
        assert_eq!(denoise(&single_spike(8)).get_pixel(1, 1).0[0], 0);
        assert_eq!(denoise(&single_spike(24)).get_pixel(1, 1).0[0], 2);
    }

    #[test]
    fn border_and_alpha_pass_through() {
        #[allow(clippy::cast_possible_truncation)]
        let img = RgbaImage::from_fn(6, 6, |x, y| {
            image::Rgba([(x * 40) as u8, (y * 40) as u8, 7, (x + y) as u8])
        });
        let out = denoise(&img);
        for y in 0..6 {
            for x in 0..6 {
                assert_eq!(out.get_pixel(x, y).0[3], img.get_pixel(x, y).0[3]);
                if x == 0 || y == 0 || x == 5 || y == 5 {
                    assert_eq!(out.get_pixel(x, y), img.get_pixel(x, y));
                }
            }
        }
    }

    #[test]
    fn uniform_image_unchanged() {
        let img = RgbaImage::from_pixel(8, 8, image::Rgba([12, 200, 99, 255]));
        assert_eq!(denoise(&img), img);
    }

    #[test]
    fn degenerate_sizes_pass_through() {
        for (w, h) in [(0, 0), (1, 7), (2, 2), (7, 2)] {
            let img = RgbaImage::from_pixel(w, h, image::Rgba([1, 2, 3, 4]));
            assert_eq!(denoise(&img), img);
        }
    }

    #[test]
    fn dimensions_preserved() {
        let img = RgbaImage::new(17, 31);
        assert_eq!(denoise(&img).dimensions(), (17, 31));
    }
}
