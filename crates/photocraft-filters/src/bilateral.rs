//! Edge-preserving bilateral smoothing.
//!
//! Each interior pixel becomes a weighted mean of its
//! `diameter x diameter` neighborhood. The weight of a neighbor is the
//! product of a spatial Gaussian on its offset and a color term that
//! decays with the summed absolute RGB difference from the center, so
//! flat regions are smoothed while strong edges survive.
//!
//! All reads come from the untouched input; the output is a separate
//! buffer, so results never feed back into later windows of the same
//! pass.

use crate::buffer::{clamp_channel, has_interior};
use crate::types::RgbaImage;

/// Window diameter used by the cartoon pipeline.
pub const CARTOON_DIAMETER: u32 = 9;
/// Color sigma used by the cartoon pipeline.
pub const CARTOON_SIGMA_COLOR: f64 = 50.0;
/// Spatial sigma used by the cartoon pipeline.
pub const CARTOON_SIGMA_SPACE: f64 = 50.0;

/// Apply a bilateral filter to the RGB channels of an image.
///
/// The window radius is `diameter / 2`. Pixels closer than the radius
/// to any border are copied unchanged, as is the alpha channel
/// everywhere. Images too small to hold a single full window, a
/// diameter below 2, and non-positive sigmas all return an unchanged
/// copy.
///
/// Spatial weights `exp(-(dx² + dy²) / (2 sigma_space²))` are computed
/// once per call. The color weight is `exp(-d / sigma_color)` where `d`
/// is the sum of absolute R, G, B differences between the neighbor and
/// the center.
#[must_use = "returns the filtered image"]
#[allow(clippy::cast_possible_wrap, clippy::cast_precision_loss)]
pub fn bilateral_filter(
    image: &RgbaImage,
    diameter: u32,
    sigma_color: f64,
    sigma_space: f64,
) -> RgbaImage {
    let radius = diameter / 2;
    let mut output = image.clone();
    if radius == 0
        || sigma_color.is_nan()
        || sigma_color <= 0.0
        || sigma_space.is_nan()
        || sigma_space <= 0.0
        || !has_interior(image, radius)
    {
        return output;
    }

    let r = radius as i64;
    let spatial_weights: Vec<f64> = (-r..=r)
        .flat_map(|dy| (-r..=r).map(move |dx| (dx * dx + dy * dy) as f64))
        .map(|dist| (-dist / (2.0 * sigma_space * sigma_space)).exp())
        .collect();

    let width = image.width() as usize;
    let height = image.height() as usize;
    let radius = radius as usize;
    let src = image.as_raw();
    let dst: &mut [u8] = &mut output;

    for y in radius..height - radius {
        for x in radius..width - radius {
            let center = (y * width + x) * 4;
            let mut sums = [0.0_f64; 3];
            let mut weight_sum = 0.0;
            let mut weights = spatial_weights.iter();

            for ny in y - radius..=y + radius {
                for nx in x - radius..=x + radius {
                    let neighbor = (ny * width + nx) * 4;
                    let spatial = weights.next().copied().unwrap_or(0.0);
                    let color_dist: u32 = (0..3)
                        .map(|c| u32::from(src[center + c].abs_diff(src[neighbor + c])))
                        .sum();
                    let weight = spatial * (-f64::from(color_dist) / sigma_color).exp();
                    for (c, sum) in sums.iter_mut().enumerate() {
                        *sum += f64::from(src[neighbor + c]) * weight;
                    }
                    weight_sum += weight;
                }
            }

            if weight_sum > 0.0 {
                for (c, sum) in sums.iter().enumerate() {
                    dst[center + c] = clamp_channel(sum / weight_sum);
                }
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_image(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                image::Rgba([0, 0, 0, 200])
            } else {
                image::Rgba([255, 255, 255, 200])
            }
        })
    }

    #[allow(clippy::cast_possible_truncation)]
    fn noisy_image(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let v = ((x * 37 + y * 91) % 23) as u8;
            image::Rgba([100 + v, 120 + v, 140 - v, 255])
        })
    }

    #[test]
    fn uniform_image_unchanged() {
        let img = RgbaImage::from_pixel(15, 15, image::Rgba([40, 90, 160, 255]));
        let out = bilateral_filter(&img, 9, 50.0, 50.0);
        assert_eq!(img, out);
    }

    #[test]
    fn dimensions_preserved() {
        let img = noisy_image(17, 31);
        let out = bilateral_filter(&img, 9, 50.0, 50.0);
        assert_eq!(out.dimensions(), (17, 31));
    }

    #[test]
    fn border_pixels_pass_through() {
        let img = noisy_image(20, 20);
        let out = bilateral_filter(&img, 9, 50.0, 50.0);
        for y in 0..20 {
            for x in 0..20 {
                if x < 4 || y < 4 || x >= 16 || y >= 16 {
                    assert_eq!(img.get_pixel(x, y), out.get_pixel(x, y), "at ({x},{y})");
                }
            }
        }
    }

    #[test]
    fn interior_noise_is_smoothed() {
        let img = noisy_image(20, 20);
        let out = bilateral_filter(&img, 9, 50.0, 50.0);
        assert_ne!(img, out);
    }

    #[test]
    fn strong_edge_is_preserved() {
        let img = step_image(20, 20);
        let out = bilateral_filter(&img, 9, 50.0, 50.0);
        let left = out.get_pixel(9, 10).0[0];
        let right = out.get_pixel(10, 10).0[0];
        assert!(left < 5, "dark side bled to {left}");
        assert!(right > 250, "light side bled to {right}");
    }

    #[test]
    fn alpha_untouched() {
        let img = step_image(20, 20);
        let out = bilateral_filter(&img, 9, 50.0, 50.0);
        assert!(out.pixels().all(|p| p.0[3] == 200));
    }

    #[test]
    fn image_smaller_than_window_passes_through() {
        let img = noisy_image(8, 30);
        let out = bilateral_filter(&img, 9, 50.0, 50.0);
        assert_eq!(img, out);
    }

    #[test]
    fn tiny_images_do_not_panic() {
        for (w, h) in [(0, 0), (1, 1), (2, 5), (0, 12)] {
            let img = RgbaImage::new(w, h);
            assert_eq!(bilateral_filter(&img, 9, 50.0, 50.0), img);
        }
    }

    #[test]
    fn non_positive_sigma_returns_copy() {
        let img = noisy_image(12, 12);
        assert_eq!(bilateral_filter(&img, 5, 0.0, 50.0), img);
        assert_eq!(bilateral_filter(&img, 5, 50.0, -1.0), img);
        assert_eq!(bilateral_filter(&img, 5, f64::NAN, 50.0), img);
    }

    #[test]
    fn deterministic() {
        let img = noisy_image(16, 16);
        assert_eq!(
            bilateral_filter(&img, 9, 50.0, 50.0),
            bilateral_filter(&img, 9, 50.0, 50.0)
        );
    }
}
