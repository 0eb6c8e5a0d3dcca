//! Cartoonization: smooth, posterize, boost saturation, then ink edges.

use image::GrayImage;
use tracing::debug;

use crate::bilateral::{
    CARTOON_DIAMETER, CARTOON_SIGMA_COLOR, CARTOON_SIGMA_SPACE, bilateral_filter,
};
use crate::buffer::clamp_channel;
use crate::color::{CARTOON_SATURATION, quantize, saturate};
use crate::edge::{count_above, sobel_edges};
use crate::types::{CartoonConfig, FilterError, RgbaImage};

/// Edge magnitudes at or below this value are ignored when darkening.
pub const EDGE_THRESHOLD: u8 = 30;

/// Turn a photo into a flat-shaded cartoon.
///
/// Runs, in order: a bilateral filter (diameter 9, both sigmas 50),
/// posterization to `color_levels`, a 1.3x saturation boost, and, when
/// `edge_strength > 0`, [`darken_edges`] using a Sobel map of the
/// untouched input. Taking edges from the input keeps line placement
/// crisp even when posterization has flattened fine detail.
///
/// # Errors
///
/// Returns [`FilterError::InvalidParameter`] if the config fails
/// [`CartoonConfig::validate`].
pub fn cartoonize(image: &RgbaImage, config: &CartoonConfig) -> Result<RgbaImage, FilterError> {
    config.validate()?;

    let smoothed = bilateral_filter(
        image,
        CARTOON_DIAMETER,
        CARTOON_SIGMA_COLOR,
        CARTOON_SIGMA_SPACE,
    );
    let posterized = quantize(&smoothed, config.color_levels)?;
    let vivid = saturate(&posterized, CARTOON_SATURATION);

    if config.edge_strength == 0 {
        return Ok(vivid);
    }
    let edges = sobel_edges(image);
    debug!(
        edge_pixels = count_above(&edges, EDGE_THRESHOLD),
        strength = config.edge_strength,
        "inking edges"
    );
    Ok(darken_edges(&vivid, &edges, config.edge_strength))
}

/// Darken pixels that sit on strong edges.
///
/// For each pixel whose edge magnitude exceeds [`EDGE_THRESHOLD`], every
/// RGB channel is reduced by `magnitude * strength / 100 * 0.5`, clamped
/// at 0. Alpha is untouched. `edges` must have the same dimensions as
/// `image`; pixels without a corresponding edge value are left alone.
#[must_use = "returns the darkened image"]
pub fn darken_edges(image: &RgbaImage, edges: &GrayImage, strength: u8) -> RgbaImage {
    let factor = f64::from(strength) / 100.0;
    let mut output = image.clone();
    for (pixel, edge) in output.pixels_mut().zip(edges.pixels()) {
        let magnitude = edge.0[0];
        if magnitude <= EDGE_THRESHOLD {
            continue;
        }
        let amount = f64::from(magnitude) * factor * 0.5;
        for channel in &mut pixel.0[..3] {
            *channel = clamp_channel(f64::from(*channel) - amount);
        }
    }
    output
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Fine stripes two pixels wide between two light grays that both
    /// posterize to white at two levels, plus a strong black/white
    /// boundary.
    fn detailed_image() -> RgbaImage {
        RgbaImage::from_fn(40, 40, |x, y| {
            if y >= 30 {
                return if x < 20 {
                    image::Rgba([0, 0, 0, 255])
                } else {
                    image::Rgba([255, 255, 255, 255])
                };
            }
            if (x / 2) % 2 == 0 {
                image::Rgba([200, 200, 200, 255])
            } else {
                image::Rgba([220, 220, 220, 255])
            }
        })
    }

    #[test]
    fn preserves_dimensions_and_alpha() {
        let img = RgbaImage::from_fn(30, 20, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            image::Rgba([(x * 8) as u8, (y * 12) as u8, 90, 200])
        });
        let out = cartoonize(&img, &CartoonConfig::default()).unwrap();
        assert_eq!(out.dimensions(), (30, 20));
        assert!(out.pixels().all(|p| p.0[3] == 200));
    }

    #[test]
    fn zero_edge_strength_skips_inking() {
        let img = detailed_image();
        let config = CartoonConfig {
            color_levels: 4,
            edge_strength: 0,
        };
        let out = cartoonize(&img, &config).unwrap();
        let smoothed = bilateral_filter(&img, 9, 50.0, 50.0);
        let expected = saturate(&quantize(&smoothed, 4).unwrap(), 1.3);
        assert_eq!(out, expected);
    }

    #[test]
    fn edges_come_from_untouched_input() {
        let img = detailed_image();
        let config = CartoonConfig {
            color_levels: 2,
            edge_strength: 100,
        };

        let smoothed = bilateral_filter(&img, 9, 50.0, 50.0);
        let vivid = saturate(&quantize(&smoothed, 2).unwrap(), 1.3);
        let original_edges = sobel_edges(&img);
        let flattened_edges = sobel_edges(&vivid);
        assert_ne!(
            count_above(&original_edges, EDGE_THRESHOLD),
            count_above(&flattened_edges, EDGE_THRESHOLD)
        );

        let out = cartoonize(&img, &config).unwrap();
        assert_eq!(out, darken_edges(&vivid, &original_edges, 100));
        assert_ne!(out, darken_edges(&vivid, &flattened_edges, 100));
    }

    #[test]
    fn uniform_image_has_no_ink() {
        let img = RgbaImage::from_pixel(20, 20, image::Rgba([128, 128, 128, 255]));
        let with_edges = cartoonize(&img, &CartoonConfig::default()).unwrap();
        let without = cartoonize(
            &img,
            &CartoonConfig {
                edge_strength: 0,
                ..CartoonConfig::default()
            },
        )
        .unwrap();
        assert_eq!(with_edges, without);
    }

    #[test]
    fn darken_edges_applies_threshold_and_amount() {
        let img = RgbaImage::from_pixel(3, 1, image::Rgba([200, 100, 10, 255]));
        let mut edges = GrayImage::new(3, 1);
        edges.put_pixel(0, 0, image::Luma([30]));
        edges.put_pixel(1, 0, image::Luma([100]));
        edges.put_pixel(2, 0, image::Luma([255]));
        let out = darken_edges(&img, &edges, 50);
        assert_eq!(out.get_pixel(0, 0).0, [200, 100, 10, 255]);
        // 100 * 0.5 * 0.5 = 25.
        assert_eq!(out.get_pixel(1, 0).0, [175, 75, 0, 255]);
        // 255 * 0.25 = 63.75.
        assert_eq!(out.get_pixel(2, 0).0, [136, 36, 0, 255]);
    }

    #[test]
    fn rejects_invalid_config() {
        let img = RgbaImage::new(4, 4);
        let config = CartoonConfig {
            color_levels: 20,
            edge_strength: 50,
        };
        assert!(matches!(
            cartoonize(&img, &config),
            Err(FilterError::InvalidParameter(_))
        ));
    }

    #[test]
    fn tiny_images_do_not_panic() {
        for (w, h) in [(0, 0), (1, 1), (2, 3)] {
            let img = RgbaImage::from_pixel(w, h, image::Rgba([10, 200, 30, 255]));
            let out = cartoonize(&img, &CartoonConfig::default()).unwrap();
            assert_eq!(out.dimensions(), (w, h));
        }
    }
}
