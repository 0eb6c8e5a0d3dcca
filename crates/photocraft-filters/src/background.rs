//! Chroma-key background removal and automatic background detection.

use std::collections::HashMap;

use tracing::debug;

use crate::types::{ChromaKeyConfig, Color, FilterError, RgbaImage, validate_tolerance};

/// Largest squared RGB distance, `255² * 3`.
pub const MAX_DISTANCE_SQUARED: f64 = 195_075.0;

/// Spacing in pixels between border samples.
pub const SAMPLE_STRIDE: usize = 10;

/// Width of a color bucket per channel.
const BUCKET_SIZE: u8 = 10;

/// Replace every pixel close to the key color.
///
/// A pixel matches when its squared RGB distance to `key_color` is at
/// most `tolerance² * 195075`. Matching pixels take the replacement
/// color; their alpha becomes 0 when the replacement is pure white and
/// 255 otherwise. Unmatched pixels are copied unchanged.
///
/// # Errors
///
/// Returns [`FilterError::InvalidParameter`] if the tolerance is outside
/// `[0, 1]`.
pub fn remove_background(
    image: &RgbaImage,
    config: &ChromaKeyConfig,
) -> Result<RgbaImage, FilterError> {
    config.validate()?;

    let threshold = config.tolerance * config.tolerance * MAX_DISTANCE_SQUARED;
    let replacement = config.replacement_color;
    let alpha = if replacement.is_white() { 0 } else { 255 };

    let mut output = image.clone();
    let mut matched = 0_u64;
    for pixel in output.pixels_mut() {
        let [r, g, b, _] = pixel.0;
        let distance = Color::new(r, g, b).distance_squared(config.key_color);
        if f64::from(distance) <= threshold {
            pixel.0 = [replacement.r, replacement.g, replacement.b, alpha];
            matched += 1;
        }
    }
    debug!(
        key = %config.key_color.to_hex(),
        tolerance = config.tolerance,
        matched,
        "chroma key"
    );
    Ok(output)
}

/// Estimate the background color from the image border.
///
/// Samples every tenth pixel along the top and bottom rows (top then
/// bottom for each column), then every tenth pixel down the left and
/// right columns. Each sample is bucketed by dividing every channel by
/// 10; the most frequent bucket wins, with ties going to the bucket seen
/// first. The bucket is scaled back by 10, so the result is always a
/// multiple of 10 per channel. An empty image yields white.
#[must_use]
pub fn detect_background(image: &RgbaImage) -> Color {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Color::WHITE;
    }

    let mut histogram = BucketHistogram::default();
    let mut sample = |x: u32, y: u32| {
        let [r, g, b, _] = image.get_pixel(x, y).0;
        histogram.add([r, g, b].map(|v| v / BUCKET_SIZE));
    };
    for x in (0..width).step_by(SAMPLE_STRIDE) {
        sample(x, 0);
        sample(x, height - 1);
    }
    for y in (0..height).step_by(SAMPLE_STRIDE) {
        sample(0, y);
        sample(width - 1, y);
    }

    histogram.mode().map_or(Color::WHITE, |[r, g, b]| {
        Color::new(r * BUCKET_SIZE, g * BUCKET_SIZE, b * BUCKET_SIZE)
    })
}

/// Detect the background color and key it out to transparent white.
///
/// # Errors
///
/// Returns [`FilterError::InvalidParameter`] if the tolerance is outside
/// `[0, 1]`.
pub fn smart_remove_background(
    image: &RgbaImage,
    tolerance: f64,
) -> Result<RgbaImage, FilterError> {
    validate_tolerance(tolerance)?;
    let key_color = detect_background(image);
    debug!(background = %key_color.to_hex(), "detected background");
    remove_background(
        image,
        &ChromaKeyConfig {
            key_color,
            tolerance,
            replacement_color: Color::WHITE,
        },
    )
}

/// Bucket counts kept in first-seen order.
#[derive(Default)]
struct BucketHistogram {
    counts: Vec<([u8; 3], u32)>,
    index: HashMap<[u8; 3], usize>,
}

impl BucketHistogram {
    fn add(&mut self, bucket: [u8; 3]) {
        if let Some(&slot) = self.index.get(&bucket) {
            self.counts[slot].1 += 1;
        } else {
            self.index.insert(bucket, self.counts.len());
            self.counts.push((bucket, 1));
        }
    }

    /// The most frequent bucket; the earliest one on ties.
    fn mode(&self) -> Option<[u8; 3]> {
        let mut best: Option<([u8; 3], u32)> = None;
        for &(bucket, count) in &self.counts {
            if best.is_none_or(|(_, max)| count > max) {
                best = Some((bucket, count));
            }
        }
        best.map(|(bucket, _)| bucket)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const GREEN: image::Rgba<u8> = image::Rgba([0, 255, 0, 255]);
    const RED: image::Rgba<u8> = image::Rgba([255, 0, 0, 255]);

    /// 50x50 green image with a red 30x30 square in the middle.
    fn subject_on_green() -> RgbaImage {
        RgbaImage::from_fn(50, 50, |x, y| {
            if (10..40).contains(&x) && (10..40).contains(&y) {
                RED
            } else {
                GREEN
            }
        })
    }

    #[test]
    fn remove_background_keys_exact_match() {
        let img = subject_on_green();
        let out = remove_background(&img, &ChromaKeyConfig::default()).unwrap();
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255, 0]);
        assert_eq!(out.get_pixel(25, 25).0, RED.0);
    }

    #[test]
    fn zero_tolerance_matches_only_exact_color() {
        let img = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                GREEN
            } else {
                image::Rgba([0, 254, 0, 255])
            }
        });
        let config = ChromaKeyConfig {
            tolerance: 0.0,
            ..ChromaKeyConfig::default()
        };
        let out = remove_background(&img, &config).unwrap();
        assert_eq!(out.get_pixel(0, 0).0[3], 0);
        assert_eq!(out.get_pixel(1, 0).0, [0, 254, 0, 255]);
    }

    #[test]
    fn full_tolerance_matches_everything() {
        let img = subject_on_green();
        let config = ChromaKeyConfig {
            tolerance: 1.0,
            ..ChromaKeyConfig::default()
        };
        let out = remove_background(&img, &config).unwrap();
        assert!(out.pixels().all(|p| p.0 == [255, 255, 255, 0]));
    }

    #[test]
    fn boundary_distance_is_inclusive() {
        // Threshold is 0.1² * 195075 = 1950.75: 44² fits, 45² does not.
        let near = image::Rgba([0, 255, 44, 255]);
        let far = image::Rgba([0, 255, 45, 255]);
        let img = RgbaImage::from_fn(2, 1, |x, _| if x == 0 { near } else { far });
        let config = ChromaKeyConfig {
            tolerance: 0.1,
            ..ChromaKeyConfig::default()
        };
        let out = remove_background(&img, &config).unwrap();
        assert_eq!(out.get_pixel(0, 0).0[3], 0);
        assert_eq!(out.get_pixel(1, 0).0, far.0);
    }

    #[test]
    fn colored_replacement_is_opaque() {
        let mut img = subject_on_green();
        img.put_pixel(0, 0, image::Rgba([0, 255, 0, 17]));
        let config = ChromaKeyConfig {
            replacement_color: Color::new(0, 0, 255),
            ..ChromaKeyConfig::default()
        };
        let out = remove_background(&img, &config).unwrap();
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 255, 255]);
    }

    #[test]
    fn remove_background_rejects_bad_tolerance() {
        let img = subject_on_green();
        let config = ChromaKeyConfig {
            tolerance: 1.5,
            ..ChromaKeyConfig::default()
        };
        assert!(matches!(
            remove_background(&img, &config),
            Err(FilterError::InvalidParameter(_))
        ));
    }

    #[test]
    fn detect_background_finds_green_border() {
        assert_eq!(detect_background(&subject_on_green()), Color::new(0, 250, 0));
    }

    #[test]
    fn detect_background_rounds_down_to_bucket() {
        let img = RgbaImage::from_pixel(20, 20, image::Rgba([37, 128, 255, 255]));
        assert_eq!(detect_background(&img), Color::new(30, 120, 250));
    }

    #[test]
    fn detect_background_ties_go_to_first_seen() {
        // 11x11 samples each corner twice, so a top/bottom split ties
        // 4 to 4 and the top row is sampled first.
        let split = |top: u8, bottom: u8| {
            RgbaImage::from_fn(11, 11, move |_, y| {
                let v = if y < 5 { top } else { bottom };
                image::Rgba([v, v, v, 255])
            })
        };
        assert_eq!(detect_background(&split(10, 200)), Color::new(10, 10, 10));
        assert_eq!(
            detect_background(&split(200, 10)),
            Color::new(200, 200, 200)
        );
    }

    #[test]
    fn detect_background_empty_image_is_white() {
        assert_eq!(detect_background(&RgbaImage::new(0, 0)), Color::WHITE);
        assert_eq!(detect_background(&RgbaImage::new(5, 0)), Color::WHITE);
    }

    #[test]
    fn detect_background_single_pixel() {
        let img = RgbaImage::from_pixel(1, 1, image::Rgba([99, 0, 0, 255]));
        assert_eq!(detect_background(&img), Color::new(90, 0, 0));
    }

    #[test]
    fn smart_removal_clears_border_keeps_subject() {
        let img = subject_on_green();
        let out = smart_remove_background(&img, 0.3).unwrap();
        for (x, y) in [(0, 0), (49, 49), (5, 25), (45, 3)] {
            assert_eq!(out.get_pixel(x, y).0[3], 0, "at ({x},{y})");
        }
        for (x, y) in [(10, 10), (25, 25), (39, 39)] {
            assert_eq!(out.get_pixel(x, y).0, RED.0, "at ({x},{y})");
        }
    }

    #[test]
    fn smart_removal_rejects_bad_tolerance() {
        let img = subject_on_green();
        assert!(smart_remove_background(&img, -0.5).is_err());
    }

    #[test]
    fn histogram_mode_is_none_when_empty() {
        assert_eq!(BucketHistogram::default().mode(), None);
    }
}
