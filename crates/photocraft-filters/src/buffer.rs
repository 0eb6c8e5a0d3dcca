//! Pixel buffer construction, color sampling, and hex color parsing.
//!
//! Buffers cross the engine boundary as `(width, height, bytes)` triples
//! of interleaved RGBA. [`from_raw`] checks the length invariant and
//! wraps the bytes as an [`RgbaImage`]; every filter then works on that
//! type.

use crate::types::{Color, FilterError, RgbaImage};

/// Wrap raw interleaved RGBA bytes as an image.
///
/// # Errors
///
/// Returns [`FilterError::DimensionMismatch`] unless
/// `bytes.len() == width * height * 4` exactly. The `image` crate alone
/// accepts over-long buffers, so the check is done here.
pub fn from_raw(width: u32, height: u32, bytes: Vec<u8>) -> Result<RgbaImage, FilterError> {
    let expected = u64::from(width) * u64::from(height) * 4;
    let actual = bytes.len() as u64;
    let mismatch = FilterError::DimensionMismatch {
        width,
        height,
        expected,
        actual,
    };
    if actual != expected {
        return Err(mismatch);
    }
    RgbaImage::from_raw(width, height, bytes).ok_or(mismatch)
}

/// Read the RGB color of a single pixel.
///
/// Used for interactive color picking, so coordinates are never clamped.
///
/// # Errors
///
/// Returns [`FilterError::OutOfBounds`] if `(x, y)` lies outside
/// `[0, width) x [0, height)`.
pub fn color_at(image: &RgbaImage, x: u32, y: u32) -> Result<Color, FilterError> {
    let image::Rgba([r, g, b, _]) =
        *image
            .get_pixel_checked(x, y)
            .ok_or(FilterError::OutOfBounds {
                x,
                y,
                width: image.width(),
                height: image.height(),
            })?;
    Ok(Color::new(r, g, b))
}

/// Strictly parse a `#rrggbb` (or `rrggbb`) color, case-insensitive.
///
/// Returns `None` for anything else, including 3-digit shorthand.
#[must_use]
pub fn parse_hex(hex: &str) -> Option<Color> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some(Color::new(channel(0)?, channel(2)?, channel(4)?))
}

/// Parse a hex color, falling back to black when the string is malformed.
///
/// The fallback is the documented behavior, not an error signal; callers
/// that need strict validation should use [`parse_hex`].
#[must_use]
pub fn hex_to_rgb(hex: &str) -> Color {
    parse_hex(hex).unwrap_or(Color::BLACK)
}

/// Convert a computed channel value to a byte.
///
/// Clamps to `[0, 255]` and rounds half to even, the conversion applied
/// by a clamped byte array. NaN maps to 0.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn clamp_channel(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round_ties_even().clamp(0.0, 255.0) as u8
}

/// Whether the image has at least one pixel `margin` away from every
/// border, i.e. whether a `(2 * margin + 1)`-wide window fits anywhere.
pub(crate) fn has_interior(image: &RgbaImage, margin: u32) -> bool {
    let span = margin.saturating_mul(2);
    image.width() > span && image.height() > span
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_accepts_exact_length() {
        let img = from_raw(2, 3, vec![7; 24]).unwrap();
        assert_eq!(img.dimensions(), (2, 3));
        assert_eq!(img.get_pixel(1, 2).0, [7, 7, 7, 7]);
    }

    #[test]
    fn from_raw_rejects_short_buffer() {
        let result = from_raw(2, 2, vec![0; 15]);
        assert_eq!(
            result,
            Err(FilterError::DimensionMismatch {
                width: 2,
                height: 2,
                expected: 16,
                actual: 15,
            })
        );
    }

    #[test]
    fn from_raw_rejects_long_buffer() {
        let result = from_raw(2, 2, vec![0; 17]);
        assert!(matches!(
            result,
            Err(FilterError::DimensionMismatch { actual: 17, .. })
        ));
    }

    #[test]
    fn from_raw_accepts_empty_image() {
        let img = from_raw(0, 5, Vec::new()).unwrap();
        assert_eq!(img.width(), 0);
    }

    #[test]
    fn color_at_reads_pixel() {
        let img = RgbaImage::from_fn(3, 3, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            image::Rgba([x as u8, y as u8, 9, 255])
        });
        assert_eq!(color_at(&img, 2, 1).unwrap(), Color::new(2, 1, 9));
    }

    #[test]
    fn color_at_out_of_bounds_is_error() {
        let img = RgbaImage::new(3, 3);
        assert_eq!(
            color_at(&img, 3, 0),
            Err(FilterError::OutOfBounds {
                x: 3,
                y: 0,
                width: 3,
                height: 3,
            })
        );
        assert!(color_at(&img, 0, 3).is_err());
    }

    #[test]
    fn hex_to_rgb_parses_red() {
        assert_eq!(hex_to_rgb("#FF0000"), Color::new(255, 0, 0));
    }

    #[test]
    fn hex_to_rgb_without_hash_and_lowercase() {
        assert_eq!(hex_to_rgb("00ff7f"), Color::new(0, 255, 127));
    }

    #[test]
    fn hex_to_rgb_falls_back_to_black() {
        assert_eq!(hex_to_rgb("notacolor"), Color::BLACK);
        assert_eq!(hex_to_rgb("#fff"), Color::BLACK);
        assert_eq!(hex_to_rgb("#ff00001"), Color::BLACK);
        assert_eq!(hex_to_rgb("##ff0000"), Color::BLACK);
        assert_eq!(hex_to_rgb(""), Color::BLACK);
    }

    #[test]
    fn parse_hex_rejects_non_ascii() {
        // Six bytes, but not six hex digits.
        assert_eq!(parse_hex("ééé"), None);
    }

    #[test]
    fn hex_round_trips_through_to_hex() {
        let color = Color::new(18, 52, 86);
        assert_eq!(parse_hex(&color.to_hex()), Some(color));
    }

    #[test]
    fn clamp_channel_rounds_half_to_even() {
        assert_eq!(clamp_channel(2.5), 2);
        assert_eq!(clamp_channel(3.5), 4);
        assert_eq!(clamp_channel(-12.0), 0);
        assert_eq!(clamp_channel(300.7), 255);
        assert_eq!(clamp_channel(f64::NAN), 0);
    }

    #[test]
    fn has_interior_requires_window_fit() {
        assert!(has_interior(&RgbaImage::new(3, 3), 1));
        assert!(!has_interior(&RgbaImage::new(2, 9), 1));
        assert!(!has_interior(&RgbaImage::new(8, 8), 4));
        assert!(has_interior(&RgbaImage::new(9, 9), 4));
    }
}
