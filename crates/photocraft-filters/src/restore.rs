//! Old-photo restoration.

use crate::blur::denoise;
use crate::sharpen::{RESTORE_STRENGTH, sharpen};
use crate::types::RgbaImage;

/// Denoise with the 3x3 Gaussian kernel, then sharpen at strength 25.
#[must_use = "returns the restored image"]
pub fn restore(image: &RgbaImage) -> RgbaImage {
    sharpen(&denoise(image), RESTORE_STRENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equals_denoise_then_sharpen() {
        #[allow(clippy::cast_possible_truncation)]
        let img = RgbaImage::from_fn(12, 9, |x, y| {
            let v = ((x * 53 + y * 29) % 256) as u8;
            image::Rgba([v, 255 - v, v / 3, 255])
        });
        assert_eq!(restore(&img), sharpen(&denoise(&img), 25.0));
    }

    #[test]
    fn uniform_image_unchanged() {
        let img = RgbaImage::from_pixel(10, 10, image::Rgba([70, 80, 90, 255]));
        assert_eq!(restore(&img), img);
    }

    #[test]
    fn isolated_speck_is_attenuated() {
        let img = RgbaImage::from_fn(7, 7, |x, y| {
            if x == 3 && y == 3 {
                image::Rgba([255, 255, 255, 255])
            } else {
                image::Rgba([0, 0, 0, 255])
            }
        });
        let out = restore(&img);
        assert!(out.get_pixel(3, 3).0[0] < 128);
    }

    #[test]
    fn tiny_images_pass_through() {
        let img = RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 4]));
        assert_eq!(restore(&img), img);
    }
}
