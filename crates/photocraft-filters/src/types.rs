//! Shared types for the photocraft filter engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference edge maps
/// without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can reference pixel
/// buffers without depending on `image` directly.
///
/// Every filter in this crate reads an `&RgbaImage` and returns a new
/// one; the input is never modified.
pub use image::RgbaImage;

/// An opaque 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Pure black, also the fallback for unparseable hex strings.
    pub const BLACK: Self = Self::new(0, 0, 0);

    /// Pure white. As a chroma-key replacement it means "transparent".
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Create a new color.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Whether this is exactly `#ffffff`.
    #[must_use]
    pub const fn is_white(self) -> bool {
        self.r == 255 && self.g == 255 && self.b == 255
    }

    /// Squared Euclidean distance in RGB space.
    ///
    /// Ranges from 0 to `255² * 3` (195 075).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> u32 {
        let dr = i32::from(self.r) - i32::from(other.r);
        let dg = i32::from(self.g) - i32::from(other.g);
        let db = i32::from(self.b) - i32::from(other.b);
        dr.unsigned_abs().pow(2) + dg.unsigned_abs().pow(2) + db.unsigned_abs().pow(2)
    }

    /// Render as a lowercase `#rrggbb` string.
    #[must_use]
    pub fn to_hex(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an existing image.
    #[must_use]
    pub fn of(image: &RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Total number of pixels.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Requested output size of a crop.
pub type OutputSize = Dimensions;

/// A sub-rectangle of an image expressed as fractions of its width and
/// height.
///
/// Well-formed rectangles satisfy `x + width <= 1` and
/// `y + height <= 1`. Anything else is clamped into the unit square by
/// [`CropRect::clamped`] before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    /// Left edge as a fraction of the source width.
    pub x: f64,
    /// Top edge as a fraction of the source height.
    pub y: f64,
    /// Width as a fraction of the source width.
    pub width: f64,
    /// Height as a fraction of the source height.
    pub height: f64,
}

impl Default for CropRect {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl CropRect {
    /// The central 80% of the image.
    pub const DEFAULT: Self = Self {
        x: 0.1,
        y: 0.1,
        width: 0.8,
        height: 0.8,
    };

    /// Whether every component is a finite number.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }

    /// Clamp the rectangle into `[0, 1]²`.
    ///
    /// The origin is clamped first, then the extent is limited to what
    /// remains of the unit interval, so the result may be empty.
    #[must_use]
    pub fn clamped(&self) -> Self {
        let x = self.x.clamp(0.0, 1.0);
        let y = self.y.clamp(0.0, 1.0);
        Self {
            x,
            y,
            width: self.width.clamp(0.0, 1.0 - x),
            height: self.height.clamp(0.0, 1.0 - y),
        }
    }
}

/// Parameters for [`crate::cartoon::cartoonize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartoonConfig {
    /// Number of levels per channel after posterization, `2..=16`.
    pub color_levels: u8,
    /// Edge line strength in percent, `0..=100`. Zero disables edges.
    pub edge_strength: u8,
}

impl CartoonConfig {
    /// Default posterization levels.
    pub const DEFAULT_COLOR_LEVELS: u8 = 8;
    /// Default edge strength.
    pub const DEFAULT_EDGE_STRENGTH: u8 = 50;

    /// Check parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidParameter`] when `color_levels` is
    /// outside `2..=16` or `edge_strength` exceeds 100.
    pub fn validate(&self) -> Result<(), FilterError> {
        crate::color::validate_levels(self.color_levels)?;
        if self.edge_strength > 100 {
            return Err(FilterError::InvalidParameter(format!(
                "edge_strength must be in 0..=100, got {}",
                self.edge_strength
            )));
        }
        Ok(())
    }
}

impl Default for CartoonConfig {
    fn default() -> Self {
        Self {
            color_levels: Self::DEFAULT_COLOR_LEVELS,
            edge_strength: Self::DEFAULT_EDGE_STRENGTH,
        }
    }
}

/// Parameters for [`crate::background::remove_background`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromaKeyConfig {
    /// Color to key out.
    pub key_color: Color,
    /// Match radius as a fraction of the largest RGB distance, `0..=1`.
    pub tolerance: f64,
    /// Color written over matched pixels. White means "make transparent".
    pub replacement_color: Color,
}

impl ChromaKeyConfig {
    /// Default key color (`#00ff00`).
    pub const DEFAULT_KEY_COLOR: Color = Color::new(0, 255, 0);
    /// Default tolerance.
    pub const DEFAULT_TOLERANCE: f64 = 0.3;

    /// Check parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidParameter`] when `tolerance` is not
    /// a finite number in `[0, 1]`.
    pub fn validate(&self) -> Result<(), FilterError> {
        validate_tolerance(self.tolerance)
    }
}

impl Default for ChromaKeyConfig {
    fn default() -> Self {
        Self {
            key_color: Self::DEFAULT_KEY_COLOR,
            tolerance: Self::DEFAULT_TOLERANCE,
            replacement_color: Color::WHITE,
        }
    }
}

/// Check a chroma-key tolerance.
pub(crate) fn validate_tolerance(tolerance: f64) -> Result<(), FilterError> {
    if (0.0..=1.0).contains(&tolerance) {
        Ok(())
    } else {
        Err(FilterError::InvalidParameter(format!(
            "tolerance must be in [0, 1], got {tolerance}"
        )))
    }
}

/// Parameters for [`crate::color::enhance`].
///
/// Adjustments are applied in a fixed order: brightness, contrast,
/// saturation, then sharpness as a separate windowed pass.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    /// Added to every color channel. Unbounded; results are clamped.
    pub brightness: f64,
    /// Contrast in `[-100, 100]`.
    pub contrast: f64,
    /// Saturation change in percent. `-100` is grayscale.
    pub saturation: f64,
    /// Unsharp-mask strength in `[0, 100]`. Zero skips sharpening.
    pub sharpness: f64,
}

impl EnhanceConfig {
    /// Largest contrast magnitude accepted.
    ///
    /// The contrast factor `259(c + 255) / (255(259 - c))` has a pole at
    /// `c = 259`; this bound keeps the denominator well away from it.
    pub const MAX_CONTRAST: f64 = 100.0;
    /// Largest sharpness accepted.
    pub const MAX_SHARPNESS: f64 = 100.0;

    /// Check parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidParameter`] when any value is not
    /// finite, contrast is outside `[-100, 100]`, or sharpness is outside
    /// `[0, 100]`.
    pub fn validate(&self) -> Result<(), FilterError> {
        for (name, value) in [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("saturation", self.saturation),
            ("sharpness", self.sharpness),
        ] {
            if !value.is_finite() {
                return Err(FilterError::InvalidParameter(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }
        if self.contrast.abs() > Self::MAX_CONTRAST {
            return Err(FilterError::InvalidParameter(format!(
                "contrast must be in [-100, 100], got {}",
                self.contrast
            )));
        }
        if !(0.0..=Self::MAX_SHARPNESS).contains(&self.sharpness) {
            return Err(FilterError::InvalidParameter(format!(
                "sharpness must be in [0, 100], got {}",
                self.sharpness
            )));
        }
        Ok(())
    }
}

/// Errors reported by the filter engine.
///
/// Degenerate inputs (images smaller than a filter window) and
/// malformed hex colors are not errors: the former pass through
/// unchanged and the latter fall back to black.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum FilterError {
    /// A filter parameter is outside its accepted range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A raw buffer's length does not equal `width * height * 4`.
    #[error("buffer of {actual} bytes does not match {width}x{height} RGBA ({expected} bytes)")]
    DimensionMismatch {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
        /// Required byte length.
        expected: u64,
        /// Actual byte length.
        actual: u64,
    },

    /// A pixel coordinate lies outside the image.
    #[error("pixel ({x}, {y}) is outside the {width}x{height} image")]
    OutOfBounds {
        /// Requested column.
        x: u32,
        /// Requested row.
        y: u32,
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },

    /// Text could not be laid out or rasterized.
    #[error("text rendering failed: {0}")]
    Render(String),
}
