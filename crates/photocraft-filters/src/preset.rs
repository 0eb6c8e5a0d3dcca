//! Built-in passport, visa and profile photo sizes.

use serde::Serialize;

use crate::types::{FilterError, OutputSize};

/// Version of [`PASSPORT_PRESETS`]. Bump when entries change so stored
/// preset indices can be checked against the catalog they came from.
pub const CATALOG_VERSION: u32 = 1;

/// A named output size for ID photos.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PassportPreset {
    /// Display name including the physical size.
    pub name: &'static str,
    /// Output width in pixels (300 DPI).
    pub width: u32,
    /// Output height in pixels (300 DPI).
    pub height: u32,
    /// Nominal width / height ratio, rounded to two places.
    pub ratio: f64,
    /// Short human-readable description.
    pub description: &'static str,
}

impl PassportPreset {
    /// Output size for [`crate::crop::crop_and_scale`].
    #[must_use]
    pub const fn size(&self) -> OutputSize {
        OutputSize {
            width: self.width,
            height: self.height,
        }
    }
}

const fn preset(
    name: &'static str,
    width: u32,
    height: u32,
    ratio: f64,
    description: &'static str,
) -> PassportPreset {
    PassportPreset {
        name,
        width,
        height,
        ratio,
        description,
    }
}

/// All built-in presets. The last entry is the starting point for a
/// user-defined size.
pub const PASSPORT_PRESETS: [PassportPreset; 19] = [
    preset("US Passport (2×2 in)", 600, 600, 1.0, "51×51 mm, square format"),
    preset("UK Passport (35×45 mm)", 413, 531, 0.78, "Standard European format"),
    preset("Canada Passport (50×70 mm)", 590, 827, 0.71, "Larger Canadian format"),
    preset("Australia Passport (35×45 mm)", 413, 531, 0.78, "Same as UK standard"),
    preset("India Passport (51×51 mm)", 600, 600, 1.0, "Square Indian format"),
    preset("China Passport (33×48 mm)", 390, 567, 0.69, "Chinese official size"),
    preset("Japan Passport (35×45 mm)", 413, 531, 0.78, "Japanese standard"),
    preset("Germany Passport (35×45 mm)", 413, 531, 0.78, "German biometric format"),
    preset("France Passport (35×45 mm)", 413, 531, 0.78, "French official size"),
    preset("Brazil Passport (30×40 mm)", 354, 472, 0.75, "Brazilian format"),
    preset("Russia Passport (35×45 mm)", 413, 531, 0.78, "Russian Federation"),
    preset("South Korea (35×45 mm)", 413, 531, 0.78, "Korean standard"),
    preset("Mexico Passport (39×31 mm)", 460, 366, 1.26, "Mexican landscape format"),
    preset("UAE Passport (43×55 mm)", 508, 650, 0.78, "UAE official size"),
    preset("Singapore Passport (35×45 mm)", 413, 531, 0.78, "Singapore standard"),
    preset("US Visa (50×50 mm)", 590, 590, 1.0, "Square US visa format"),
    preset("Schengen Visa (35×45 mm)", 413, 531, 0.78, "European visa standard"),
    preset("LinkedIn Profile (1:1)", 400, 400, 1.0, "Social media square"),
    preset("Custom Size", 500, 500, 1.0, "Define your own dimensions"),
];

/// Look up a preset by index.
///
/// # Errors
///
/// Returns [`FilterError::InvalidParameter`] if `index` is past the end
/// of [`PASSPORT_PRESETS`].
pub fn passport_preset(index: usize) -> Result<&'static PassportPreset, FilterError> {
    PASSPORT_PRESETS.get(index).ok_or_else(|| {
        FilterError::InvalidParameter(format!(
            "preset index {index} out of range (catalog v{CATALOG_VERSION} has {} presets)",
            PASSPORT_PRESETS.len()
        ))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn first_preset_is_us_passport() {
        let us = passport_preset(0).unwrap();
        assert_eq!(us.size(), OutputSize { width: 600, height: 600 });
        assert!(us.name.starts_with("US Passport"));
    }

    #[test]
    fn last_preset_is_custom() {
        let custom = passport_preset(PASSPORT_PRESETS.len() - 1).unwrap();
        assert_eq!(custom.name, "Custom Size");
    }

    #[test]
    fn out_of_range_index_is_error() {
        assert!(matches!(
            passport_preset(PASSPORT_PRESETS.len()),
            Err(FilterError::InvalidParameter(_))
        ));
    }

    #[test]
    fn ratios_match_dimensions() {
        for preset in &PASSPORT_PRESETS {
            let actual = f64::from(preset.width) / f64::from(preset.height);
            assert!(
                (actual - preset.ratio).abs() < 0.01,
                "{}: {actual} vs {}",
                preset.name,
                preset.ratio
            );
        }
    }

    #[test]
    fn all_sizes_are_non_zero() {
        assert!(PASSPORT_PRESETS.iter().all(|p| p.width > 0 && p.height > 0));
    }
}
