//! Processing modes and their filter stages.
//!
//! A [`FilterConfig`] names one processing mode together with its
//! parameters. [`FilterConfig::stages`] expands it into the ordered list
//! of [`Stage`]s that implement the mode, and [`process`] folds the
//! stages over an image. Each stage sees the output of the previous one
//! plus the untouched input, which the cartoon edge pass needs.
//!
//! Running the stages one by one gives exactly the same pixels as calling
//! the corresponding composite filter directly.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::bilateral::{
    CARTOON_DIAMETER, CARTOON_SIGMA_COLOR, CARTOON_SIGMA_SPACE, bilateral_filter,
};
use crate::cartoon::darken_edges;
use crate::color::{CARTOON_SATURATION, adjust, quantize, saturate};
use crate::crop::{ResampleFilter, crop_and_scale};
use crate::preset::passport_preset;
use crate::sharpen::{RESTORE_STRENGTH, sharpen};
use crate::types::{
    CartoonConfig, ChromaKeyConfig, CropRect, Dimensions, EnhanceConfig, FilterError, OutputSize,
    RgbaImage, validate_tolerance,
};
use crate::{background, blur, edge};

/// Parameters for the passport crop mode.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PassportConfig {
    /// Index into [`crate::preset::PASSPORT_PRESETS`].
    pub preset: usize,
    /// Explicit output size; overrides the preset when set.
    pub size: Option<OutputSize>,
    /// Region of the source to keep, as fractions.
    pub crop: CropRect,
    /// Resampling filter for the scale step.
    pub filter: ResampleFilter,
}

impl PassportConfig {
    /// The output size: the explicit size if given, else the preset's.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidParameter`] if no explicit size is
    /// set and the preset index is out of range.
    pub fn output_size(&self) -> Result<OutputSize, FilterError> {
        match self.size {
            Some(size) => Ok(size),
            None => passport_preset(self.preset).map(|preset| preset.size()),
        }
    }

    /// Check parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidParameter`] for an unknown preset, a
    /// zero output dimension, or a non-finite crop rectangle.
    pub fn validate(&self) -> Result<(), FilterError> {
        let size = self.output_size()?;
        if size.width == 0 || size.height == 0 {
            return Err(FilterError::InvalidParameter(format!(
                "output size must be non-zero, got {}x{}",
                size.width, size.height
            )));
        }
        if !self.crop.is_finite() {
            return Err(FilterError::InvalidParameter(format!(
                "crop rectangle must be finite, got {:?}",
                self.crop
            )));
        }
        Ok(())
    }
}

const fn default_tolerance() -> f64 {
    ChromaKeyConfig::DEFAULT_TOLERANCE
}

/// One processing mode and its parameters.
///
/// Serialized with a `mode` tag, e.g.
/// `{"mode": "cartoonify", "color_levels": 6, "edge_strength": 40}`.
/// Omitted parameters take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FilterConfig {
    /// Cartoon effect.
    Cartoonify(CartoonConfig),
    /// Chroma-key removal of a chosen color.
    Background(ChromaKeyConfig),
    /// Chroma-key removal of the detected border color.
    SmartBackground {
        /// Match radius as a fraction of the largest RGB distance.
        #[serde(default = "default_tolerance")]
        tolerance: f64,
    },
    /// Crop and scale to an ID photo size.
    Passport(PassportConfig),
    /// Brightness, contrast, saturation and sharpness.
    Enhance(EnhanceConfig),
    /// Denoise and sharpen.
    Restore,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::Cartoonify(CartoonConfig::default())
    }
}

impl FilterConfig {
    /// Short mode name, as used in the `mode` tag and export file names.
    #[must_use]
    pub const fn mode_name(&self) -> &'static str {
        match self {
            Self::Cartoonify(_) => "cartoonify",
            Self::Background(_) => "background",
            Self::SmartBackground { .. } => "smart_background",
            Self::Passport(_) => "passport",
            Self::Enhance(_) => "enhance",
            Self::Restore => "restore",
        }
    }

    /// Check every parameter of the mode.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidParameter`] describing the first
    /// offending parameter.
    pub fn validate(&self) -> Result<(), FilterError> {
        match self {
            Self::Cartoonify(config) => config.validate(),
            Self::Background(config) => config.validate(),
            Self::SmartBackground { tolerance } => validate_tolerance(*tolerance),
            Self::Passport(config) => config.validate(),
            Self::Enhance(config) => config.validate(),
            Self::Restore => Ok(()),
        }
    }

    /// Expand the mode into its ordered stages.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidParameter`] if the config fails
    /// [`FilterConfig::validate`].
    pub fn stages(&self) -> Result<Vec<Stage>, FilterError> {
        self.validate()?;
        let stages = match self {
            Self::Cartoonify(config) => {
                let mut stages = vec![
                    Stage::Bilateral {
                        diameter: CARTOON_DIAMETER,
                        sigma_color: CARTOON_SIGMA_COLOR,
                        sigma_space: CARTOON_SIGMA_SPACE,
                    },
                    Stage::Quantize {
                        levels: config.color_levels,
                    },
                    Stage::Saturate {
                        factor: CARTOON_SATURATION,
                    },
                ];
                if config.edge_strength > 0 {
                    stages.push(Stage::DarkenEdges {
                        strength: config.edge_strength,
                    });
                }
                stages
            }
            Self::Background(config) => vec![Stage::ChromaKey(*config)],
            Self::SmartBackground { tolerance } => vec![Stage::SmartBackground {
                tolerance: *tolerance,
            }],
            Self::Passport(config) => vec![Stage::CropScale {
                rect: config.crop,
                size: config.output_size()?,
                filter: config.filter,
            }],
            Self::Enhance(config) => {
                let mut stages = vec![Stage::Adjust(*config)];
                if config.sharpness > 0.0 {
                    stages.push(Stage::Sharpen {
                        strength: config.sharpness,
                    });
                }
                stages
            }
            Self::Restore => vec![
                Stage::Denoise,
                Stage::Sharpen {
                    strength: RESTORE_STRENGTH,
                },
            ],
        };
        Ok(stages)
    }
}

impl fmt::Display for FilterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mode_name())
    }
}

/// A single filter step.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Edge-preserving smoothing.
    Bilateral {
        /// Window diameter.
        diameter: u32,
        /// Color sigma.
        sigma_color: f64,
        /// Spatial sigma.
        sigma_space: f64,
    },
    /// Posterization.
    Quantize {
        /// Levels per channel.
        levels: u8,
    },
    /// Luma-relative saturation scaling.
    Saturate {
        /// Saturation multiplier.
        factor: f64,
    },
    /// Darken along Sobel edges of the original image.
    DarkenEdges {
        /// Edge strength in percent.
        strength: u8,
    },
    /// Chroma-key replacement.
    ChromaKey(ChromaKeyConfig),
    /// Border-color detection followed by chroma-key.
    SmartBackground {
        /// Match radius.
        tolerance: f64,
    },
    /// 3x3 Gaussian denoise.
    Denoise,
    /// Unsharp mask.
    Sharpen {
        /// Strength in percent.
        strength: f64,
    },
    /// Brightness, contrast and saturation.
    Adjust(EnhanceConfig),
    /// Crop, scale and flatten onto white.
    CropScale {
        /// Source region.
        rect: CropRect,
        /// Output size.
        size: OutputSize,
        /// Resampling filter.
        filter: ResampleFilter,
    },
}

impl Stage {
    /// Human-readable stage name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Bilateral { .. } => "Bilateral",
            Self::Quantize { .. } => "Quantize",
            Self::Saturate { .. } => "Saturate",
            Self::DarkenEdges { .. } => "Darken Edges",
            Self::ChromaKey(_) => "Chroma Key",
            Self::SmartBackground { .. } => "Smart Background",
            Self::Denoise => "Denoise",
            Self::Sharpen { .. } => "Sharpen",
            Self::Adjust(_) => "Adjust",
            Self::CropScale { .. } => "Crop & Scale",
        }
    }

    /// Run this stage.
    ///
    /// `input` is the previous stage's output; `original` is the image
    /// the pipeline started from.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidParameter`] for out-of-range stage
    /// parameters.
    pub fn apply(&self, input: &RgbaImage, original: &RgbaImage) -> Result<RgbaImage, FilterError> {
        match self {
            Self::Bilateral {
                diameter,
                sigma_color,
                sigma_space,
            } => Ok(bilateral_filter(
                input,
                *diameter,
                *sigma_color,
                *sigma_space,
            )),
            Self::Quantize { levels } => quantize(input, *levels),
            Self::Saturate { factor } => Ok(saturate(input, *factor)),
            Self::DarkenEdges { strength } => {
                let edges = edge::sobel_edges(original);
                Ok(darken_edges(input, &edges, *strength))
            }
            Self::ChromaKey(config) => background::remove_background(input, config),
            Self::SmartBackground { tolerance } => {
                background::smart_remove_background(input, *tolerance)
            }
            Self::Denoise => Ok(blur::denoise(input)),
            Self::Sharpen { strength } => Ok(sharpen(input, *strength)),
            Self::Adjust(config) => Ok(adjust(input, config)),
            Self::CropScale { rect, size, filter } => crop_and_scale(input, rect, *size, *filter),
        }
    }
}

/// Run a processing mode over an image.
///
/// The input is never modified.
///
/// # Errors
///
/// Returns [`FilterError::InvalidParameter`] if the config is invalid.
/// Validation happens before any pixel is touched.
#[instrument(skip_all, fields(mode = %config, width = image.width(), height = image.height()))]
pub fn process(image: &RgbaImage, config: &FilterConfig) -> Result<RgbaImage, FilterError> {
    let stages = config.stages()?;
    let mut current = image.clone();
    for stage in &stages {
        debug!(stage = stage.name(), "applying");
        current = stage.apply(&current, image)?;
    }
    let out = Dimensions::of(&current);
    debug!(width = out.width, height = out.height, "done");
    Ok(current)
}
