//! photocraft-filters: Pure RGBA photo filter engine (sans-IO).
//!
//! Every filter reads an [`RgbaImage`] and returns a new one:
//!
//! - windowed filters: bilateral smoothing, Sobel edges, 3x3 Gaussian
//!   denoise, unsharp-mask sharpening
//! - point-wise filters: posterization, saturation, brightness/contrast
//! - composites: cartoonize, chroma-key and smart background removal,
//!   restoration, passport crop-and-scale
//!
//! Text captions are the one in-place operation and go through the
//! [`DrawSurface`] trait.
//!
//! This crate has **no I/O dependencies**. Decoding and encoding image
//! files lives in `photocraft-export`; timing uses a caller-supplied
//! [`Clock`].

pub mod background;
pub mod bilateral;
pub mod blur;
pub mod buffer;
pub mod cartoon;
pub mod color;
pub mod crop;
pub mod diagnostics;
pub mod edge;
pub mod pipeline;
pub mod preset;
pub mod restore;
pub mod sharpen;
pub mod text;
pub mod types;

pub use buffer::{color_at, from_raw, hex_to_rgb, parse_hex};
pub use crop::ResampleFilter;
pub use diagnostics::{Clock, FilterDiagnostics, StageDiagnostics, process_with_diagnostics};
pub use pipeline::{FilterConfig, PassportConfig, Stage, process};
pub use preset::{PASSPORT_PRESETS, PassportPreset, passport_preset};
pub use text::{DrawSurface, FontRegistry, RasterSurface, TextOverlay, add_text_overlay};
pub use types::{
    CartoonConfig, ChromaKeyConfig, Color, CropRect, Dimensions, EnhanceConfig, FilterError,
    GrayImage, OutputSize, RgbaImage,
};
