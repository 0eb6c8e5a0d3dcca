//! Error type for decoding and encoding.

use photocraft_filters::FilterError;

/// Errors that can occur while decoding or encoding image files.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The input byte slice was empty.
    #[error("empty input")]
    EmptyInput,

    /// The image bytes could not be decoded.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[source] image::ImageError),

    /// The encoder rejected the image.
    #[error("failed to encode {format} image: {source}")]
    Encode {
        /// Target format name.
        format: &'static str,
        /// Underlying encoder error.
        #[source]
        source: image::ImageError,
    },

    /// A quality value outside `[0, 1]` (or `0..=100` percent).
    #[error("quality must be in [0, 1], got {0}")]
    InvalidQuality(f64),

    /// The filter engine reported an error.
    #[error(transparent)]
    Filter(#[from] FilterError),
}
