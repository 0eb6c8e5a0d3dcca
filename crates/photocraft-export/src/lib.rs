//! photocraft-export: Image file codecs for the filter engine.
//!
//! Decodes PNG, JPEG, BMP and WebP bytes into the engine's RGBA buffer
//! and encodes filtered buffers back to PNG, JPEG or WebP. Works on
//! byte slices only; reading and writing files is left to the caller.

pub mod decode;
pub mod encode;
pub mod error;

pub use decode::decode_rgba;
pub use encode::{ExportFormat, Quality, encode, export_file_name};
pub use error::ExportError;
