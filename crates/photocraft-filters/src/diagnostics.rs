//! Processing diagnostics: per-stage timing and pixel-change counts.
//!
//! The engine itself never reads a clock. Callers pass a [`Clock`] so
//! the same code runs natively, in a worker, or under test with a fake
//! clock.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::pipeline::FilterConfig;
use crate::types::{Dimensions, FilterError, RgbaImage};

/// Source of monotonic time.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single [`process_with_diagnostics`] run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDiagnostics {
    /// Processing mode name.
    pub mode: String,
    /// Input image size.
    pub input: Dimensions,
    /// Output image size.
    pub output: Dimensions,
    /// One entry per executed stage, in order.
    pub stages: Vec<StageDiagnostics>,
    /// Wall-clock duration of the whole run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Stage name.
    pub name: String,
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Pixels whose RGBA value differs from the stage input. When the
    /// stage changes the image size every output pixel counts.
    pub changed_pixels: u64,
}

impl FilterDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Filter Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!("Mode: {}", self.mode));
        lines.push(format!(
            "Image: {}x{} -> {}x{} ({} pixels in)",
            self.input.width,
            self.input.height,
            self.output.width,
            self.output.height,
            self.input.pixel_count(),
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Changed"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for stage in &self.stages {
            let ms = duration_ms(stage.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "{:<24} {ms:>8.3}ms {pct:>9.1}%  {} px",
                stage.name, stage.changed_pixels
            ));
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Count pixels that differ between two images of the same size, or
/// every pixel of `after` when the sizes differ.
fn changed_pixels(before: &RgbaImage, after: &RgbaImage) -> u64 {
    if before.dimensions() != after.dimensions() {
        return Dimensions::of(after).pixel_count();
    }
    before
        .pixels()
        .zip(after.pixels())
        .map(|(a, b)| u64::from(u8::from(a != b)))
        .sum()
}

/// Run a processing mode and time each stage.
///
/// Produces the same image as [`crate::process`].
///
/// # Errors
///
/// Returns [`FilterError::InvalidParameter`] if the config is invalid.
#[instrument(skip_all, fields(mode = %config))]
pub fn process_with_diagnostics(
    image: &RgbaImage,
    config: &FilterConfig,
    clock: &dyn Clock,
) -> Result<(RgbaImage, FilterDiagnostics), FilterError> {
    let start = clock.now();
    let stages = config.stages()?;

    let mut current = image.clone();
    let mut stage_diagnostics = Vec::with_capacity(stages.len());
    for stage in &stages {
        let stage_start = clock.now();
        let next = stage.apply(&current, image)?;
        let duration = clock.now().saturating_sub(stage_start);
        stage_diagnostics.push(StageDiagnostics {
            name: stage.name().to_owned(),
            duration,
            changed_pixels: changed_pixels(&current, &next),
        });
        current = next;
    }

    let diagnostics = FilterDiagnostics {
        mode: config.mode_name().to_owned(),
        input: Dimensions::of(image),
        output: Dimensions::of(&current),
        stages: stage_diagnostics,
        total_duration: clock.now().saturating_sub(start),
    };
    Ok((current, diagnostics))
}
