//! photocraft: command-line front end for the photocraft filter engine.
//!
//! Decodes an image file, runs one processing mode over it with
//! configurable parameters, prints per-stage diagnostics, and optionally
//! writes the result as PNG, JPEG or WebP. Useful for:
//!
//! - Batch-processing photos without the browser UI
//! - Tuning cartoon levels, chroma-key tolerance and enhancement values
//! - Measuring per-stage durations to identify bottlenecks
//!
//! # Usage
//!
//! ```text
//! photocraft cartoonify photo.jpg --color-levels 6 --output cartoon.png
//! photocraft passport photo.jpg --preset 2 --output exports/
//! photocraft meme photo.jpg --top "HELLO" --font Impact.ttf -o meme.jpg
//! photocraft presets
//! ```
//!
//! Log verbosity follows `RUST_LOG` and defaults to `info`.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use clap::{Args, Parser, Subcommand};
use photocraft_export::{ExportError, ExportFormat, Quality, decode_rgba, encode, export_file_name};
use photocraft_filters::preset::CATALOG_VERSION;
use photocraft_filters::{
    CartoonConfig, ChromaKeyConfig, Clock, Color, CropRect, EnhanceConfig, FilterConfig,
    FilterDiagnostics, FontRegistry, OutputSize, PASSPORT_PRESETS, PassportConfig, RasterSurface,
    ResampleFilter, RgbaImage, TextOverlay, add_text_overlay, parse_hex, process_with_diagnostics,
};
use tracing::{info, warn};

/// Photo filters from the command line.
///
/// Runs one processing mode on an image and prints per-stage timing and
/// pixel-change diagnostics.
#[derive(Parser)]
#[command(name = "photocraft", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Cartoon effect: smooth, posterize, boost saturation, outline edges.
    Cartoonify {
        #[command(flatten)]
        run: RunArgs,

        /// Levels per color channel after posterization (2-16).
        #[arg(long, default_value_t = CartoonConfig::DEFAULT_COLOR_LEVELS, value_parser = clap::value_parser!(u8).range(2..=16))]
        color_levels: u8,

        /// Edge line strength in percent; 0 disables edge lines.
        #[arg(long, default_value_t = CartoonConfig::DEFAULT_EDGE_STRENGTH, value_parser = clap::value_parser!(u8).range(0..=100))]
        edge_strength: u8,
    },

    /// Replace a chosen background color (white replacement = transparent).
    Background {
        #[command(flatten)]
        run: RunArgs,

        /// Color to key out, as `#rrggbb`.
        #[arg(long, default_value_t = ChromaKeyConfig::DEFAULT_KEY_COLOR, value_parser = parse_color)]
        key_color: Color,

        /// Match tolerance as a fraction of the largest RGB distance (0.0-1.0).
        #[arg(long, default_value_t = ChromaKeyConfig::DEFAULT_TOLERANCE)]
        tolerance: f64,

        /// Color written over matched pixels, as `#rrggbb`.
        #[arg(long, default_value_t = Color::WHITE, value_parser = parse_color)]
        replacement_color: Color,
    },

    /// Detect the border color and make it transparent.
    SmartBackground {
        #[command(flatten)]
        run: RunArgs,

        /// Match tolerance as a fraction of the largest RGB distance (0.0-1.0).
        #[arg(long, default_value_t = ChromaKeyConfig::DEFAULT_TOLERANCE)]
        tolerance: f64,
    },

    /// Crop and scale to an ID photo size on a white background.
    Passport {
        #[command(flatten)]
        run: RunArgs,

        /// Index into the preset catalog (see `photocraft presets`).
        #[arg(long, default_value_t = 0)]
        preset: usize,

        /// Explicit output width in pixels; overrides the preset.
        #[arg(long, requires = "height", value_parser = clap::value_parser!(u32).range(1..))]
        width: Option<u32>,

        /// Explicit output height in pixels; overrides the preset.
        #[arg(long, requires = "width", value_parser = clap::value_parser!(u32).range(1..))]
        height: Option<u32>,

        /// Left edge of the crop as a fraction of the image width.
        #[arg(long, default_value_t = CropRect::DEFAULT.x)]
        crop_x: f64,

        /// Top edge of the crop as a fraction of the image height.
        #[arg(long, default_value_t = CropRect::DEFAULT.y)]
        crop_y: f64,

        /// Crop width as a fraction of the image width.
        #[arg(long, default_value_t = CropRect::DEFAULT.width)]
        crop_width: f64,

        /// Crop height as a fraction of the image height.
        #[arg(long, default_value_t = CropRect::DEFAULT.height)]
        crop_height: f64,

        /// Resampling filter (nearest, triangle, catmullrom, gaussian, lanczos3).
        #[arg(long, default_value_t = ResampleFilter::default())]
        filter: ResampleFilter,
    },

    /// Adjust brightness, contrast, saturation and sharpness.
    Enhance {
        #[command(flatten)]
        run: RunArgs,

        /// Added to every channel.
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        brightness: f64,

        /// Contrast (-100 to 100).
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        contrast: f64,

        /// Saturation change in percent; -100 is grayscale.
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        saturation: f64,

        /// Unsharp-mask strength (0 to 100).
        #[arg(long, default_value_t = 0.0)]
        sharpness: f64,
    },

    /// Denoise then sharpen.
    Restore {
        #[command(flatten)]
        run: RunArgs,
    },

    /// Draw top and bottom captions.
    Meme {
        #[command(flatten)]
        run: RunArgs,

        #[command(flatten)]
        text: MemeArgs,
    },

    /// List the passport and ID photo presets.
    Presets {
        /// Print the catalog as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Input, output and reporting flags shared by every mode.
#[derive(Args)]
struct RunArgs {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Write the result here. A directory gets a generated file name.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format (png, jpg, webp). Defaults to the output file
    /// extension, then PNG.
    #[arg(long)]
    format: Option<ExportFormat>,

    /// Encoder quality in percent. Defaults to the format's preset.
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    quality: Option<u8>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Full mode config as a JSON string.
    ///
    /// When provided, all other parameter flags of the mode are ignored.
    /// Filter modes expect a `FilterConfig` serialization (with its
    /// `mode` tag); `meme` expects a `TextOverlay`.
    #[arg(long)]
    config_json: Option<String>,
}

/// Caption flags for the `meme` mode.
#[derive(Args)]
struct MemeArgs {
    /// Caption along the top edge.
    #[arg(long, default_value = "")]
    top: String,

    /// Caption along the bottom edge.
    #[arg(long, default_value = "")]
    bottom: String,

    /// Font size in pixels.
    #[arg(long, default_value_t = TextOverlay::DEFAULT_FONT_SIZE)]
    font_size: f64,

    /// Fill color, as `#rrggbb`.
    #[arg(long, default_value_t = Color::WHITE, value_parser = parse_color)]
    text_color: Color,

    /// Outline color, as `#rrggbb`.
    #[arg(long, default_value_t = Color::BLACK, value_parser = parse_color)]
    outline_color: Color,

    /// Draw the captions without an outline.
    #[arg(long)]
    no_outline: bool,

    /// Font family to draw with.
    #[arg(long, default_value = TextOverlay::DEFAULT_FONT_FAMILY)]
    font_family: String,

    /// Extra font file to register (TTF/OTF/TTC). Repeatable.
    #[arg(long)]
    font: Vec<PathBuf>,

    /// Family used when the requested one is not installed.
    #[arg(long)]
    fallback_family: Option<String>,

    /// Do not load the system's installed fonts.
    #[arg(long)]
    no_system_fonts: bool,
}

impl MemeArgs {
    fn overlay(&self) -> TextOverlay {
        TextOverlay {
            top_text: self.top.clone(),
            bottom_text: self.bottom.clone(),
            font_size: self.font_size,
            text_color: self.text_color,
            outline_color: self.outline_color,
            use_outline: !self.no_outline,
            font_family: self.font_family.clone(),
        }
    }
}

/// Strict `#rrggbb` parser for clap.
fn parse_color(s: &str) -> Result<Color, String> {
    parse_hex(s).ok_or_else(|| format!("expected a #rrggbb color, got {s:?}"))
}

/// Split a mode subcommand into its shared flags and the config its own
/// flags describe.
fn mode_from_command(command: Command) -> Option<(RunArgs, FilterConfig)> {
    let parts = match command {
        Command::Cartoonify {
            run,
            color_levels,
            edge_strength,
        } => (
            run,
            FilterConfig::Cartoonify(CartoonConfig {
                color_levels,
                edge_strength,
            }),
        ),
        Command::Background {
            run,
            key_color,
            tolerance,
            replacement_color,
        } => (
            run,
            FilterConfig::Background(ChromaKeyConfig {
                key_color,
                tolerance,
                replacement_color,
            }),
        ),
        Command::SmartBackground { run, tolerance } => {
            (run, FilterConfig::SmartBackground { tolerance })
        }
        Command::Passport {
            run,
            preset,
            width,
            height,
            crop_x,
            crop_y,
            crop_width,
            crop_height,
            filter,
        } => (
            run,
            FilterConfig::Passport(PassportConfig {
                preset,
                size: width
                    .zip(height)
                    .map(|(width, height)| OutputSize { width, height }),
                crop: CropRect {
                    x: crop_x,
                    y: crop_y,
                    width: crop_width,
                    height: crop_height,
                },
                filter,
            }),
        ),
        Command::Enhance {
            run,
            brightness,
            contrast,
            saturation,
            sharpness,
        } => (
            run,
            FilterConfig::Enhance(EnhanceConfig {
                brightness,
                contrast,
                saturation,
                sharpness,
            }),
        ),
        Command::Restore { run } => (run, FilterConfig::Restore),
        Command::Meme { .. } | Command::Presets { .. } => return None,
    };
    Some(parts)
}

/// Parse `--config-json` if given, else keep the flag-built value.
fn config_or_json<T: serde::de::DeserializeOwned>(
    config_json: Option<&str>,
    from_flags: T,
) -> Result<T, String> {
    match config_json {
        Some(json) => {
            serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))
        }
        None => Ok(from_flags),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Presets { json } => print_presets(json),
        Command::Meme { run, text } => run_meme(&run, &text),
        command => {
            let Some((run, from_flags)) = mode_from_command(command) else {
                return Ok(());
            };
            let config = config_or_json(run.config_json.as_deref(), from_flags)?;
            run_filter(&run, &config)
        }
    }
}

/// Read and decode the input image.
fn load_image(path: &Path) -> Result<RgbaImage, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    eprintln!("Image: {} ({} bytes)", path.display(), bytes.len());
    decode_rgba(&bytes).map_err(|e| format!("Error decoding {}: {e}", path.display()))
}

fn run_filter(run: &RunArgs, config: &FilterConfig) -> Result<(), String> {
    let image = load_image(&run.image_path)?;
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", run.runs);
    eprintln!();

    let clock = StdClock::new();
    let mut all_diagnostics = Vec::with_capacity(run.runs);
    let mut first_output = None;

    for index in 0..run.runs {
        if run.runs > 1 {
            eprintln!("--- Run {}/{} ---", index + 1, run.runs);
        }

        let (output, diagnostics) = process_with_diagnostics(&image, config, &clock)
            .map_err(|e| format!("Filter error: {e}"))?;

        if run.json {
            let json = serde_json::to_string_pretty(&diagnostics)
                .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
            println!("{json}");
        } else {
            println!("{}", diagnostics.report());
        }

        all_diagnostics.push(diagnostics);
        first_output.get_or_insert(output);

        if run.runs > 1 {
            eprintln!();
        }
    }

    if run.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    match first_output {
        Some(output) => write_output(run, config.mode_name(), &output),
        None => Ok(()),
    }
}

fn run_meme(run: &RunArgs, text: &MemeArgs) -> Result<(), String> {
    let overlay = config_or_json(run.config_json.as_deref(), text.overlay())?;
    let image = load_image(&run.image_path)?;

    let mut fonts = if text.no_system_fonts {
        FontRegistry::new()
    } else {
        FontRegistry::with_system_fonts()
    };
    for path in &text.font {
        let data =
            std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
        let faces = fonts.load_font_data(data);
        info!(path = %path.display(), faces, "registered font file");
    }
    if let Some(family) = &text.fallback_family {
        fonts.set_fallback(family.clone());
    }
    if !fonts.has_family(&overlay.font_family) {
        warn!(family = %overlay.font_family, "font family not registered, using fallback");
    }

    let clock = StdClock::new();
    let start = clock.now();
    let output =
        draw_captions(&image, fonts, &overlay).map_err(|e| format!("Filter error: {e}"))?;
    eprintln!(
        "Captions drawn in {:.3}ms",
        duration_ms(clock.now().saturating_sub(start))
    );

    write_output(run, "meme", &output)
}

/// Draw the captions onto a copy of `image`.
fn draw_captions(
    image: &RgbaImage,
    fonts: FontRegistry,
    overlay: &TextOverlay,
) -> Result<RgbaImage, ExportError> {
    let mut surface = RasterSurface::new(image, fonts)?;
    add_text_overlay(&mut surface, overlay)?;
    Ok(surface.into_image())
}

/// Encode and write the result when `--output` was given.
fn write_output(run: &RunArgs, mode: &str, image: &RgbaImage) -> Result<(), String> {
    let Some(target) = &run.output else {
        return Ok(());
    };

    let format = run
        .format
        .or_else(|| format_from_extension(target))
        .unwrap_or_default();
    let quality = match run.quality {
        Some(percent) => Quality::from_percent(percent).map_err(|e| e.to_string())?,
        None => format.default_quality(),
    };
    let path = if target.is_dir() {
        target.join(export_file_name(mode, unix_millis(), format))
    } else {
        target.clone()
    };

    let bytes = encode(image, format, quality).map_err(|e| format!("Error encoding: {e}"))?;
    std::fs::write(&path, &bytes)
        .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
    eprintln!(
        "{} written to {} ({} bytes)",
        format.mime_type(),
        path.display(),
        bytes.len(),
    );
    Ok(())
}

/// Export format implied by a file extension, if recognized.
fn format_from_extension(path: &Path) -> Option<ExportFormat> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| ext.parse().ok())
}

/// Milliseconds since the Unix epoch, for generated file names.
fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

fn print_presets(json: bool) -> Result<(), String> {
    if json {
        let catalog = serde_json::json!({
            "version": CATALOG_VERSION,
            "presets": PASSPORT_PRESETS,
        });
        let text = serde_json::to_string_pretty(&catalog)
            .map_err(|e| format!("Error serializing presets: {e}"))?;
        println!("{text}");
        return Ok(());
    }

    println!("{:>3}  {:<28} {:>11}  Description", "#", "Name", "Pixels");
    println!("{}", "-".repeat(80));
    for (index, preset) in PASSPORT_PRESETS.iter().enumerate() {
        println!(
            "{index:>3}  {:<28} {:>5}x{:<5}  {}",
            preset.name, preset.width, preset.height, preset.description
        );
    }
    Ok(())
}

/// [`Clock`] backed by [`std::time::Instant`].
struct StdClock {
    origin: Instant,
}

impl StdClock {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for StdClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[FilterDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    let Some(first) = all_diagnostics.first() else {
        println!("Warning: no diagnostics to summarize");
        return;
    };

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| duration_ms(d.total_duration))
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    // Per-stage means. Every run of a mode executes the same stages.
    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    for (index, stage) in first.stages.iter().enumerate() {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(|d| d.stages.get(index))
            .map(|s| duration_ms(s.duration))
            .collect();
        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!("{:<24} {stage_mean:>10.3}ms", stage.name);
    }
}
