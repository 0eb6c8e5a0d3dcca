//! Meme-style caption overlay.
//!
//! [`add_text_overlay`] decides what goes where; the actual drawing is
//! delegated to a [`DrawSurface`], which mirrors the handful of
//! operations a 2D canvas offers for text. [`RasterSurface`] implements
//! it over an [`RgbaImage`] by laying out each string as a one-element
//! SVG document and rasterizing it with `resvg` on top of the pixels.
//!
//! Unlike every other operation in this crate, drawing mutates its
//! target in place.

use std::sync::Arc;

use resvg::tiny_skia::{Pixmap, Transform};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use usvg::fontdb;

use crate::types::{Color, FilterError, RgbaImage};

/// Distance in pixels from the top and bottom edges to the captions.
pub const MARGIN: f64 = 20.0;

/// Thinnest outline stroke in pixels.
pub const MIN_OUTLINE_WIDTH: f64 = 2.0;

/// Caption settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextOverlay {
    /// Caption along the top edge. Empty means none.
    pub top_text: String,
    /// Caption along the bottom edge. Empty means none.
    pub bottom_text: String,
    /// Font size in pixels.
    pub font_size: f64,
    /// Fill color.
    pub text_color: Color,
    /// Outline color, used when `use_outline` is set.
    pub outline_color: Color,
    /// Stroke an outline under the fill.
    pub use_outline: bool,
    /// Font family name, drawn bold.
    pub font_family: String,
}

impl TextOverlay {
    /// Default font size.
    pub const DEFAULT_FONT_SIZE: f64 = 40.0;
    /// Default font family.
    pub const DEFAULT_FONT_FAMILY: &'static str = "Impact";

    /// Outline stroke width: `max(2, font_size / 15)`.
    #[must_use]
    pub fn outline_width(&self) -> f64 {
        (self.font_size / 15.0).max(MIN_OUTLINE_WIDTH)
    }

    /// Check parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidParameter`] unless `font_size` is a
    /// finite positive number.
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.font_size.is_finite() && self.font_size > 0.0 {
            Ok(())
        } else {
            Err(FilterError::InvalidParameter(format!(
                "font_size must be positive, got {}",
                self.font_size
            )))
        }
    }
}

impl Default for TextOverlay {
    fn default() -> Self {
        Self {
            top_text: String::new(),
            bottom_text: String::new(),
            font_size: Self::DEFAULT_FONT_SIZE,
            text_color: Color::WHITE,
            outline_color: Color::BLACK,
            use_outline: true,
            font_family: Self::DEFAULT_FONT_FAMILY.to_owned(),
        }
    }
}

/// The text-drawing subset of a 2D canvas.
///
/// Text is horizontally centered on `x` and hangs below `y` (top
/// baseline). The current font is bold.
pub trait DrawSurface {
    /// Surface width in pixels.
    fn width(&self) -> u32;

    /// Surface height in pixels.
    fn height(&self) -> u32;

    /// Select the font used by subsequent draw calls.
    fn set_font(&mut self, family: &str, size: f64);

    /// Stroke the outline of `text`.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Render`] if the text cannot be drawn.
    fn stroke_text(
        &mut self,
        text: &str,
        x: f64,
        y: f64,
        color: Color,
        line_width: f64,
    ) -> Result<(), FilterError>;

    /// Fill `text`.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Render`] if the text cannot be drawn.
    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: Color) -> Result<(), FilterError>;
}

/// Draw the top and bottom captions onto a surface.
///
/// Both captions are centered horizontally. The top caption hangs from
/// `y = 20`; the bottom one from `height - font_size - 20`. Each
/// caption is stroked first (when outlines are enabled) and then
/// filled. Empty captions are skipped.
///
/// # Errors
///
/// Returns [`FilterError::InvalidParameter`] for a bad font size, or
/// whatever error the surface reports while drawing.
pub fn add_text_overlay<S: DrawSurface + ?Sized>(
    surface: &mut S,
    overlay: &TextOverlay,
) -> Result<(), FilterError> {
    overlay.validate()?;
    surface.set_font(&overlay.font_family, overlay.font_size);

    let center_x = f64::from(surface.width()) / 2.0;
    let bottom_y = f64::from(surface.height()) - overlay.font_size - MARGIN;

    for (text, y) in [
        (overlay.top_text.as_str(), MARGIN),
        (overlay.bottom_text.as_str(), bottom_y),
    ] {
        if text.is_empty() {
            continue;
        }
        debug!(text, x = center_x, y, "drawing caption");
        if overlay.use_outline {
            surface.stroke_text(
                text,
                center_x,
                y,
                overlay.outline_color,
                overlay.outline_width(),
            )?;
        }
        surface.fill_text(text, center_x, y, overlay.text_color)?;
    }
    Ok(())
}

/// Fonts available to a [`RasterSurface`], looked up by family name.
///
/// Starts empty; callers add faces from bytes or load the system fonts.
/// When the requested family is missing, the fallback family is tried,
/// then any sans-serif face, then whatever face was loaded first.
#[derive(Clone)]
pub struct FontRegistry {
    db: fontdb::Database,
    fallback: Option<String>,
}

impl FontRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            db: fontdb::Database::new(),
            fallback: None,
        }
    }

    /// A registry seeded with every font installed on the system.
    #[must_use]
    pub fn with_system_fonts() -> Self {
        let mut registry = Self::new();
        registry.db.load_system_fonts();
        debug!(faces = registry.face_count(), "loaded system fonts");
        registry
    }

    /// Register a TrueType/OpenType font (or collection) from memory.
    ///
    /// Returns the number of faces added. Data that is not a font adds
    /// none.
    pub fn load_font_data(&mut self, data: Vec<u8>) -> usize {
        let before = self.db.len();
        self.db.load_font_data(data);
        let added = self.db.len() - before;
        if added == 0 {
            warn!("font data contained no usable faces");
        }
        added
    }

    /// Family tried when a requested family is not registered.
    pub fn set_fallback(&mut self, family: impl Into<String>) {
        self.fallback = Some(family.into());
    }

    /// Number of registered faces.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.db.len()
    }

    /// Sorted, de-duplicated family names of all registered faces.
    #[must_use]
    pub fn families(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .db
            .faces()
            .flat_map(|face| face.families.iter().map(|(name, _)| name.clone()))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Whether any face belongs to `family` (case-insensitive).
    #[must_use]
    pub fn has_family(&self, family: &str) -> bool {
        self.db.faces().any(|face| {
            face.families
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case(family))
        })
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Font the surface is currently drawing with.
#[derive(Debug, Clone)]
struct FontSpec {
    family: String,
    size: f64,
}

/// A [`DrawSurface`] backed by an in-memory raster.
///
/// Pixels are held premultiplied while drawing. [`RasterSurface::into_image`]
/// returns the source bytes for every pixel no draw call touched and
/// converts only the drawn pixels back to straight alpha.
pub struct RasterSurface {
    pixmap: Pixmap,
    source: RgbaImage,
    fonts: Arc<fontdb::Database>,
    fallback: Option<String>,
    font: FontSpec,
}

impl RasterSurface {
    /// Wrap a copy of `image` for drawing.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidParameter`] if the image has zero
    /// width or height.
    pub fn new(image: &RgbaImage, fonts: FontRegistry) -> Result<Self, FilterError> {
        let (width, height) = image.dimensions();
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            FilterError::InvalidParameter(format!("cannot draw on a {width}x{height} image"))
        })?;
        for (dst, src) in pixmap.data_mut().chunks_exact_mut(4).zip(image.pixels()) {
            dst.copy_from_slice(&premultiplied(src.0));
        }
        Ok(Self {
            pixmap,
            source: image.clone(),
            fonts: Arc::new(fonts.db),
            fallback: fonts.fallback,
            font: FontSpec {
                family: TextOverlay::DEFAULT_FONT_FAMILY.to_owned(),
                size: TextOverlay::DEFAULT_FONT_SIZE,
            },
        })
    }

    /// Finish drawing and return the straight-alpha image.
    ///
    /// Untouched pixels keep their exact source bytes, including the
    /// color of fully transparent pixels.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn into_image(self) -> RgbaImage {
        let mut image = self.source;
        for (dst, src) in image.pixels_mut().zip(self.pixmap.data().chunks_exact(4)) {
            if src == premultiplied(dst.0).as_slice() {
                continue;
            }
            let a = src[3];
            if a == 0 {
                *dst = image::Rgba([0, 0, 0, 0]);
            } else {
                let unpremultiply = |c: u8| (u16::from(c) * 255 / u16::from(a)) as u8;
                *dst = image::Rgba([
                    unpremultiply(src[0]),
                    unpremultiply(src[1]),
                    unpremultiply(src[2]),
                    a,
                ]);
            }
        }
        image
    }

    /// Lay out one `<text>` element and composite it onto the pixmap.
    fn draw(&mut self, text: &str, x: f64, y: f64, paint: &str) -> Result<(), FilterError> {
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        let svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" \
             viewBox=\"0 0 {width} {height}\">\
             <text x=\"{x}\" y=\"{y}\" font-family=\"{family}\" font-size=\"{size}\" \
             font-weight=\"bold\" text-anchor=\"middle\" dominant-baseline=\"text-before-edge\" \
             {paint}>{text}</text></svg>",
            family = xml_escape(&self.font.family),
            size = self.font.size,
            text = xml_escape(text),
        );

        let options = usvg::Options {
            fontdb: Arc::clone(&self.fonts),
            font_resolver: font_resolver(self.fallback.clone()),
            ..usvg::Options::default()
        };
        let tree = usvg::Tree::from_str(&svg, &options)
            .map_err(|e| FilterError::Render(e.to_string()))?;
        resvg::render(&tree, Transform::identity(), &mut self.pixmap.as_mut());
        Ok(())
    }
}

impl DrawSurface for RasterSurface {
    fn width(&self) -> u32 {
        self.pixmap.width()
    }

    fn height(&self) -> u32 {
        self.pixmap.height()
    }

    fn set_font(&mut self, family: &str, size: f64) {
        self.font = FontSpec {
            family: family.to_owned(),
            size,
        };
    }

    fn stroke_text(
        &mut self,
        text: &str,
        x: f64,
        y: f64,
        color: Color,
        line_width: f64,
    ) -> Result<(), FilterError> {
        let paint = format!(
            "fill=\"none\" stroke=\"{}\" stroke-width=\"{line_width}\" \
             stroke-linejoin=\"miter\" stroke-miterlimit=\"10\"",
            color.to_hex()
        );
        self.draw(text, x, y, &paint)
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: Color) -> Result<(), FilterError> {
        let paint = format!("fill=\"{}\"", color.to_hex());
        self.draw(text, x, y, &paint)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn premultiply(channel: u8, alpha: u16) -> u8 {
    ((u16::from(channel) * alpha + 127) / 255) as u8
}

/// Premultiplied form of a straight-alpha RGBA pixel.
fn premultiplied([r, g, b, a]: [u8; 4]) -> [u8; 4] {
    let alpha = u16::from(a);
    [
        premultiply(r, alpha),
        premultiply(g, alpha),
        premultiply(b, alpha),
        a,
    ]
}

/// Resolve a requested family against the registry, falling back to
/// `fallback`, then sans-serif, then the first registered face.
fn font_resolver(fallback: Option<String>) -> usvg::FontResolver<'static> {
    usvg::FontResolver {
        select_font: Box::new(move |font, db| {
            let mut families: Vec<fontdb::Family<'_>> = font
                .families()
                .iter()
                .map(|family| match family {
                    usvg::FontFamily::Serif => fontdb::Family::Serif,
                    usvg::FontFamily::SansSerif => fontdb::Family::SansSerif,
                    usvg::FontFamily::Cursive => fontdb::Family::Cursive,
                    usvg::FontFamily::Fantasy => fontdb::Family::Fantasy,
                    usvg::FontFamily::Monospace => fontdb::Family::Monospace,
                    usvg::FontFamily::Named(name) => fontdb::Family::Name(name),
                })
                .collect();
            if let Some(name) = &fallback {
                families.push(fontdb::Family::Name(name));
            }
            families.push(fontdb::Family::SansSerif);

            let query = fontdb::Query {
                families: &families,
                weight: fontdb::Weight(font.weight()),
                stretch: fontdb::Stretch::Normal,
                style: fontdb::Style::Normal,
            };
            db.query(&query).or_else(|| db.faces().next().map(|face| face.id))
        }),
        select_fallback: usvg::FontResolver::default_fallback_selector(),
    }
}

/// Escape the five XML special characters.
fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
