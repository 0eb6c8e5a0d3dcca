//! Integration test: encode a synthetic photo, decode it, run every
//! processing mode, and export the results in every format.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use photocraft_export::{ExportFormat, Quality, decode_rgba, encode, export_file_name};
use photocraft_filters::{
    CartoonConfig, ChromaKeyConfig, Color, CropRect, EnhanceConfig, FilterConfig, FontRegistry,
    PassportConfig, RasterSurface, RgbaImage, TextOverlay, add_text_overlay, passport_preset,
    process,
};

/// A green-screen shot: a warm gradient "subject" on a flat green field.
fn green_screen(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let inside =
            (width / 4..width * 3 / 4).contains(&x) && (height / 4..height * 3 / 4).contains(&y);
        if inside {
            image::Rgba([
                200,
                u8::try_from(80 + (x * 100 / width)).unwrap(),
                u8::try_from(40 + (y * 100 / height)).unwrap(),
                255,
            ])
        } else {
            image::Rgba([0, 255, 0, 255])
        }
    })
}

fn all_modes() -> Vec<FilterConfig> {
    vec![
        FilterConfig::Cartoonify(CartoonConfig::default()),
        FilterConfig::Background(ChromaKeyConfig::default()),
        FilterConfig::SmartBackground {
            tolerance: ChromaKeyConfig::DEFAULT_TOLERANCE,
        },
        FilterConfig::Passport(PassportConfig::default()),
        FilterConfig::Enhance(EnhanceConfig {
            brightness: 10.0,
            contrast: 20.0,
            saturation: 15.0,
            sharpness: 30.0,
        }),
        FilterConfig::Restore,
    ]
}

#[test]
fn every_mode_survives_png_round_trip() {
    let source = green_screen(64, 48);
    let png = encode(&source, ExportFormat::Png, ExportFormat::Png.default_quality())
        .expect("encoding the source should succeed");
    let decoded = decode_rgba(&png).expect("decoding the source should succeed");
    assert_eq!(decoded, source);

    for config in all_modes() {
        let output = process(&decoded, &config)
            .map_err(|e| format!("{config} failed: {e}"))
            .unwrap();

        let expected = match &config {
            FilterConfig::Passport(passport) => {
                let size = passport.output_size().unwrap();
                (size.width, size.height)
            }
            _ => source.dimensions(),
        };
        assert_eq!(output.dimensions(), expected, "{config}");

        for format in ExportFormat::ALL {
            let bytes = encode(&output, format, format.default_quality()).unwrap();
            let back = decode_rgba(&bytes).unwrap();
            assert_eq!(back.dimensions(), output.dimensions(), "{config} as {format}");
            match format {
                ExportFormat::Png => assert_eq!(back, output, "{config} as png"),
                // Fully transparent pixels may lose their color in WebP.
                ExportFormat::WebP => {
                    for (a, b) in back.pixels().zip(output.pixels()) {
                        if b.0[3] != 0 {
                            assert_eq!(a, b, "{config} as webp");
                        }
                    }
                }
                ExportFormat::Jpeg => {}
            }
        }
    }
}

#[test]
fn green_field_becomes_transparent() {
    let source = green_screen(40, 40);
    let keyed = process(&source, &FilterConfig::Background(ChromaKeyConfig::default())).unwrap();
    let bytes = encode(&keyed, ExportFormat::Png, Quality::from_percent(100).unwrap()).unwrap();
    let back = decode_rgba(&bytes).unwrap();

    assert_eq!(back.get_pixel(0, 0).0[3], 0);
    assert_eq!(back.get_pixel(20, 20).0[3], 255);
    assert_eq!(back.get_pixel(20, 20).0[0], 200);
}

#[test]
fn passport_preset_controls_export_size() {
    let source = green_screen(300, 400);
    let preset = passport_preset(0).unwrap();
    let config = FilterConfig::Passport(PassportConfig {
        crop: CropRect::default(),
        ..PassportConfig::default()
    });
    let out = process(&source, &config).unwrap();
    assert_eq!(out.dimensions(), (preset.width, preset.height));

    let jpeg = encode(&out, ExportFormat::Jpeg, Quality::from_percent(90).unwrap()).unwrap();
    let back = decode_rgba(&jpeg).unwrap();
    assert_eq!(back.dimensions(), (preset.width, preset.height));
    assert_eq!(
        export_file_name(config.mode_name(), 1_234, ExportFormat::Jpeg),
        "photocraft-passport-1234.jpg"
    );
}

#[test]
fn caption_without_fonts_exports_unchanged() {
    let source = green_screen(120, 90);
    let mut surface = RasterSurface::new(&source, FontRegistry::new()).unwrap();
    let overlay = TextOverlay {
        top_text: "TOP".to_owned(),
        bottom_text: "BOTTOM".to_owned(),
        text_color: Color::WHITE,
        ..TextOverlay::default()
    };
    add_text_overlay(&mut surface, &overlay).unwrap();
    let captioned = surface.into_image();

    let bytes = encode(
        &captioned,
        ExportFormat::WebP,
        ExportFormat::WebP.default_quality(),
    )
    .unwrap();
    assert_eq!(decode_rgba(&bytes).unwrap(), source);
}
