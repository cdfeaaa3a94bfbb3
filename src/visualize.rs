//! Palette preview: the garment photo stacked above a strip of its dominant
//! colors, each segment as wide as its share of the image.

use std::io::Cursor;

use ab_glyph::{FontArc, PxScale};
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage, imageops::FilterType};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::VisualizeError;
use crate::extract::ColorSample;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationOptions {
    pub max_width: u32,
    pub strip_height: u32,
    pub label_size: f32,
    /// How many of the leading colors get a text label.
    pub labels: usize,
    pub label_spacing: i32,
}

impl Default for VisualizationOptions {
    fn default() -> Self {
        VisualizationOptions {
            max_width: 400,
            strip_height: 50,
            label_size: 16.0,
            labels: 3,
            label_spacing: 130,
        }
    }
}

pub fn load_font(bytes: Vec<u8>) -> Result<FontArc, VisualizeError> {
    Ok(FontArc::try_from_vec(bytes)?)
}

/// Render the preview for an encoded image and return it PNG-encoded.
pub fn render_palette_visualization(
    input: &[u8],
    samples: &[ColorSample],
    options: &VisualizationOptions,
    font: Option<&FontArc>,
) -> Result<Vec<u8>, VisualizeError> {
    let img = image::load_from_memory(input).map_err(VisualizeError::Decode)?;
    let canvas = compose(&img, samples, options, font)?;

    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(canvas)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(VisualizeError::Encode)?;
    Ok(buf)
}

pub fn compose(
    img: &DynamicImage,
    samples: &[ColorSample],
    options: &VisualizationOptions,
    font: Option<&FontArc>,
) -> Result<RgbImage, VisualizeError> {
    let total: f64 = samples.iter().map(|s| s.percentage).sum();
    if samples.is_empty() || total <= 0.0 {
        return Err(VisualizeError::NoColors);
    }

    let (mut w, mut h) = img.dimensions();
    let mut photo = img.to_rgb8();
    if w > options.max_width {
        h = ((h as u64 * options.max_width as u64) / w as u64).max(1) as u32;
        w = options.max_width;
        photo = image::imageops::resize(&photo, w, h, FilterType::Triangle);
    }

    let mut canvas = RgbImage::new(w, h + options.strip_height);
    image::imageops::replace(&mut canvas, &photo, 0, 0);

    let mut x = 0u32;
    for (sample, width) in samples.iter().zip(segment_widths(samples, w)) {
        if x >= w {
            break;
        }
        let width = width.min(w - x);
        draw_filled_rect_mut(
            &mut canvas,
            Rect::at(x as i32, h as i32).of_size(width, options.strip_height.max(1)),
            Rgb(sample.rgb),
        );
        x += width;
    }

    match font {
        Some(font) => draw_labels(&mut canvas, h, samples, options, font),
        None => debug!("no label font configured, palette strip left unlabeled"),
    }

    Ok(canvas)
}

/// Pixel width of each strip segment: proportional to its percentage of the
/// total, never narrower than one pixel.
pub fn segment_widths(samples: &[ColorSample], strip_width: u32) -> Vec<u32> {
    let total: f64 = samples.iter().map(|s| s.percentage).sum();
    samples
        .iter()
        .map(|s| ((strip_width as f64 * (s.percentage / total)) as u32).max(1))
        .collect()
}

fn draw_labels(
    canvas: &mut RgbImage,
    strip_top: u32,
    samples: &[ColorSample],
    options: &VisualizationOptions,
    font: &FontArc,
) {
    let scale = PxScale::from(options.label_size);
    let y = strip_top as i32 + (options.strip_height as i32 - options.label_size as i32) / 2;
    let mut x = 10;

    for sample in samples.iter().take(options.labels) {
        let text = format!("{}: {:.1}%", sample.name, sample.percentage);
        // White halo first so the label reads on dark and light segments.
        for (dx, dy) in [(-1, -1), (1, -1), (-1, 1), (1, 1)] {
            draw_text_mut(canvas, Rgb([255, 255, 255]), x + dx, y + dy, scale, font, &text);
        }
        draw_text_mut(canvas, Rgb([0, 0, 0]), x, y, scale, font, &text);
        x += options.label_spacing;
    }
}
