//! Dominant-color extraction.
//!
//! An image is decoded, shrunk so its longest side is at most
//! [`PaletteOptions::max_edge`], and its pixels are clustered with k-means in
//! RGB space. Every centroid is reported with the share of pixels assigned to
//! it and the name of the closest reference color.

use std::collections::HashMap;

use image::{DynamicImage, GenericImageView, RgbImage, imageops::FilterType};
use kmeans_colors::get_kmeans;
use palette::Srgb;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PaletteError;
use crate::garment::{Category, GarmentFeatures, PaletteEntry};
use crate::named_colors::find_closest_color;

/// Color reported when an image could not be analyzed.
pub const FALLBACK_COLOR: &str = "Blue";
/// Name given to garments whose image could not be analyzed.
pub const FALLBACK_NAME: &str = "Unknown Item";

/// Tuning for [`extract_palette`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteOptions {
    /// Number of clusters (k).
    pub colors: usize,
    /// Longest side of the working image in pixels.
    pub max_edge: u32,
    /// Independent k-means restarts; the lowest-score run is kept.
    pub runs: u32,
    pub max_iter: usize,
    pub converge: f32,
    pub seed: u64,
}

impl Default for PaletteOptions {
    fn default() -> Self {
        PaletteOptions {
            colors: 5,
            max_edge: 300,
            runs: 10,
            max_iter: 20,
            converge: 1e-4,
            seed: 42,
        }
    }
}

/// A dominant color of an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorSample {
    pub rgb: [u8; 3],
    /// Share of the image's pixels, 0-100.
    pub percentage: f64,
    pub name: String,
}

/// Extract `options.colors` dominant colors from an encoded image, most
/// dominant first.
pub fn extract_palette(
    input: &[u8],
    options: &PaletteOptions,
) -> Result<Vec<ColorSample>, PaletteError> {
    check_color_count(options.colors)?;
    let img = image::load_from_memory(input)?;
    extract_palette_from_image(&img, options)
}

pub fn extract_palette_from_image(
    img: &DynamicImage,
    options: &PaletteOptions,
) -> Result<Vec<ColorSample>, PaletteError> {
    check_color_count(options.colors)?;
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(PaletteError::EmptyImage);
    }

    let working = downscale(img.to_rgb8(), options.max_edge);
    let pixels: Vec<[u8; 3]> = working.pixels().map(|p| p.0).collect();
    let (centroids, counts) = cluster(&pixels, options);

    let total = pixels.len() as f64;
    let mut samples: Vec<ColorSample> = centroids
        .into_iter()
        .zip(counts)
        .map(|(rgb, count)| ColorSample {
            rgb,
            percentage: count as f64 / total * 100.0,
            name: find_closest_color(rgb).to_string(),
        })
        .collect();

    samples.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
    Ok(samples)
}

fn check_color_count(colors: usize) -> Result<(), PaletteError> {
    if (1..=u8::MAX as usize).contains(&colors) {
        Ok(())
    } else {
        Err(PaletteError::InvalidColorCount(colors))
    }
}

/// Shrink `img` so that its longest side is at most `max_edge`, keeping the
/// aspect ratio. Images already small enough are returned unchanged.
pub fn downscale(img: RgbImage, max_edge: u32) -> RgbImage {
    let (w, h) = img.dimensions();
    if max_edge == 0 || w.max(h) <= max_edge {
        return img;
    }

    let (new_w, new_h) = if h > w {
        ((w as u64 * max_edge as u64 / h as u64) as u32, max_edge)
    } else {
        (max_edge, (h as u64 * max_edge as u64 / w as u64) as u32)
    };
    debug!(from_w = w, from_h = h, to_w = new_w, to_h = new_h, "downscaling before clustering");

    image::imageops::resize(&img, new_w.max(1), new_h.max(1), FilterType::Triangle)
}

/// Cluster `pixels` into exactly `options.colors` centroids, returning the
/// centroids and how many pixels landed in each.
fn cluster(pixels: &[[u8; 3]], options: &PaletteOptions) -> (Vec<[u8; 3]>, Vec<usize>) {
    let k = options.colors;

    // Few distinct colors: every color is its own cluster, k-means would only
    // produce empty or duplicated centroids.
    let mut distinct: Vec<([u8; 3], usize)> = Vec::new();
    let mut slots: HashMap<[u8; 3], usize> = HashMap::new();
    for &px in pixels {
        match slots.get(&px) {
            Some(&slot) => distinct[slot].1 += 1,
            None => {
                if distinct.len() == k {
                    distinct.clear();
                    break;
                }
                slots.insert(px, distinct.len());
                distinct.push((px, 1));
            }
        }
    }

    if !distinct.is_empty() {
        debug!(distinct = distinct.len(), k, "skipping k-means, image has few colors");
        distinct.sort_by(|a, b| b.1.cmp(&a.1));
        let dominant = distinct[0].0;
        distinct.resize(k, (dominant, 0));
        return distinct.into_iter().unzip();
    }

    let buf: Vec<Srgb> = pixels
        .iter()
        .map(|&[r, g, b]| Srgb::<u8>::new(r, g, b).into_format::<f32>())
        .collect();

    let mut best = get_kmeans(k, options.max_iter, options.converge, false, &buf, options.seed);
    for run in 1..options.runs {
        let candidate = get_kmeans(
            k,
            options.max_iter,
            options.converge,
            false,
            &buf,
            options.seed.wrapping_add(run as u64),
        );
        if candidate.score < best.score {
            best = candidate;
        }
    }

    let mut counts = vec![0usize; best.centroids.len()];
    for &idx in &best.indices {
        counts[idx as usize] += 1;
    }
    let centroids = best
        .centroids
        .iter()
        .map(|c| {
            let c: Srgb<u8> = c.into_format::<u8>();
            [c.red, c.green, c.blue]
        })
        .collect();

    (centroids, counts)
}

/// Result of analyzing an uploaded garment photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GarmentAnalysis {
    pub name: String,
    pub category: Category,
    pub color: String,
    pub features: GarmentFeatures,
    pub color_analysis: Vec<ColorSample>,
}

impl GarmentAnalysis {
    /// Analysis used when the image could not be read.
    pub fn placeholder() -> Self {
        GarmentAnalysis {
            name: FALLBACK_NAME.to_string(),
            category: Category::Tops,
            color: FALLBACK_COLOR.to_string(),
            features: GarmentFeatures::default(),
            color_analysis: Vec::new(),
        }
    }

    pub fn from_samples(samples: Vec<ColorSample>) -> Self {
        let Some(primary) = samples.first().map(|s| s.name.clone()) else {
            return GarmentAnalysis::placeholder();
        };
        let category = Category::Tops;
        let features = GarmentFeatures {
            colors: samples
                .iter()
                .map(|s| PaletteEntry { rgb: s.rgb, percentage: s.percentage })
                .collect(),
            primary_color: Some(primary.clone()),
        };

        GarmentAnalysis {
            name: garment_name(&primary, category),
            category,
            color: primary,
            features,
            color_analysis: samples,
        }
    }
}

/// Default display name for a garment, e.g. "Navy Top".
pub fn garment_name(color: &str, category: Category) -> String {
    format!("{color} {}", category.singular())
}

/// Analyze a garment photo. Never fails: unreadable images yield
/// [`GarmentAnalysis::placeholder`].
pub fn analyze_garment(input: &[u8], options: &PaletteOptions) -> GarmentAnalysis {
    match extract_palette(input, options) {
        Ok(samples) => GarmentAnalysis::from_samples(samples),
        Err(e) => {
            warn!(error = %e, "garment analysis failed, using placeholder");
            GarmentAnalysis::placeholder()
        }
    }
}
