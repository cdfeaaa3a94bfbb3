//! Garment palette extraction and rule-based outfit suggestions.
//!
//! The library is usable natively (see the `wardrobe` binary behind the
//! `native-bin` feature) and from JavaScript through the `wasm_bindgen`
//! exports at the bottom of this file.

pub mod config;
pub mod error;
pub mod extract;
pub mod garment;
pub mod named_colors;
pub mod outfit;
pub mod rules;
pub mod service;
pub mod store;
pub mod visualize;

pub use config::WardrobeConfig;
pub use error::{OutfitError, PaletteError, Result, StoreError, VisualizeError, WardrobeError};
pub use extract::{
    ColorSample, GarmentAnalysis, PaletteOptions, analyze_garment, extract_palette,
};
pub use garment::{Category, GarmentFeatures, GarmentRecord, SavedOutfit, Season, Style};
pub use named_colors::find_closest_color;
pub use outfit::{Outfit, OutfitFilters, OutfitGenerator, SeasonFilter};
pub use rules::RuleSet;
pub use service::{OutfitRequest, OutfitsResponse, Wardrobe};
pub use store::{JsonFileStore, MemoryStore, WardrobeStore};

use js_sys::{Array, Object, Reflect, Uint8Array};
use wasm_bindgen::prelude::*;

use crate::visualize::{VisualizationOptions, load_font, render_palette_visualization};

fn rgb_to_js(rgb: [u8; 3]) -> Array {
    let out = Array::new();
    for channel in rgb {
        out.push(&JsValue::from(channel));
    }
    out
}

fn sample_to_js(sample: &ColorSample) -> Result<JsValue, JsValue> {
    let obj = Object::new();
    Reflect::set(&obj, &JsValue::from_str("rgb"), &rgb_to_js(sample.rgb))?;
    Reflect::set(&obj, &JsValue::from_str("percentage"), &JsValue::from_f64(sample.percentage))?;
    Reflect::set(&obj, &JsValue::from_str("name"), &JsValue::from_str(&sample.name))?;
    Ok(obj.into())
}

/// `{colors: [{rgb, percentage}], primaryColor}`; the placeholder's empty
/// features give `{}`.
fn features_to_js(features: &GarmentFeatures) -> Result<JsValue, JsValue> {
    let obj = Object::new();
    if !features.colors.is_empty() {
        let colors = Array::new();
        for entry in &features.colors {
            let color = Object::new();
            Reflect::set(&color, &JsValue::from_str("rgb"), &rgb_to_js(entry.rgb))?;
            Reflect::set(&color, &JsValue::from_str("percentage"), &JsValue::from_f64(entry.percentage))?;
            colors.push(&color);
        }
        Reflect::set(&obj, &JsValue::from_str("colors"), &colors)?;
    }
    if let Some(primary) = &features.primary_color {
        Reflect::set(&obj, &JsValue::from_str("primaryColor"), &JsValue::from_str(primary))?;
    }
    Ok(obj.into())
}

fn options_for(n_colors: usize) -> PaletteOptions {
    PaletteOptions { colors: n_colors, ..PaletteOptions::default() }
}

/// Dominant colors of an encoded image as an array of
/// `{rgb: [r, g, b], percentage, name}`, most dominant first.
#[wasm_bindgen(js_name = extractPalette)]
pub fn extract_palette_js(input: Vec<u8>, n_colors: usize) -> Result<Array, JsValue> {
    let samples = extract_palette(&input, &options_for(n_colors))
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let out = Array::new();
    for sample in &samples {
        out.push(&sample_to_js(sample)?);
    }
    Ok(out)
}

/// Full garment analysis `{name, category, color, features, colorAnalysis}`.
/// Unreadable images produce the placeholder analysis rather than an error.
#[wasm_bindgen(js_name = analyzeGarment)]
pub fn analyze_garment_js(input: Vec<u8>, n_colors: usize) -> Result<Object, JsValue> {
    let analysis = analyze_garment(&input, &options_for(n_colors));

    let features = features_to_js(&analysis.features)?;
    let colors = Array::new();
    for sample in &analysis.color_analysis {
        colors.push(&sample_to_js(sample)?);
    }

    let result = Object::new();
    Reflect::set(&result, &JsValue::from_str("name"), &JsValue::from_str(&analysis.name))?;
    Reflect::set(
        &result,
        &JsValue::from_str("category"),
        &JsValue::from_str(&analysis.category.to_string()),
    )?;
    Reflect::set(&result, &JsValue::from_str("color"), &JsValue::from_str(&analysis.color))?;
    Reflect::set(&result, &JsValue::from_str("features"), &features)?;
    Reflect::set(&result, &JsValue::from_str("colorAnalysis"), &colors)?;
    Ok(result)
}

/// PNG preview of the image with its palette strip. Labels are drawn only
/// when `font` holds a TTF/OTF font.
#[wasm_bindgen(js_name = renderPalette)]
pub fn render_palette_js(
    input: Vec<u8>,
    n_colors: usize,
    font: Option<Vec<u8>>,
) -> Result<Uint8Array, JsValue> {
    let samples = extract_palette(&input, &options_for(n_colors))
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    let font = font
        .map(load_font)
        .transpose()
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let png = render_palette_visualization(
        &input,
        &samples,
        &VisualizationOptions::default(),
        font.as_ref(),
    )
    .map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(Uint8Array::from(png.as_slice()))
}

/// Propose up to `count` outfits from a JSON array of garment records and a
/// JSON `{season?, style?, colorScheme?}` request, using the built-in rules.
/// Returns the JSON `{outfits: [...]}` or `{error}` payload.
pub fn generate_outfits_json<R: rand::Rng + ?Sized>(
    garments: &str,
    request: &str,
    count: usize,
    rng: &mut R,
) -> serde_json::Result<String> {
    let garments: Vec<GarmentRecord> = serde_json::from_str(garments)?;
    let request: OutfitRequest = serde_json::from_str(request)?;

    let generator = OutfitGenerator::new(RuleSet::standard(), request.filters());
    let response = match generator.generate_multiple_outfits(&garments, count, rng) {
        Ok(outfits) => OutfitsResponse::Outfits {
            outfits: outfits.iter().map(|o| o.summaries()).collect(),
        },
        Err(e) => OutfitsResponse::Error { error: e.to_string() },
    };
    serde_json::to_string(&response)
}

#[wasm_bindgen(js_name = generateOutfits)]
pub fn generate_outfits_js(garments: &str, request: &str, count: usize) -> Result<String, JsValue> {
    generate_outfits_json(garments, request, count, &mut rand::rng())
        .map_err(|e| JsValue::from_str(&format!("Invalid outfit input: {e}")))
}
