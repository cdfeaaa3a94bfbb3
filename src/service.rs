//! Request-level operations of the wardrobe: uploads, deletions, outfit
//! proposals and saved outfits, expressed over any [`WardrobeStore`].

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use ab_glyph::FontArc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::WardrobeConfig;
use crate::error::{Result, StoreError, WardrobeError};
use crate::extract::{GarmentAnalysis, analyze_garment, garment_name};
use crate::garment::{
    Category, GarmentId, GarmentRecord, GarmentSummary, NewGarment, NewSavedOutfit, OutfitId,
    SavedOutfit, Season, Style,
};
use crate::outfit::{OutfitFilters, OutfitGenerator, SeasonFilter};
use crate::rules::RuleSet;
use crate::store::WardrobeStore;
use crate::visualize::{load_font, render_palette_visualization};

/// Filters posted by the outfit page. `"Any"` or an empty value means no
/// filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutfitRequest {
    pub season: Option<String>,
    pub style: Option<String>,
    /// Accepted for compatibility with the front end; not used for sampling.
    pub color_scheme: Option<String>,
}

fn filter_value(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("any"))
}

impl OutfitRequest {
    /// Season and style filters for the generator. A season no garment can
    /// carry still filters, down to the all-season garments; an unknown style
    /// is dropped.
    pub fn filters(&self) -> OutfitFilters {
        let season = filter_value(&self.season).map(|s| match Season::from_str(s) {
            Ok(season) => SeasonFilter::Known(season),
            Err(_) => {
                debug!(season = s, "unrecognized season, keeping all-season garments");
                SeasonFilter::Unrecognized
            }
        });
        let style = filter_value(&self.style).and_then(|s| match Style::from_str(s) {
            Ok(style) => Some(style),
            Err(_) => {
                debug!(style = s, "ignoring unrecognized style");
                None
            }
        });
        OutfitFilters { season, style }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutfitsResponse {
    Outfits {
        outfits: Vec<BTreeMap<Category, GarmentSummary>>,
    },
    Error {
        error: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarmentRef {
    pub id: GarmentId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOutfitRequest {
    pub name: String,
    pub tops: GarmentRef,
    pub bottoms: GarmentRef,
    #[serde(default)]
    pub outerwear: Option<GarmentRef>,
    #[serde(default)]
    pub footwear: Option<GarmentRef>,
    #[serde(default)]
    pub accessories: Option<GarmentRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOutfitResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outfit_id: Option<OutfitId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SaveOutfitResponse {
    fn saved(id: OutfitId) -> Self {
        SaveOutfitResponse { success: true, outfit_id: Some(id), error: None }
    }

    fn failed(error: impl Into<String>) -> Self {
        SaveOutfitResponse { success: false, outfit_id: None, error: Some(error.into()) }
    }
}

/// A saved outfit with its garments resolved. References to garments that
/// no longer exist come back as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedOutfitView {
    pub id: OutfitId,
    pub name: String,
    pub top: Option<GarmentSummary>,
    pub bottom: Option<GarmentSummary>,
    pub outerwear: Option<GarmentSummary>,
    pub footwear: Option<GarmentSummary>,
    pub accessory: Option<GarmentSummary>,
    pub date_created: chrono::DateTime<chrono::Utc>,
}

/// Analysis returned for a photo before it is added to the wardrobe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadAnalysis {
    #[serde(flatten)]
    pub analysis: GarmentAnalysis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_visualization: Option<String>,
}

/// A photo plus whatever the user filled in on the upload form.
#[derive(Debug, Clone, PartialEq)]
pub struct GarmentUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub name: Option<String>,
    pub category: Option<Category>,
    pub color: Option<String>,
    pub season: Season,
}

pub struct Wardrobe<S> {
    store: S,
    config: WardrobeConfig,
    rules: RuleSet,
    font: Option<FontArc>,
}

impl<S: WardrobeStore> Wardrobe<S> {
    /// Build a wardrobe from its configuration, loading replacement rule
    /// tables and the label font when configured.
    pub fn new(store: S, config: WardrobeConfig) -> Result<Self> {
        let rules = match &config.rules_path {
            Some(path) => {
                info!(path = %path.display(), "loading compatibility rules");
                RuleSet::from_json_file(path)?
            }
            None => RuleSet::standard().clone(),
        };
        let font = config.label_font.as_deref().and_then(|path| match read_font(path) {
            Ok(font) => Some(font),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "label font unavailable");
                None
            }
        });
        Ok(Wardrobe { store, config, rules, font })
    }

    pub fn with_rules(store: S, config: WardrobeConfig, rules: RuleSet) -> Self {
        Wardrobe { store, config, rules, font: None }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &WardrobeConfig {
        &self.config
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn label_font(&self) -> Option<&FontArc> {
        self.font.as_ref()
    }

    pub fn validate_upload(&self, filename: &str, size: u64) -> Result<()> {
        if !self.config.is_allowed_extension(filename) {
            return Err(WardrobeError::UnsupportedFileType(filename.to_string()));
        }
        if size > self.config.max_upload_bytes {
            return Err(WardrobeError::FileTooLarge { size, limit: self.config.max_upload_bytes });
        }
        Ok(())
    }

    /// Analyze a photo without adding it, writing a palette preview next to
    /// the uploads when the analysis found colors.
    pub fn analyze_upload(&self, filename: &str, bytes: &[u8]) -> Result<UploadAnalysis> {
        self.validate_upload(filename, bytes.len() as u64)?;
        let analysis = analyze_garment(bytes, &self.config.palette);

        let color_visualization = if analysis.color_analysis.is_empty() {
            None
        } else {
            match self.write_visualization(filename, bytes, &analysis) {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(error = %e, file = filename, "error creating color visualization");
                    None
                }
            }
        };

        Ok(UploadAnalysis { analysis, color_visualization })
    }

    fn write_visualization(
        &self,
        filename: &str,
        bytes: &[u8],
        analysis: &GarmentAnalysis,
    ) -> std::result::Result<String, Box<dyn std::error::Error>> {
        let png = render_palette_visualization(
            bytes,
            &analysis.color_analysis,
            &self.config.visualization,
            self.font.as_ref(),
        )?;
        let safe = sanitize_filename(filename);
        let stem = Path::new(&safe)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let viz_name = format!("color_analysis_{stem}.png");

        let dir = self.config.upload_dir();
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(&viz_name), png)?;
        Ok(format!("{}/{viz_name}", self.config.upload_folder))
    }

    /// Store the photo, analyze it and record the garment. Form values win
    /// over the analysis.
    pub fn add_garment(&mut self, upload: GarmentUpload) -> Result<GarmentRecord> {
        self.validate_upload(&upload.filename, upload.bytes.len() as u64)?;

        let filename = format!("{}_{}", Uuid::new_v4(), sanitize_filename(&upload.filename));
        let dir = self.config.upload_dir();
        fs::create_dir_all(&dir)?;
        let file_path = dir.join(&filename);
        fs::write(&file_path, &upload.bytes)?;

        let analysis = analyze_garment(&upload.bytes, &self.config.palette);
        let category = upload.category.unwrap_or(analysis.category);
        let color = upload.color.unwrap_or_else(|| analysis.color.clone());
        let name = match upload.name.filter(|n| !n.trim().is_empty()) {
            Some(name) => name,
            None if analysis.features.is_empty() => analysis.name.clone(),
            None => garment_name(&color, category),
        };

        let garment = NewGarment {
            name,
            category,
            color,
            season: upload.season,
            image_path: format!("{}/{filename}", self.config.upload_folder),
            features: analysis.features,
        };

        let id = match self.store.insert_garment(garment) {
            Ok(id) => id,
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&file_path) {
                    warn!(error = %cleanup, path = %file_path.display(), "could not remove orphaned upload");
                }
                return Err(e.into());
            }
        };
        info!(id, file = %filename, "added garment");

        self.store
            .garment(id)?
            .ok_or(WardrobeError::Store(StoreError::GarmentNotFound(id)))
    }

    /// Remove a garment and its photo. A photo that cannot be removed is
    /// logged and otherwise ignored.
    pub fn delete_garment(&mut self, id: GarmentId) -> Result<GarmentRecord> {
        let removed = self.store.delete_garment(id)?;

        let file_path = self.config.static_root.join(&removed.image_path);
        if file_path.exists() {
            if let Err(e) = fs::remove_file(&file_path) {
                warn!(error = %e, path = %file_path.display(), "error deleting garment image");
            }
        }
        info!(id, "deleted garment");
        Ok(removed)
    }

    pub fn wardrobe(&self) -> Result<Vec<GarmentRecord>> {
        Ok(self.store.list_garments()?)
    }

    /// Number of tops and bottoms, the garments every outfit needs.
    pub fn outfit_readiness(&self) -> Result<usize> {
        let tops = self.store.list_garments_by_category(Category::Tops)?.len();
        let bottoms = self.store.list_garments_by_category(Category::Bottoms)?.len();
        Ok(tops + bottoms)
    }

    /// Propose `outfits_per_request` outfits.
    pub fn generate_outfits<R: Rng + ?Sized>(
        &self,
        request: &OutfitRequest,
        rng: &mut R,
    ) -> Result<OutfitsResponse> {
        self.generate_outfit_batch(request, self.config.outfits_per_request, rng)
    }

    /// Propose up to `count` outfits. Generation failures are returned as the
    /// `{error}` payload; only store failures are errors.
    pub fn generate_outfit_batch<R: Rng + ?Sized>(
        &self,
        request: &OutfitRequest,
        count: usize,
        rng: &mut R,
    ) -> Result<OutfitsResponse> {
        let filters = request.filters();
        if let Some(style) = filters.style {
            debug!(%style, "style filter is not applied");
        }
        if let Some(scheme) = &request.color_scheme {
            debug!(%scheme, "color scheme filter is not applied");
        }

        let garments = self.store.list_garments()?;
        let generator = OutfitGenerator::new(&self.rules, filters);
        let response = match generator.generate_multiple_outfits(&garments, count, rng) {
            Ok(outfits) => OutfitsResponse::Outfits {
                outfits: outfits.iter().map(|o| o.summaries()).collect(),
            },
            Err(e) => OutfitsResponse::Error { error: e.to_string() },
        };
        Ok(response)
    }

    pub fn save_outfit(&mut self, request: SaveOutfitRequest) -> SaveOutfitResponse {
        let outfit = NewSavedOutfit {
            name: request.name,
            top_id: request.tops.id,
            bottom_id: request.bottoms.id,
            outerwear_id: request.outerwear.map(|r| r.id),
            footwear_id: request.footwear.map(|r| r.id),
            accessory_id: request.accessories.map(|r| r.id),
        };
        match self.store.insert_outfit(outfit) {
            Ok(id) => {
                info!(id, "saved outfit");
                SaveOutfitResponse::saved(id)
            }
            Err(e) => {
                warn!(error = %e, "could not save outfit");
                SaveOutfitResponse::failed(e.to_string())
            }
        }
    }

    /// Same as [`Wardrobe::save_outfit`] for a raw JSON body.
    pub fn save_outfit_json(&mut self, body: &str) -> SaveOutfitResponse {
        match serde_json::from_str::<SaveOutfitRequest>(body) {
            Ok(request) => self.save_outfit(request),
            Err(e) => {
                debug!(error = %e, "rejecting outfit payload");
                SaveOutfitResponse::failed("Invalid outfit data")
            }
        }
    }

    pub fn saved_outfits(&self) -> Result<Vec<SavedOutfitView>> {
        let resolve = |id: Option<GarmentId>| -> Result<Option<GarmentSummary>> {
            Ok(match id {
                Some(id) => self.store.garment(id)?.as_ref().map(GarmentSummary::from),
                None => None,
            })
        };

        self.store
            .list_outfits()?
            .into_iter()
            .map(|outfit: SavedOutfit| -> Result<SavedOutfitView> {
                Ok(SavedOutfitView {
                    top: resolve(Some(outfit.top_id))?,
                    bottom: resolve(Some(outfit.bottom_id))?,
                    outerwear: resolve(outfit.outerwear_id)?,
                    footwear: resolve(outfit.footwear_id)?,
                    accessory: resolve(outfit.accessory_id)?,
                    id: outfit.id,
                    name: outfit.name,
                    date_created: outfit.date_created,
                })
            })
            .collect()
    }

    pub fn delete_saved_outfit(&mut self, id: OutfitId) -> Result<()> {
        self.store.delete_outfit(id)?;
        info!(id, "deleted saved outfit");
        Ok(())
    }

    /// Rewrite image paths so they are relative to the static root and live
    /// in the upload folder. Returns how many garments changed.
    pub fn fix_image_paths(&mut self) -> Result<usize> {
        let folder = &self.config.upload_folder;
        let mut fixes = Vec::new();
        for garment in self.store.list_garments()? {
            let fixed = if let Some(rest) = garment.image_path.strip_prefix("static/") {
                rest.to_string()
            } else if !garment.image_path.starts_with(folder.as_str()) {
                let file = Path::new(&garment.image_path)
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_default();
                format!("{folder}/{file}")
            } else {
                continue;
            };
            fixes.push((garment.id, fixed));
        }

        let count = fixes.len();
        for (id, path) in fixes {
            self.store.update_image_path(id, path)?;
        }
        info!(count, "fixed image paths");
        Ok(count)
    }
}

fn read_font(path: &Path) -> std::result::Result<FontArc, Box<dyn std::error::Error>> {
    Ok(load_font(fs::read(path)?)?)
}

/// Reduce a client-supplied file name to a safe single path component.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    cleaned.trim_start_matches(['.', '_']).to_string()
}
