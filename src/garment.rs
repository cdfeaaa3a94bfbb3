//! Wardrobe records and the feature blob persisted alongside them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub type GarmentId = u64;
pub type OutfitId = u64;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Category {
    Tops,
    Bottoms,
    Outerwear,
    Footwear,
    Accessories,
}

impl Category {
    /// Categories an outfit may carry beyond its top and bottom, in the order
    /// they are filled.
    pub const OPTIONAL: [Category; 3] =
        [Category::Outerwear, Category::Footwear, Category::Accessories];

    /// Capitalized singular form used in generated garment names.
    pub fn singular(self) -> &'static str {
        match self {
            Category::Tops => "Top",
            Category::Bottoms => "Bottom",
            Category::Outerwear => "Outerwear",
            Category::Footwear => "Footwear",
            Category::Accessories => "Accessory",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
    All,
}

impl Season {
    /// Whether a garment tagged `self` is wearable in `requested`.
    pub fn matches(self, requested: Season) -> bool {
        self == requested || self == Season::All
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Style {
    Casual,
    Formal,
    Business,
    Athletic,
}

/// One weighted palette entry as stored in the feature blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub rgb: [u8; 3],
    pub percentage: f64,
}

/// Feature blob persisted with every garment. The placeholder analysis leaves
/// both fields empty, which serializes to `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GarmentFeatures {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<PaletteEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
}

impl GarmentFeatures {
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty() && self.primary_color.is_none()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GarmentRecord {
    pub id: GarmentId,
    pub name: String,
    pub category: Category,
    pub color: String,
    pub season: Season,
    pub image_path: String,
    #[serde(default)]
    pub features: GarmentFeatures,
    pub date_added: DateTime<Utc>,
}

/// A garment before the store has assigned it an id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGarment {
    pub name: String,
    pub category: Category,
    pub color: String,
    pub season: Season,
    pub image_path: String,
    pub features: GarmentFeatures,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedOutfit {
    pub id: OutfitId,
    pub name: String,
    pub top_id: GarmentId,
    pub bottom_id: GarmentId,
    pub outerwear_id: Option<GarmentId>,
    pub footwear_id: Option<GarmentId>,
    pub accessory_id: Option<GarmentId>,
    pub date_created: DateTime<Utc>,
}

impl SavedOutfit {
    /// Every garment the outfit points at, mandatory slots first.
    pub fn garment_ids(&self) -> impl Iterator<Item = GarmentId> + '_ {
        [Some(self.top_id), Some(self.bottom_id), self.outerwear_id, self.footwear_id, self.accessory_id]
            .into_iter()
            .flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSavedOutfit {
    pub name: String,
    pub top_id: GarmentId,
    pub bottom_id: GarmentId,
    pub outerwear_id: Option<GarmentId>,
    pub footwear_id: Option<GarmentId>,
    pub accessory_id: Option<GarmentId>,
}

/// Compact view of a garment as returned to the front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GarmentSummary {
    pub id: GarmentId,
    pub name: String,
    pub category: Category,
    pub color: String,
    pub image: String,
}

impl From<&GarmentRecord> for GarmentSummary {
    fn from(record: &GarmentRecord) -> Self {
        let image = if record.image_path.starts_with('/') {
            record.image_path.clone()
        } else {
            format!("/{}", record.image_path)
        };
        GarmentSummary {
            id: record.id,
            name: record.name.clone(),
            category: record.category,
            color: record.color.clone(),
            image,
        }
    }
}
