use thiserror::Error;

use crate::garment::{Category, GarmentId, OutfitId};

#[derive(Error, Debug)]
pub enum PaletteError {
    #[error("Unable to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Image has no pixels")]
    EmptyImage,

    #[error("Color count must be between 1 and 255, got {0}")]
    InvalidColorCount(usize),
}

#[derive(Error, Debug)]
pub enum VisualizeError {
    #[error("Unable to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("PNG encode error: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Invalid label font: {0}")]
    Font(#[from] ab_glyph::InvalidFont),

    #[error("No colors to visualize")]
    NoColors,
}

/// Preconditions of outfit generation that the wardrobe does not meet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OutfitError {
    #[error(
        "Your wardrobe is empty or no items match the selected filters. Try different filters or add more items."
    )]
    EmptyWardrobe,

    #[error("You need at least one {0} item that matches your filters for an outfit")]
    InsufficientItems(Category),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Garment {0} not found")]
    GarmentNotFound(GarmentId),

    #[error("Saved outfit {0} not found")]
    OutfitNotFound(OutfitId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum WardrobeError {
    #[error("Invalid file type: {0}")]
    UnsupportedFileType(String),

    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T, E = WardrobeError> = std::result::Result<T, E>;
